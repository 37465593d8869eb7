use crate::remedy::Remedy;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use tracing::{debug, warn};

type Task<R> = Box<dyn FnOnce() -> R + Send>;

/// The joined outcome of every task: the values of those that returned, and the number
/// that panicked.
#[derive(Debug)]
pub struct Completion<R> {
    pub results: Vec<R>,
    pub panicked: usize,
}

struct Supervision<R> {
    name: String,
    handles: Vec<JoinHandle<R>>,
    on_complete: Box<dyn FnOnce() + Send>,
}

impl<R> Supervision<R> {
    fn run(self) -> Completion<R> {
        let mut completion = Completion {
            results: Vec::with_capacity(self.handles.len()),
            panicked: 0,
        };
        for handle in self.handles {
            match handle.join() {
                Ok(result) => completion.results.push(result),
                Err(_) => completion.panicked += 1,
            }
        }
        debug!(pool = self.name.as_str(), panicked = completion.panicked, "all workers joined");
        (self.on_complete)();
        completion
    }
}

enum Stage<R> {
    Pending(Vec<Task<R>>),
    Supervised(JoinHandle<Option<Completion<R>>>),
    /// The supervisor thread could not be spawned; joining falls to whoever awaits.
    Unsupervised(Supervision<R>),
    Done,
}

/// A fixed set of tasks, each run on its own OS thread.
///
/// [`start`](Self::start) spawns every task and a supervisor thread that joins them all
/// before running the completion hook; [`await_completion`](Self::await_completion) joins
/// the supervisor. No task thread outlives the pool: dropping a started pool waits for
/// its tasks too.
pub struct WorkerPool<R> {
    name: String,
    stage: Stage<R>,
}

impl<R: Send + 'static> WorkerPool<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::Pending(vec![]),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a task. Has no effect once the pool has been started.
    pub fn push<F>(&mut self, task: F)
    where
        F: FnOnce() -> R + Send + 'static,
    {
        if let Stage::Pending(tasks) = &mut self.stage {
            tasks.push(Box::new(task));
        }
    }

    /// Number of tasks waiting to be started.
    pub fn len(&self) -> usize {
        match &self.stage {
            Stage::Pending(tasks) => tasks.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.stage, Stage::Pending(_))
    }

    /// Spawns one thread per task, then a supervisor that joins them and invokes
    /// `on_complete`. The hook runs exactly once, after every spawned task has exited,
    /// even if spawning fails part way; in that case the first error is returned and the
    /// tasks that did start run to completion. Starting twice is a no-op.
    pub fn start<C>(&mut self, on_complete: C) -> io::Result<()>
    where
        C: FnOnce() + Send + 'static,
    {
        let tasks = match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Pending(tasks) => tasks,
            stage => {
                self.stage = stage;
                return Ok(());
            }
        };

        let mut handles = Vec::with_capacity(tasks.len());
        let mut spawn_error = None;
        for (i, task) in tasks.into_iter().enumerate() {
            match thread::Builder::new().name(format!("{}-{i}", self.name)).spawn(task) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!(pool = self.name.as_str(), %err, "cannot spawn worker thread");
                    spawn_error = Some(err);
                    break;
                }
            }
        }

        let supervision = Arc::new(Mutex::new(Some(Supervision {
            name: self.name.clone(),
            handles,
            on_complete: Box::new(on_complete),
        })));
        let spawned = {
            let supervision = supervision.clone();
            thread::Builder::new()
                .name(format!("{}-supervisor", self.name))
                .spawn(move || {
                    let supervision = supervision.lock().remedy().take();
                    supervision.map(Supervision::run)
                })
        };
        match spawned {
            Ok(supervisor) => self.stage = Stage::Supervised(supervisor),
            Err(err) => {
                warn!(pool = self.name.as_str(), %err, "cannot spawn supervisor thread");
                if let Some(supervision) = supervision.lock().remedy().take() {
                    self.stage = Stage::Unsupervised(supervision);
                }
                spawn_error.get_or_insert(err);
            }
        }

        match spawn_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Waits for every task to exit and the completion hook to run. Returns `None` if the
    /// pool was never started or has already been awaited.
    pub fn await_completion(&mut self) -> Option<Completion<R>> {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Supervised(supervisor) => supervisor.join().unwrap_or(None),
            Stage::Unsupervised(supervision) => Some(supervision.run()),
            stage => {
                self.stage = stage;
                None
            }
        }
    }
}

impl<R> Drop for WorkerPool<R> {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Supervised(supervisor) => {
                let _ = supervisor.join();
            }
            Stage::Unsupervised(supervision) => {
                supervision.run();
            }
            Stage::Pending(_) | Stage::Done => {}
        }
    }
}

#[cfg(test)]
mod tests;
