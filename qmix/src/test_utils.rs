use crate::endpoint::{Endpoint, FnEndpoint};
use crate::error::QueryError;
use crate::mix::QueryMix;
use crate::query::{QueryTemplate, RowSet};
use crate::wait;
use crate::wait::Wait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

// Constants used for waiting in tests.
pub const SHORT_WAIT: Duration = Duration::from_micros(1);
pub const LONG_WAIT: Duration = Duration::from_secs(10);
pub const CHECK_WAIT: Duration = Duration::from_millis(5);

/// Spawns a new thread and waits until its closure has _started_ executing.
///
/// Only guarantees that the closure has begun; by the time this returns it is highly
/// likely, but not certain, that the thread has blocked on whatever it does first.
pub fn spawn_blocked<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let started = Arc::new(AtomicBool::new(false));
    let thread = {
        let started = started.clone();
        thread::spawn(move || {
            started.store(true, Ordering::Relaxed);
            f()
        })
    };
    wait::Spin::wait_for(|| started.load(Ordering::Relaxed), LONG_WAIT).unwrap();
    thread
}

/// A two-template mix: a lookup keyed by `person` and a listing that returns people.
pub fn lookup_mix() -> QueryMix {
    QueryMix::new(
        "lookup",
        vec![
            QueryTemplate::new("q1", "SELECT * FROM person WHERE id = %person%")
                .with_params(["person"]),
            QueryTemplate::new("q2", "SELECT friend FROM knows WHERE person = %person%")
                .with_params(["person"])
                .with_entity_column("friend"),
        ],
    )
}

pub fn profile_mix() -> QueryMix {
    QueryMix::new(
        "profile_view",
        vec![QueryTemplate::new("profile", "SELECT * FROM profile WHERE id = %entity%")
            .with_params(["entity"])],
    )
}

/// Replies to every query with `rows_per_query` rows under a single `friend` column.
pub fn friends_endpoint(rows_per_query: usize) -> Arc<dyn Endpoint> {
    Arc::new(FnEndpoint::new("friends", move |query, _| {
        let mut rows = RowSet::new(["friend"]);
        for i in 0..rows_per_query {
            rows.push_row([format!("{}/friend-{i}", query.template().name())]);
        }
        Ok(rows)
    }))
}

pub fn timeout_endpoint() -> Arc<dyn Endpoint> {
    Arc::new(FnEndpoint::new("unreachable", |_, timeout| {
        Err(QueryError::Timeout(timeout))
    }))
}
