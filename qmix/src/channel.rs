use crate::deadline::Deadline;
use crate::monitor::{Directive, Monitor};
use crate::query::QueryResult;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// The channel carrying finished queries from workers to the aggregator.
pub type ResultChannel = CompletionChannel<QueryResult>;

/// Returned by [`CompletionChannel::publish`] once the sentinel has been published,
/// handing the rejected item back.
pub struct Closed<T>(pub T);

impl<T> Debug for Closed<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Closed(..)")
    }
}

/// The outcome of a [`CompletionChannel::try_take`].
#[derive(Debug, PartialEq, Eq)]
pub enum Taken<T> {
    Item(T),
    Sentinel,
    TimedOut,
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A bounded, blocking, multi-producer/single-consumer queue terminated by a sentinel.
///
/// [`publish`](Self::publish) blocks while the queue holds `capacity` items, so a slow
/// consumer throttles its producers instead of letting the backlog grow. The sentinel is
/// published by [`close`](Self::close); [`take`](Self::take) drains every item published
/// before it and then returns `None`.
#[derive(Debug)]
pub struct CompletionChannel<T> {
    monitor: Monitor<State<T>>,
    capacity: usize,
}

impl<T> CompletionChannel<T> {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self {
            monitor: Monitor::new(State {
                items: VecDeque::with_capacity(capacity.min(1_024)),
                closed: false,
            }),
            capacity,
        }
    }

    /// Enqueues `item`, blocking for as long as the channel is full. Never drops an item:
    /// the only way out without enqueuing is a closed channel, in which case the item is
    /// handed back.
    pub fn publish(&self, item: T) -> Result<(), Closed<T>> {
        let mut item = Some(item);
        let capacity = self.capacity;
        self.monitor.enter(|state| {
            if state.closed {
                Directive::Return
            } else if state.items.len() >= capacity {
                Directive::Wait(Duration::MAX)
            } else {
                state.items.extend(item.take());
                Directive::NotifyAll
            }
        });
        match item {
            None => Ok(()),
            Some(item) => Err(Closed(item)),
        }
    }

    /// Publishes the sentinel. Only the first call has any effect; returns `true` if this
    /// call closed the channel. Producers blocked on a full channel are released with
    /// [`Closed`].
    pub fn close(&self) -> bool {
        let mut closed_now = false;
        self.monitor.enter(|state| {
            if state.closed {
                Directive::Return
            } else {
                state.closed = true;
                closed_now = true;
                Directive::NotifyAll
            }
        });
        closed_now
    }

    /// Dequeues the next item, blocking while the channel is empty. Returns `None` once the
    /// sentinel has been reached, and on every call after that.
    pub fn take(&self) -> Option<T> {
        match self.try_take(Duration::MAX) {
            Taken::Item(item) => Some(item),
            Taken::Sentinel | Taken::TimedOut => None,
        }
    }

    /// Like [`take`](Self::take), but gives up after `duration`.
    pub fn try_take(&self, duration: Duration) -> Taken<T> {
        let mut deadline = Deadline::lazy_after(duration);
        let mut taken = Taken::TimedOut;
        self.monitor.enter(|state| match state.items.pop_front() {
            Some(item) => {
                taken = Taken::Item(item);
                Directive::NotifyAll
            }
            None if state.closed => {
                taken = Taken::Sentinel;
                Directive::Return
            }
            None => Directive::Wait(deadline.remaining()),
        });
        taken
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.monitor.compute(|state| state.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.monitor.compute(|state| state.closed)
    }

    /// Number of threads parked on the channel, either waiting for space or for an item.
    pub fn num_waiting(&self) -> u32 {
        self.monitor.num_waiting()
    }
}
