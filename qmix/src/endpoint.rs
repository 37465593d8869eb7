use crate::error::QueryError;
use crate::query::{BoundQuery, RowSet};
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// A target a query can be executed against.
///
/// Implementations own their transport (HTTP, a SQL connection, an in-process store) and
/// must honor `timeout` themselves; a reply that arrives late is nevertheless reclassified
/// as a timeout by the worker.
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, query: &BoundQuery, timeout: Duration) -> Result<RowSet, QueryError>;
}

/// An [`Endpoint`] backed by a closure.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use qmix::endpoint::{Endpoint, FnEndpoint};
/// use qmix::query::RowSet;
/// let endpoint = FnEndpoint::new("empty", |_, _| Ok(RowSet::new(["id"])));
/// assert_eq!("empty", endpoint.name());
/// ```
pub struct FnEndpoint<F> {
    name: String,
    f: F,
}

impl<F> FnEndpoint<F>
where
    F: Fn(&BoundQuery, Duration) -> Result<RowSet, QueryError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Endpoint for FnEndpoint<F>
where
    F: Fn(&BoundQuery, Duration) -> Result<RowSet, QueryError> + Send + Sync,
{
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn execute(&self, query: &BoundQuery, timeout: Duration) -> Result<RowSet, QueryError> {
        (self.f)(query, timeout)
    }
}

impl<F> Debug for FnEndpoint<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEndpoint").field("name", &self.name).finish_non_exhaustive()
    }
}
