use crate::error::QueryError;
use crate::query::{ParameterSet, QueryTemplate};
use crate::rand::{Rand64, Seeded, Xorshift};
use crate::remedy::Remedy;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tracing::trace;

/// A source of concrete values for query placeholders.
///
/// Workers call [`bind`](Self::bind) concurrently; the aggregator calls
/// [`inject_feedback`](Self::inject_feedback) while they do, so both must be thread-safe.
pub trait ParameterPool: Send + Sync {
    /// Draws one value for every parameter of `template`.
    fn bind(&self, template: &QueryTemplate) -> Result<ParameterSet, QueryError>;

    /// Adds a value discovered in a live result to the values of `kind`.
    fn inject_feedback(&self, kind: &str, value: String);
}

/// A [`ParameterPool`] holding explicit value lists per kind, drawing uniformly at random
/// from a seeded stream.
#[derive(Debug)]
pub struct MemoryParameterPool {
    values: RwLock<HashMap<String, Vec<String>>>,
    rng: Mutex<Xorshift>,
}

impl MemoryParameterPool {
    pub fn new(seed: u64) -> Self {
        Self {
            values: RwLock::default(),
            rng: Mutex::new(Xorshift::seed(seed)),
        }
    }

    pub fn with_values<I, S>(self, kind: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_values(kind, values);
        self
    }

    pub fn insert_values<I, S>(&self, kind: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.values.write().remedy();
        guard
            .entry(kind.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Number of values currently held for `kind`.
    pub fn len(&self, kind: &str) -> usize {
        self.values.read().remedy().get(kind).map_or(0, Vec::len)
    }

    pub fn values(&self, kind: &str) -> Vec<String> {
        self.values.read().remedy().get(kind).cloned().unwrap_or_default()
    }
}

impl ParameterPool for MemoryParameterPool {
    fn bind(&self, template: &QueryTemplate) -> Result<ParameterSet, QueryError> {
        let values = self.values.read().remedy();
        let mut params = ParameterSet::default();
        for name in template.params() {
            let candidates = match values.get(name) {
                Some(candidates) if !candidates.is_empty() => candidates,
                _ => return Err(QueryError::ParameterExhausted { kind: name.clone() }),
            };
            let index = self.rng.lock().remedy().next_below(candidates.len() as u64) as usize;
            params.insert(name.as_str(), candidates[index].as_str());
        }
        Ok(params)
    }

    fn inject_feedback(&self, kind: &str, value: String) {
        trace!(kind, value = value.as_str(), "injecting feedback value");
        self.values
            .write()
            .remedy()
            .entry(kind.to_string())
            .or_default()
            .push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn bind_draws_from_kind() {
        let pool = MemoryParameterPool::new(1)
            .with_values("person", ["p1", "p2"])
            .with_values("tag", ["t1"]);
        let template = QueryTemplate::new("q", "%person% %tag%").with_params(["person", "tag"]);
        for _ in 0..100 {
            let params = pool.bind(&template).unwrap();
            assert!(matches!(params.get("person"), Some("p1") | Some("p2")));
            assert_eq!(Some("t1"), params.get("tag"));
        }
    }

    #[test]
    fn bind_without_params() {
        let pool = MemoryParameterPool::new(1);
        assert!(pool.bind(&QueryTemplate::new("q", "SELECT 1")).unwrap().is_empty());
    }

    #[test]
    fn exhausted_kind() {
        let pool = MemoryParameterPool::new(1).with_values("empty", Vec::<String>::new());
        for kind in ["empty", "missing"] {
            let template = QueryTemplate::new("q", "x").with_params([kind]);
            assert_eq!(
                QueryError::ParameterExhausted { kind: kind.into() },
                pool.bind(&template).unwrap_err()
            );
        }
    }

    #[test]
    fn feedback_makes_kind_bindable() {
        let pool = MemoryParameterPool::new(3);
        let template = QueryTemplate::new("profile", "%entity%").with_params(["entity"]);
        assert!(pool.bind(&template).is_err());

        pool.inject_feedback("entity", "e1".into());
        assert_eq!(Some("e1"), pool.bind(&template).unwrap().get("entity"));
        assert_eq!(1, pool.len("entity"));
    }

    #[test]
    fn concurrent_bind_and_inject() {
        const INJECTIONS: usize = 1_000;
        let pool = Arc::new(MemoryParameterPool::new(5).with_values("k", ["seed"]));
        let template = Arc::new(QueryTemplate::new("q", "%k%").with_params(["k"]));
        let readers = (0..4)
            .map(|_| {
                let pool = pool.clone();
                let template = template.clone();
                thread::spawn(move || {
                    for _ in 0..INJECTIONS {
                        assert!(pool.bind(&template).is_ok());
                    }
                })
            })
            .collect::<Vec<_>>();
        for i in 0..INJECTIONS {
            pool.inject_feedback("k", format!("v{i}"));
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(INJECTIONS + 1, pool.len("k"));
    }
}
