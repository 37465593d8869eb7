use crate::query::QueryTemplate;
use crate::sequence::SequenceGenerator;
use std::sync::Arc;

/// How workers sharing a mix advance through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// One cursor for every clone of the mix; workers collectively round-robin over it.
    #[default]
    Shared,
    /// Every cursor starts from the first template and advances independently.
    PerWorker,
}

/// An ordered, weighted sequence of query templates.
///
/// Clones share the templates and, in [`CursorMode::Shared`], the cursor; a clone handed
/// to each worker is how a manager distributes one mix across its clients.
#[derive(Debug, Clone)]
pub struct QueryMix {
    name: String,
    templates: Vec<Arc<QueryTemplate>>,
    mode: CursorMode,
    shared: Arc<SequenceGenerator>,
}

impl QueryMix {
    pub fn new(name: impl Into<String>, templates: Vec<QueryTemplate>) -> Self {
        Self {
            name: name.into(),
            templates: templates.into_iter().map(Arc::new).collect(),
            mode: CursorMode::default(),
            shared: Arc::new(SequenceGenerator::default()),
        }
    }

    /// Builds a mix in which each template occupies `weight` consecutive slots.
    ///
    /// # Examples
    /// ```
    /// use qmix::mix::QueryMix;
    /// use qmix::query::QueryTemplate;
    /// let mix = QueryMix::weighted("w", vec![
    ///     (QueryTemplate::new("a", "A"), 2),
    ///     (QueryTemplate::new("b", "B"), 1),
    /// ]);
    /// assert_eq!(vec!["a", "a", "b"], mix.names());
    /// ```
    pub fn weighted(name: impl Into<String>, templates: Vec<(QueryTemplate, usize)>) -> Self {
        let mut mix = Self::new(name, vec![]);
        for (template, weight) in templates {
            let template = Arc::new(template);
            mix.templates.extend(std::iter::repeat(template).take(weight));
        }
        mix
    }

    pub fn with_mode(mut self, mode: CursorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Appends `other`'s templates after this mix's own, preserving the relative order of
    /// both. The cursor is reset, as positions into the old sequence no longer line up.
    pub fn append(&mut self, other: &QueryMix) {
        self.templates.extend(other.templates.iter().cloned());
        self.shared = Arc::new(SequenceGenerator::default());
    }

    /// Concatenates several mixes into one, named after the first.
    pub fn concat<I: IntoIterator<Item = QueryMix>>(mixes: I) -> Option<QueryMix> {
        let mut mixes = mixes.into_iter();
        let mut first = mixes.next()?;
        for mix in mixes {
            first.append(&mix);
        }
        Some(first)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    #[inline]
    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    #[inline]
    pub fn templates(&self) -> &[Arc<QueryTemplate>] {
        &self.templates
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name()).collect()
    }

    /// A clone of this mix whose shared cursor starts again from the first template, so a
    /// wave built from it is unaffected by how far earlier waves advanced.
    pub fn restarted(&self) -> QueryMix {
        QueryMix {
            shared: Arc::new(SequenceGenerator::default()),
            ..self.clone()
        }
    }

    /// A cursor over this mix for one worker.
    pub fn cursor(&self) -> MixCursor {
        let position = match self.mode {
            CursorMode::Shared => Position::Shared(self.shared.clone()),
            CursorMode::PerWorker => Position::Local(0),
        };
        MixCursor {
            templates: self.templates.clone(),
            position,
        }
    }
}

#[derive(Debug)]
enum Position {
    Shared(Arc<SequenceGenerator>),
    Local(u64),
}

/// A worker's view of a mix; yields templates in cursor order, wrapping around at the end.
#[derive(Debug)]
pub struct MixCursor {
    templates: Vec<Arc<QueryTemplate>>,
    position: Position,
}

impl MixCursor {
    /// The next template, or `None` if the mix is empty.
    pub fn next_template(&mut self) -> Option<Arc<QueryTemplate>> {
        if self.templates.is_empty() {
            return None;
        }
        let index = match &mut self.position {
            Position::Shared(sequence) => sequence.next(),
            Position::Local(next) => {
                let index = *next;
                *next += 1;
                index
            }
        };
        Some(self.templates[(index % self.templates.len() as u64) as usize].clone())
    }
}
