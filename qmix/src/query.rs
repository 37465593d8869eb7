use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// A query type with its unbound text. Placeholders take the form `%name%`, where `name`
/// is one of [`params`](Self::params) and doubles as the parameter-pool kind the value is
/// drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTemplate {
    name: String,
    text: String,
    #[serde(default)]
    params: Vec<String>,
    #[serde(default)]
    update: bool,
    #[serde(default)]
    entity_column: Option<String>,
}

impl QueryTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            params: vec![],
            update: false,
            entity_column: None,
        }
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the template as a data-modifying query, suppressed during warmup unless
    /// updates are allowed.
    pub fn as_update(mut self) -> Self {
        self.update = true;
        self
    }

    /// Designates the result column whose values are harvested as feedback.
    pub fn with_entity_column(mut self, column: impl Into<String>) -> Self {
        self.entity_column = Some(column.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[inline]
    pub fn is_update(&self) -> bool {
        self.update
    }

    #[inline]
    pub fn entity_column(&self) -> Option<&str> {
        self.entity_column.as_deref()
    }

    /// Substitutes every placeholder with its value from `params`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use qmix::query::{ParameterSet, QueryTemplate};
    /// let template = Arc::new(QueryTemplate::new("q", "SELECT %a%, %a%").with_params(["a"]));
    /// let mut params = ParameterSet::default();
    /// params.insert("a", "1");
    /// let bound = QueryTemplate::bind(&template, params).unwrap();
    /// assert_eq!("SELECT 1, 1", bound.text());
    /// ```
    pub fn bind(template: &Arc<QueryTemplate>, params: ParameterSet) -> Result<BoundQuery, QueryError> {
        if let Some(missing) = template.params.iter().find(|name| params.get(name).is_none()) {
            return Err(QueryError::ParameterExhausted { kind: missing.clone() });
        }

        // single pass over the template; substituted values are never rescanned
        let mut text = String::with_capacity(template.text.len());
        let mut rest = template.text.as_str();
        while let Some(open) = rest.find('%') {
            text.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('%').and_then(|close| {
                let name = &after[..close];
                template
                    .params
                    .iter()
                    .any(|param| param == name)
                    .then(|| (params.get(name), close))
            });
            match value {
                Some((Some(value), close)) => {
                    text.push_str(value);
                    rest = &after[close + 1..];
                }
                _ => {
                    text.push('%');
                    rest = after;
                }
            }
        }
        text.push_str(rest);

        Ok(BoundQuery {
            template: template.clone(),
            text,
            params,
        })
    }
}

/// Concrete values for a template's placeholders, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A template with its parameters substituted; built for one execution and then dropped.
#[derive(Debug, Clone)]
pub struct BoundQuery {
    template: Arc<QueryTemplate>,
    text: String,
    params: ParameterSet,
}

impl BoundQuery {
    #[inline]
    pub fn template(&self) -> &Arc<QueryTemplate> {
        &self.template
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }
}

/// Rows returned by an endpoint, under a named header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: vec![],
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Position of the named column in the header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The wave a query was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Warmup,
    Primary,
    Secondary,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Warmup => "warmup",
            Phase::Primary => "primary",
            Phase::Secondary => "secondary",
        })
    }
}

/// The outcome of one execution. Built by the worker that ran the query and never
/// modified afterwards; it moves through the completion channel to the aggregator.
#[derive(Debug)]
pub struct QueryResult {
    pub seq: u64,
    pub template: Arc<QueryTemplate>,
    pub query: String,
    pub phase: Phase,
    pub endpoint: String,
    pub elapsed: Duration,
    pub outcome: Result<RowSet, QueryError>,
}

impl QueryResult {
    #[inline]
    pub fn kind(&self) -> &str {
        self.template.name()
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    #[inline]
    pub fn rows(&self) -> Option<&RowSet> {
        self.outcome.as_ref().ok()
    }

    #[inline]
    pub fn error(&self) -> Option<&QueryError> {
        self.outcome.as_ref().err()
    }
}
