use std::fmt;

use super::document::{Document, Locator, Probe, Query};
use super::record::Value;
use crate::error::ExtractError;

/// Record field(s) a rule fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fields {
    One(&'static str),
    /// Compound rule: first field gets the names (or first list), second
    /// field the values (or second list).
    Pair(&'static str, &'static str),
}

impl Fields {
    pub fn names(&self) -> Vec<&'static str> {
        match *self {
            Fields::One(a) => vec![a],
            Fields::Pair(a, b) => vec![a, b],
        }
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fields::One(a) => f.write_str(a),
            Fields::Pair(a, b) => write!(f, "{}/{}", a, b),
        }
    }
}

/// Navigation performed right before a rule reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ScrollIntoView(Locator),
    /// Click the disclosure `handle` of every `rows` element.
    ActivateEach { rows: Locator, handle: Locator },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    PageUrl,
    /// Text of the first match; nothing matching is a failure.
    First(Query),
    /// Every match as a list, possibly empty.
    All(Query),
    /// Two independent lists, one per bound field; their lengths may differ.
    Parallel(Query, Query),
    /// One `key` → `value` pair per row element.
    Rows {
        rows: Locator,
        key: Probe,
        value: Probe,
        /// Repeated keys keep their first position and take the last value.
        unique_keys: bool,
    },
}

/// Declarative extraction rule for one field, or two for compound rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub fields: Fields,
    pub prepare: Vec<Action>,
    pub source: Source,
    /// Substrings removed from every extracted string.
    pub strip: &'static [&'static str],
}

impl FieldRule {
    pub fn new(fields: Fields, source: Source) -> Self {
        Self {
            fields,
            prepare: Vec::new(),
            source,
            strip: &[],
        }
    }

    pub fn prepare(mut self, action: Action) -> Self {
        self.prepare.push(action);
        self
    }

    pub fn strip(mut self, strip: &'static [&'static str]) -> Self {
        self.strip = strip;
        self
    }

    /// Runs the preparation steps, then reads one value per bound field.
    ///
    /// Compound rules split a row mapping into a names list and a values list;
    /// a parallel source already yields its two lists.
    pub fn evaluate<D: Document + ?Sized>(&self, doc: &mut D) -> Result<Vec<Value>, ExtractError> {
        for action in &self.prepare {
            match action {
                Action::ScrollIntoView(locator) => doc.scroll_into_view(locator)?,
                Action::ActivateEach { rows, handle } => doc.activate_each(rows, handle)?,
            }
        }

        let value = match &self.source {
            Source::PageUrl => Value::Text(doc.url().to_string()),
            Source::First(query) => doc
                .read_all(query)?
                .into_iter()
                .next()
                .map(Value::Text)
                .ok_or_else(|| ExtractError::NotFound(query.locator.to_string()))?,
            Source::All(query) => Value::List(doc.read_all(query)?),
            Source::Parallel(first, second) => {
                if let Fields::One(_) = self.fields {
                    return Err(ExtractError::Shape("two lists"));
                }
                let first = Value::List(doc.read_all(first)?);
                let second = Value::List(doc.read_all(second)?);
                return Ok(vec![self.clean(first), self.clean(second)]);
            }
            Source::Rows { rows, key, value, unique_keys } => {
                let cells = [key.clone(), value.clone()];
                let mut pairs: Vec<(String, String)> = Vec::new();
                for row in doc.read_rows(rows, &cells)? {
                    let mut row = row.into_iter();
                    let (Some(k), Some(v)) = (row.next(), row.next()) else {
                        continue;
                    };
                    match pairs.iter_mut().find(|(existing, _)| *unique_keys && *existing == k) {
                        Some(slot) => slot.1 = v,
                        None => pairs.push((k, v)),
                    }
                }
                Value::Map(pairs)
            }
        };

        match (self.fields, self.clean(value)) {
            (Fields::One(_), value) => Ok(vec![value]),
            (Fields::Pair(..), Value::Map(pairs)) => {
                let (names, values): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
                Ok(vec![Value::List(names), Value::List(values)])
            }
            (Fields::Pair(..), other) => Err(ExtractError::Shape(other.kind())),
        }
    }

    fn clean(&self, value: Value) -> Value {
        if self.strip.is_empty() {
            return value;
        }
        let strip = |s: String| self.strip.iter().fold(s, |acc, pat| acc.replace(pat, ""));
        match value {
            Value::Text(s) => Value::Text(strip(s)),
            Value::List(items) => Value::List(items.into_iter().map(strip).collect()),
            Value::Map(pairs) => Value::Map(pairs.into_iter().map(|(k, v)| (strip(k), strip(v))).collect()),
        }
    }
}
