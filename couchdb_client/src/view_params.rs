//! Query parameters CouchDB understands on a `_view` request.
//!
//! Typed setters make wrong types unrepresentable. [`ViewParams::set`] accepts
//! loosely typed JSON values and validates them when they are set: a rejected
//! value leaves the previous one in place.
use std::str::FromStr;

use serde_json::Value;

use crate::CouchDbError;

/// Recognised parameter names, in the order they are serialized.
pub const VIEW_PARAMETERS: [&str; 14] = [
    "descending",
    "endkey",
    "endkey_docid",
    "group",
    "group_level",
    "include_docs",
    "inclusive_end",
    "key",
    "limit",
    "reduce",
    "skip",
    "stale",
    "startkey",
    "startkey_docid",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stale {
    Ok,
    UpdateAfter,
}

impl Stale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stale::Ok => "ok",
            Stale::UpdateAfter => "update_after",
        }
    }
}

impl FromStr for Stale {
    type Err = CouchDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Stale::Ok),
            "update_after" => Ok(Stale::UpdateAfter),
            other => Err(invalid(
                "stale",
                format!("expected `ok` or `update_after`, got `{}`", other),
            )),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewParams {
    descending: Option<bool>,
    endkey: Option<Value>,
    endkey_docid: Option<String>,
    group: Option<bool>,
    group_level: Option<u64>,
    include_docs: Option<bool>,
    inclusive_end: Option<bool>,
    key: Option<Value>,
    limit: Option<u64>,
    reduce: Option<bool>,
    skip: Option<u64>,
    stale: Option<Stale>,
    startkey: Option<Value>,
    startkey_docid: Option<String>,
}

// Mutators
impl ViewParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    pub fn set_endkey(mut self, endkey: Value) -> Self {
        self.endkey = Some(endkey);
        self
    }

    pub fn set_endkey_docid(mut self, docid: &str) -> Self {
        self.endkey_docid = Some(docid.to_string());
        self
    }

    pub fn set_group(mut self, group: bool) -> Self {
        self.group = Some(group);
        self
    }

    pub fn set_group_level(mut self, level: u64) -> Self {
        self.group_level = Some(level);
        self
    }

    pub fn set_include_docs(mut self, include_docs: bool) -> Self {
        self.include_docs = Some(include_docs);
        self
    }

    pub fn set_inclusive_end(mut self, inclusive_end: bool) -> Self {
        self.inclusive_end = Some(inclusive_end);
        self
    }

    pub fn set_key(mut self, key: Value) -> Self {
        self.key = Some(key);
        self
    }

    pub fn set_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn set_reduce(mut self, reduce: bool) -> Self {
        self.reduce = Some(reduce);
        self
    }

    pub fn set_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn set_stale(mut self, stale: Stale) -> Self {
        self.stale = Some(stale);
        self
    }

    pub fn set_startkey(mut self, startkey: Value) -> Self {
        self.startkey = Some(startkey);
        self
    }

    pub fn set_startkey_docid(mut self, docid: &str) -> Self {
        self.startkey_docid = Some(docid.to_string());
        self
    }

    /// Sets a parameter by name from a JSON value, validating its type.
    ///
    /// `Value::Null` clears the parameter. `limit`, `skip` and `group_level` take any
    /// non-negative whole number, including floats such as `5.0`. On `Err` the previous
    /// value is kept.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), CouchDbError> {
        let result = self.try_set(name, value);
        if let Err(e) = &result {
            tracing::debug!("Keeping previous value. {}", e);
        }
        result
    }

    fn try_set(&mut self, name: &str, value: Value) -> Result<(), CouchDbError> {
        match name {
            "descending" => self.descending = boolean(name, value)?,
            "endkey" => self.endkey = json(value),
            "endkey_docid" => self.endkey_docid = string(name, value)?,
            "group" => self.group = boolean(name, value)?,
            "group_level" => self.group_level = unsigned(name, value)?,
            "include_docs" => self.include_docs = boolean(name, value)?,
            "inclusive_end" => self.inclusive_end = boolean(name, value)?,
            "key" => self.key = json(value),
            "limit" => self.limit = unsigned(name, value)?,
            "reduce" => self.reduce = boolean(name, value)?,
            "skip" => self.skip = unsigned(name, value)?,
            "stale" => {
                self.stale = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.parse()?),
                    other => {
                        return Err(invalid(name, format!("expected a string, got {}", other)))
                    }
                }
            }
            "startkey" => self.startkey = json(value),
            "startkey_docid" => self.startkey_docid = string(name, value)?,
            other => return Err(invalid(other, "not a recognised view parameter".into())),
        }
        Ok(())
    }
}

// Getters
impl ViewParams {
    pub fn descending(&self) -> Option<bool> {
        self.descending
    }

    pub fn include_docs(&self) -> Option<bool> {
        self.include_docs
    }

    pub fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn stale(&self) -> Option<Stale> {
        self.stale
    }

    /// Serializes every set parameter in the order of [`VIEW_PARAMETERS`].
    ///
    /// Booleans and numbers are written as their literal text. Keys are JSON encoded,
    /// as CouchDB expects, while document ids are sent verbatim.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let json_text = |v: &Value| v.to_string();
        let fields: [Option<String>; 14] = [
            self.descending.map(|b| b.to_string()),
            self.endkey.as_ref().map(json_text),
            self.endkey_docid.clone(),
            self.group.map(|b| b.to_string()),
            self.group_level.map(|n| n.to_string()),
            self.include_docs.map(|b| b.to_string()),
            self.inclusive_end.map(|b| b.to_string()),
            self.key.as_ref().map(json_text),
            self.limit.map(|n| n.to_string()),
            self.reduce.map(|b| b.to_string()),
            self.skip.map(|n| n.to_string()),
            self.stale.map(|s| s.as_str().to_string()),
            self.startkey.as_ref().map(json_text),
            self.startkey_docid.clone(),
        ];

        VIEW_PARAMETERS
            .iter()
            .zip(fields)
            .filter_map(|(name, value)| value.map(|v| (*name, v)))
            .collect()
    }
}

fn invalid(name: &str, reason: String) -> CouchDbError {
    CouchDbError::InvalidViewParameter {
        name: name.to_string(),
        reason,
    }
}

fn boolean(name: &str, value: Value) -> Result<Option<bool>, CouchDbError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        other => Err(invalid(name, format!("expected a boolean, got {}", other))),
    }
}

fn unsigned(name: &str, value: Value) -> Result<Option<u64>, CouchDbError> {
    match value {
        Value::Null => Ok(None),
        // JSON has one number type, so `5.0` counts as the integer 5
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .map(Some)
            .ok_or_else(|| invalid(name, format!("expected a non-negative integer, got {}", n))),
        other => Err(invalid(name, format!("expected a number, got {}", other))),
    }
}

fn string(name: &str, value: Value) -> Result<Option<String>, CouchDbError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(invalid(name, format!("expected a string, got {}", other))),
    }
}

fn json(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}
