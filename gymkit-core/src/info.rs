//! Per-step auxiliary information.
//!
//! [`Info`] is a string-keyed map carried alongside every `reset`/`step`
//! result. It transports metadata that does not belong in the transition
//! tuple itself: time-limit flags, episode statistics, the final transition
//! of an auto-reset episode. Values are restricted to a small closed set of
//! JSON-like kinds plus an opaque passthrough for raw observations.
use crate::error::GymError;
use crate::value::Value;
use anyhow::Result;
use std::collections::btree_map::{IntoIter, Iter};
use std::collections::BTreeMap;

/// Key under which [`TimeLimit`](crate::wrapper::TimeLimit) tags a
/// limit-induced truncation.
pub const KEY_TIME_LIMIT: &str = "TimeLimit.truncated";

/// Key under which [`AutoReset`](crate::wrapper::AutoReset) exposes the
/// terminal observation of a finished episode.
pub const KEY_FINAL_OBS: &str = "final_observation";

/// Key under which [`AutoReset`](crate::wrapper::AutoReset) exposes the
/// terminal info of a finished episode.
pub const KEY_FINAL_INFO: &str = "final_info";

/// Default key under which
/// [`RecordEpisodeStatistics`](crate::wrapper::RecordEpisodeStatistics)
/// attaches episode statistics.
pub const KEY_EPISODE: &str = "episode";

/// A value stored in an [`Info`] map.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    /// A boolean flag.
    Bool(bool),

    /// An integer, e.g. an episode length.
    Int(i64),

    /// A floating point number, e.g. an episode return.
    Float(f64),

    /// A text value.
    Str(String),

    /// An ordered list of values.
    Seq(Vec<InfoValue>),

    /// A nested string-keyed map.
    Map(BTreeMap<String, InfoValue>),

    /// An opaque observation or action, passed through untouched.
    Obs(Value),
}

/// A string-keyed map of per-step metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info(BTreeMap<String, InfoValue>);

impl Info {
    /// Creates an empty map.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a value, replacing any previous entry under the key.
    pub fn insert(&mut self, key: impl Into<String>, value: InfoValue) {
        self.0.insert(key.into(), value);
    }

    /// Inserts a value, failing if the key is already present.
    pub fn try_insert(&mut self, key: impl Into<String>, value: InfoValue) -> Result<()> {
        let key = key.into();
        if self.0.contains_key(&key) {
            return Err(GymError::KeyCollision(key).into());
        }
        self.0.insert(key, value);
        Ok(())
    }

    /// Looks up a value.
    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.0.get(key)
    }

    /// Looks up a boolean value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(InfoValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Looks up an integer value.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(InfoValue::Int(x)) => Some(*x),
            _ => None,
        }
    }

    /// Looks up a floating point value.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(InfoValue::Float(x)) => Some(*x),
            _ => None,
        }
    }

    /// Looks up a nested map.
    pub fn get_map(&self, key: &str) -> Option<&BTreeMap<String, InfoValue>> {
        match self.0.get(key) {
            Some(InfoValue::Map(m)) => Some(m),
            _ => None,
        }
    }

    /// Looks up an opaque observation.
    pub fn get_obs(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            Some(InfoValue::Obs(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> Iter<'_, String, InfoValue> {
        self.0.iter()
    }

    /// Turns the whole map into a nested [`InfoValue::Map`].
    pub fn into_value(self) -> InfoValue {
        InfoValue::Map(self.0)
    }
}

impl IntoIterator for Info {
    type Item = (String, InfoValue);
    type IntoIter = IntoIter<String, InfoValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let mut info = Info::empty();
        info.insert("flag", InfoValue::Bool(true));
        info.insert("count", InfoValue::Int(3));
        info.insert("ret", InfoValue::Float(1.5));
        assert_eq!(info.get_bool("flag"), Some(true));
        assert_eq!(info.get_int("count"), Some(3));
        assert_eq!(info.get_float("ret"), Some(1.5));
        assert_eq!(info.get_bool("count"), None);
        assert_eq!(info.get("missing"), None);
    }

    #[test]
    fn try_insert_detects_collision() {
        let mut info = Info::empty();
        info.try_insert("episode", InfoValue::Int(1)).unwrap();
        let err = info.try_insert("episode", InfoValue::Int(2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymError>(),
            Some(GymError::KeyCollision(_))
        ));
    }
}
