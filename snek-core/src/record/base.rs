//! Base implementation of records for logging.
use crate::error::SnekError;
use chrono::prelude::{DateTime, Local};
use std::{
    collections::{
        hash_map::{Iter, Keys},
        HashMap,
    },
    convert::Into,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically used for metrics.
    Scalar(f32),

    /// A timestamp with local timezone, useful for logging events.
    DateTime(DateTime<Local>),

    /// A text value, useful for storing labels or descriptions.
    String(String),
}

/// A container for storing key-value pairs of various data types.
///
/// # Examples
///
/// ```rust
/// use snek_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("loss_critic", 0.5);
/// record.insert("mean_reward", RecordValue::Scalar(0.95));
///
/// let loss = record.get_scalar("loss_critic").unwrap();
/// ```
#[derive(Debug)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<'_, String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// If both records contain the same key, the value from the second
    /// record overwrites the value from the first record.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the value is not a
    /// scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, SnekError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::Scalar(v) => Ok(*v as _),
                _ => Err(SnekError::RecordValueTypeError("Scalar".to_string())),
            }
        } else {
            Err(SnekError::RecordKeyError(k.to_string()))
        }
    }

    /// Gets a string value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the value is not a
    /// string.
    pub fn get_string(&self, k: &str) -> Result<String, SnekError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::String(s) => Ok(s.clone()),
                _ => Err(SnekError::RecordValueTypeError("String".to_string())),
            }
        } else {
            Err(SnekError::RecordKeyError(k.to_string()))
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
