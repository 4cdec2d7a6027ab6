//! Remote hash access.
//!
//! `HashStore` is the seam the dispatcher talks to. `RedisStore` is the
//! production implementation. Unit tests swap in `MemoryStore`, which keeps
//! hashes in process.

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;

use redis::{Client, Commands, Connection, ErrorKind, RedisError};

use crate::error::{EnvredisError, Result};

/// Single-hash CRUD against a key-value store.
pub trait HashStore {
    /// Every field of the hash at `key`, in the order the store returns them.
    fn read_all(&self, key: &str) -> Result<Vec<(String, String)>>;

    /// The value of `field`, or `NotFound` when the hash has no such field.
    fn read_one(&self, key: &str, field: &str) -> Result<String>;

    /// Stores `field`, returning true when it did not exist before.
    fn write_one(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    fn delete_field(&self, key: &str, field: &str) -> Result<u64>;

    fn delete_key(&self, key: &str) -> Result<u64>;
}

/// Talks to Redis over a fresh connection for every call.
///
/// The connection is dropped before each method returns. There is no
/// pooling, retry or timeout, so a hung server blocks the caller.
pub struct RedisStore {
    url: String,
}

impl RedisStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn connect(&self) -> Result<Connection> {
        tracing::debug!(url = %self.url, "connecting to store");
        Client::open(self.url.as_str())
            .and_then(|client| client.get_connection())
            .map_err(|err| self.classify(err))
    }

    fn classify(&self, err: RedisError) -> EnvredisError {
        let unreachable = err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.kind() == ErrorKind::InvalidClientConfig;
        if unreachable {
            EnvredisError::Connection { url: self.url.clone(), reason: err.to_string() }
        } else {
            EnvredisError::Protocol(err.to_string())
        }
    }
}

impl HashStore for RedisStore {
    fn read_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.connect()?;
        tracing::debug!(key, "HGETALL");
        conn.hgetall(key).map_err(|err| self.classify(err))
    }

    fn read_one(&self, key: &str, field: &str) -> Result<String> {
        let mut conn = self.connect()?;
        tracing::debug!(key, field, "HGET");
        let value: Option<String> = conn.hget(key, field).map_err(|err| self.classify(err))?;
        value.ok_or_else(|| EnvredisError::NotFound(field.to_string()))
    }

    fn write_one(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut conn = self.connect()?;
        tracing::debug!(key, field, "HSET");
        let added: u64 = conn.hset(key, field, value).map_err(|err| self.classify(err))?;
        Ok(added == 1)
    }

    fn delete_field(&self, key: &str, field: &str) -> Result<u64> {
        let mut conn = self.connect()?;
        tracing::debug!(key, field, "HDEL");
        conn.hdel(key, field).map_err(|err| self.classify(err))
    }

    fn delete_key(&self, key: &str) -> Result<u64> {
        let mut conn = self.connect()?;
        tracing::debug!(key, "DEL");
        conn.del(key).map_err(|err| self.classify(err))
    }
}

/// In-process store with the same reply semantics as `RedisStore`.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    hashes: RefCell<HashMap<String, Vec<(String, String)>>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash(key: &str, fields: &[(&str, &str)]) -> Self {
        let store = Self::new();
        store.hashes.borrow_mut().insert(
            key.to_string(),
            fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );
        store
    }
}

#[cfg(test)]
impl HashStore for MemoryStore {
    fn read_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        Ok(self.hashes.borrow().get(key).cloned().unwrap_or_default())
    }

    fn read_one(&self, key: &str, field: &str) -> Result<String> {
        self.hashes
            .borrow()
            .get(key)
            .and_then(|hash| hash.iter().find(|(name, _)| name == field))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| EnvredisError::NotFound(field.to_string()))
    }

    fn write_one(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut hashes = self.hashes.borrow_mut();
        let hash = hashes.entry(key.to_string()).or_default();
        match hash.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => {
                entry.1 = value.to_string();
                Ok(false)
            }
            None => {
                hash.push((field.to_string(), value.to_string()));
                Ok(true)
            }
        }
    }

    fn delete_field(&self, key: &str, field: &str) -> Result<u64> {
        let mut hashes = self.hashes.borrow_mut();
        let Some(hash) = hashes.get_mut(key) else {
            return Ok(0);
        };
        let before = hash.len();
        hash.retain(|(name, _)| name != field);
        let removed = (before - hash.len()) as u64;
        // Redis drops a hash once its last field is gone.
        if hash.is_empty() {
            hashes.remove(key);
        }
        Ok(removed)
    }

    fn delete_key(&self, key: &str) -> Result<u64> {
        Ok(u64::from(self.hashes.borrow_mut().remove(key).is_some()))
    }
}
