/*
 * Copyright 2019-2021 Wren Powell
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lock keys wrap back to zero when they reach this value.
const LOCK_KEY_LIMIT: u64 = 1_000_000_000;

/// The key which authorizes changes to a locked record.
///
/// A key is returned when a record is locked and must be presented to modify or unlock it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockKey(String);

impl LockKey {
    /// Return this key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for LockKey {
    fn from(key: String) -> Self {
        LockKey(key)
    }
}

impl From<&str> for LockKey {
    fn from(key: &str) -> Self {
        LockKey(key.to_owned())
    }
}

/// A value which keeps track of the logical locks held on records.
///
/// Logical locks only exist in memory and are private to the store instance which owns the table.
/// Other instances, including those in other processes, cannot see them.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: HashMap<String, LockKey>,
    last_key: u64,
}

impl LockTable {
    /// Create a new empty `LockTable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return whether `oid` is locked.
    pub fn is_locked(&self, oid: &str) -> bool {
        self.locks.contains_key(oid)
    }

    /// Return whether `oid` is locked with `key`.
    pub fn is_valid(&self, oid: &str, key: &LockKey) -> bool {
        self.locks.get(oid) == Some(key)
    }

    /// Attempt to lock `oid`.
    ///
    /// This returns a new key or `None` if `oid` is already locked.
    pub fn acquire(&mut self, oid: &str) -> Option<LockKey> {
        if self.is_locked(oid) {
            return None;
        }

        let key = self.next_key();
        self.locks.insert(oid.to_owned(), key.clone());
        Some(key)
    }

    /// Remove the lock on `oid`, returning its key if it was locked.
    pub fn release(&mut self, oid: &str) -> Option<LockKey> {
        self.locks.remove(oid)
    }

    /// Return the number of locked records.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Return whether no records are locked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn next_key(&mut self) -> LockKey {
        self.last_key += 1;
        if self.last_key >= LOCK_KEY_LIMIT {
            self.last_key = 0;
        }
        LockKey(self.last_key.to_string())
    }
}
