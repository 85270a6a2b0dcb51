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

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use super::config::StoreConfig;
use super::engine::{Payload, StoreCore};
use super::lock_table::LockKey;

/// Convert the result of `operation` on `oid` into an `Option`, logging any error.
fn absorb<T>(operation: &str, oid: &str, result: crate::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(operation, oid, %error, "Store operation failed.");
            None
        }
    }
}

/// A store which reports every failure as an absent result.
///
/// This shares all of its mechanics with [`StrictStore`], including locking and caching, but
/// methods return `None`, `false` or omit values instead of returning an error. The reason for a
/// failure is logged at the `debug` level and is otherwise lost; use [`StrictStore`] when callers
/// need to tell failures apart.
///
/// Unlike [`StrictStore::put`], [`put`] replaces an existing record.
///
/// [`StrictStore`]: crate::store::StrictStore
/// [`StrictStore::put`]: crate::store::StrictStore::put
/// [`put`]: crate::store::PermissiveStore::put
pub struct PermissiveStore<V> {
    core: StoreCore<V>,
}

impl<V: Payload> PermissiveStore<V> {
    /// Open the store described by `config`.
    ///
    /// Opening the store is the only operation which returns an error.
    ///
    /// # Errors
    /// - `Error::NotDirectory`: The directory in `config` does not exist.
    /// - `Error::Storage`: The directory could not be listed.
    pub fn open(config: &StoreConfig) -> crate::Result<Self> {
        Ok(PermissiveStore {
            core: StoreCore::open(config)?,
        })
    }

    /// Open the store in the directory at `path` with the default settings.
    pub fn new(path: impl Into<PathBuf>, cache: bool) -> crate::Result<Self> {
        Self::open(&StoreConfig::new(path).cache(cache))
    }

    /// The directory which holds the records.
    pub fn path(&self) -> &Path {
        self.core.path()
    }

    /// Return whether values are cached in memory.
    pub fn is_cached(&self) -> bool {
        self.core.is_cached()
    }

    /// Return the value for `oid`, or `None` if it could not be read.
    ///
    /// If caching is enabled, the returned value is the instance held in the cache.
    pub fn get(&self, oid: &str) -> Option<Arc<V>> {
        absorb("get", oid, self.core.get(oid))
    }

    /// Return an independent copy of the value for `oid`, or `None` if it could not be read.
    pub fn get_copy(&self, oid: &str) -> Option<V> {
        absorb("get_copy", oid, self.core.get_copy(oid))
    }

    /// Return the values for each of `oids` which could be read, in order.
    pub fn get_many<S: AsRef<str>>(&self, oids: &[S]) -> Vec<Arc<V>> {
        let result = self.core.get_many(oids, |oid, error| {
            absorb::<()>("get_many", oid, Err(error));
            Ok(())
        });
        result.unwrap_or_default()
    }

    /// Return independent copies of the values for each of `oids` which could be read, in order.
    pub fn get_many_copies<S: AsRef<str>>(&self, oids: &[S]) -> Vec<V> {
        let result = self.core.get_many_copies(oids, |oid, error| {
            absorb::<()>("get_many_copies", oid, Err(error));
            Ok(())
        });
        result.unwrap_or_default()
    }

    /// Store `value` for `oid` and return it, replacing any unlocked record for `oid`.
    ///
    /// This returns `None` if the record is locked or could not be written.
    pub fn put(&self, oid: &str, value: V) -> Option<Arc<V>> {
        absorb("put", oid, self.core.put_or_replace(oid, value, None))
    }

    /// Store `value` for `oid` and return it, replacing the record if it is locked with `key`.
    ///
    /// The caller still holds the lock afterwards. If there is no record for `oid`, a new one is
    /// created. This returns `None` if the record is locked with a different key, is not locked or
    /// could not be written.
    pub fn put_locked(&self, oid: &str, value: V, key: &LockKey) -> Option<Arc<V>> {
        absorb("put_locked", oid, self.core.put_or_replace(oid, value, Some(key)))
    }

    /// Replace the value for `oid`. This is the same as [`put`].
    ///
    /// [`put`]: crate::store::PermissiveStore::put
    pub fn update(&self, oid: &str, value: V) -> Option<Arc<V>> {
        absorb("update", oid, self.core.put_or_replace(oid, value, None))
    }

    /// Replace the value for `oid`, which is locked with `key`. This is the same as
    /// [`put_locked`].
    ///
    /// [`put_locked`]: crate::store::PermissiveStore::put_locked
    pub fn update_locked(&self, oid: &str, value: V, key: &LockKey) -> Option<Arc<V>> {
        absorb(
            "update_locked",
            oid,
            self.core.put_or_replace(oid, value, Some(key)),
        )
    }

    /// Remove the record for `oid`, which is locked with `key`, and return its value.
    pub fn remove_locked(&self, oid: &str, key: &LockKey) -> Option<Arc<V>> {
        absorb("remove_locked", oid, self.core.remove_locked(oid, key))
    }

    /// Remove the unlocked record for `oid` and return its value.
    pub fn remove(&self, oid: &str) -> Option<Arc<V>> {
        absorb("remove", oid, self.core.remove(oid))
    }

    /// Delete the record for `oid`, which is locked with `key`.
    ///
    /// This returns `true` if the record was deleted.
    pub fn delete_locked(&self, oid: &str, key: &LockKey) -> bool {
        absorb("delete_locked", oid, self.core.delete_locked(oid, key)).unwrap_or(false)
    }

    /// Delete the unlocked record for `oid`.
    ///
    /// This returns `true` if the record was deleted.
    pub fn delete(&self, oid: &str) -> bool {
        absorb("delete", oid, self.core.delete(oid)).unwrap_or(false)
    }

    /// Lock the record for `oid`, returning `None` if it doesn't exist or is already locked.
    pub fn lock(&self, oid: &str) -> Option<LockKey> {
        absorb("lock", oid, self.core.lock(oid))
    }

    /// Release the lock on the record for `oid`.
    ///
    /// This returns `false` if the record is locked with a different key.
    pub fn unlock(&self, oid: &str, key: &LockKey) -> bool {
        absorb("unlock", oid, self.core.unlock(oid, key)).unwrap_or(false)
    }

    /// Return whether the record for `oid` is locked.
    pub fn is_locked(&self, oid: &str) -> bool {
        self.core.is_locked(oid)
    }

    /// Return whether the record for `oid` is locked with `key`.
    pub fn is_valid_lock(&self, oid: &str, key: &LockKey) -> bool {
        self.core.is_valid_lock(oid, key)
    }

    /// Return whether there is a record for `oid` on disk.
    pub fn oid_exists(&self, oid: &str) -> bool {
        self.core.oid_exists(oid)
    }

    /// Return the OIDs of all the records in the directory.
    ///
    /// This returns an empty list if the directory could not be listed.
    pub fn ids(&self) -> Vec<String> {
        absorb("ids", "", self.core.ids()).unwrap_or_default()
    }

    /// Return the OIDs of all the records in the directory in lexicographic order.
    pub fn ids_sorted(&self) -> Vec<String> {
        absorb("ids_sorted", "", self.core.ids_sorted()).unwrap_or_default()
    }

    /// Return the number of records as counted by this instance.
    pub fn num_records(&self) -> u64 {
        self.core.num_records()
    }

    /// Count the records on disk, reset the number of records and return it.
    pub fn recount(&self) -> Option<u64> {
        absorb("recount", "", self.core.recount())
    }

    /// Return the time the record for `oid` was last written.
    pub fn last_modified(&self, oid: &str) -> Option<SystemTime> {
        absorb("last_modified", oid, self.core.last_modified(oid))
    }
}

impl<V> fmt::Debug for PermissiveStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissiveStore")
            .field("path", &self.core.path())
            .finish()
    }
}
