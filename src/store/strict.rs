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

use super::config::StoreConfig;
use super::engine::{Payload, StoreCore};
use super::lock_table::LockKey;

/// A persistent, map-like collection which stores each value in its own file.
///
/// Values are serialized to a file in the store directory whose name is derived from the OID of
/// the value. Every anomaly is reported as a distinct [`Error`] variant; see [`PermissiveStore`]
/// for a store which reports failure as an absent result instead.
///
/// # Locking
/// There are two independent kinds of locks:
/// - Lock files protect the bytes of a record while it is being read or written. They are honored
/// by every instance of this type in every process which uses the same directory.
/// - Logical locks, acquired with [`lock`], reserve a record for exclusive modification by the
/// holder of the returned [`LockKey`]. They are only visible to callers of the same instance.
///
/// Every method holds an instance-wide mutex for its full duration, so this type can be shared
/// between threads with an `Arc`.
///
/// # Caching
/// If caching is enabled, [`get`] returns the instance of the value held in the cache. Use
/// [`get_copy`] to get a value which is read from disk and independent of the cache.
///
/// [`Error`]: crate::Error
/// [`PermissiveStore`]: crate::store::PermissiveStore
/// [`lock`]: crate::store::StrictStore::lock
/// [`LockKey`]: crate::store::LockKey
/// [`get`]: crate::store::StrictStore::get
/// [`get_copy`]: crate::store::StrictStore::get_copy
pub struct StrictStore<V> {
    core: StoreCore<V>,
}

impl<V: Payload> StrictStore<V> {
    /// Open the store described by `config`.
    ///
    /// # Errors
    /// - `Error::NotDirectory`: The directory in `config` does not exist.
    /// - `Error::Storage`: The directory could not be listed.
    pub fn open(config: &StoreConfig) -> crate::Result<Self> {
        Ok(StrictStore {
            core: StoreCore::open(config)?,
        })
    }

    /// Open the store in the directory at `path` with the default settings.
    ///
    /// See [`open`] for details.
    ///
    /// [`open`]: crate::store::StrictStore::open
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

    /// Return the value for `oid`.
    ///
    /// If caching is enabled, the returned value is the instance held in the cache.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The record could not be read or deserialized.
    pub fn get(&self, oid: &str) -> crate::Result<Arc<V>> {
        self.core.get(oid)
    }

    /// Return an independent copy of the value for `oid`, read from disk.
    ///
    /// This never reads from or writes to the cache.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The record could not be read or deserialized.
    pub fn get_copy(&self, oid: &str) -> crate::Result<V> {
        self.core.get_copy(oid)
    }

    /// Return the values for each of `oids` in order.
    ///
    /// # Errors
    /// The first error which occurs while getting a value is returned. See [`get`].
    ///
    /// [`get`]: crate::store::StrictStore::get
    pub fn get_many<S: AsRef<str>>(&self, oids: &[S]) -> crate::Result<Vec<Arc<V>>> {
        self.core.get_many(oids, |_, error| Err(error))
    }

    /// Return independent copies of the values for each of `oids` in order.
    ///
    /// # Errors
    /// The first error which occurs while getting a value is returned. See [`get_copy`].
    ///
    /// [`get_copy`]: crate::store::StrictStore::get_copy
    pub fn get_many_copies<S: AsRef<str>>(&self, oids: &[S]) -> crate::Result<Vec<V>> {
        self.core.get_many_copies(oids, |_, error| Err(error))
    }

    /// Store `value` as a new record for `oid` and return it.
    ///
    /// An existing record is never overwritten.
    ///
    /// # Errors
    /// - `Error::AlreadyExists`: There is already a record for `oid`.
    /// - `Error::UnsupportedPayload`: The `value` could not be serialized.
    /// - `Error::Storage`: The record could not be written.
    pub fn put(&self, oid: &str, value: V) -> crate::Result<Arc<V>> {
        self.core.put(oid, value)
    }

    /// Remove the record for `oid`, which is locked with `key`, and return its value.
    ///
    /// The lock is released.
    ///
    /// # Errors
    /// - `Error::InvalidLock`: The record is not locked or is locked with a different key.
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The record could not be read or removed.
    pub fn remove_locked(&self, oid: &str, key: &LockKey) -> crate::Result<Arc<V>> {
        self.core.remove_locked(oid, key)
    }

    /// Remove the unlocked record for `oid` and return its value.
    ///
    /// # Errors
    /// - `Error::LockUnavailable`: The record is locked.
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The record could not be read or removed.
    pub fn remove(&self, oid: &str) -> crate::Result<Arc<V>> {
        self.core.remove(oid)
    }

    /// Delete the record for `oid`, which is locked with `key`, without reading it.
    ///
    /// The lock is released.
    ///
    /// # Errors
    /// - `Error::InvalidLock`: The record is not locked or is locked with a different key.
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The record could not be removed.
    pub fn delete_locked(&self, oid: &str, key: &LockKey) -> crate::Result<bool> {
        self.core.delete_locked(oid, key)
    }

    /// Delete the unlocked record for `oid` without reading it.
    ///
    /// # Errors
    /// - `Error::LockUnavailable`: The record is locked.
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The record could not be removed.
    pub fn delete(&self, oid: &str) -> crate::Result<bool> {
        self.core.delete(oid)
    }

    /// Replace the value of the record for `oid`, which is locked with `key`.
    ///
    /// The caller still holds the lock afterwards.
    ///
    /// # Errors
    /// - `Error::InvalidLock`: The record is not locked or is locked with a different key.
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::UnsupportedPayload`: The `value` could not be serialized.
    /// - `Error::Storage`: The record could not be written.
    pub fn update_locked(&self, oid: &str, value: V, key: &LockKey) -> crate::Result<Arc<V>> {
        self.core.update_locked(oid, value, key)
    }

    /// Replace the value of the unlocked record for `oid`.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::LockUnavailable`: The record is locked.
    /// - `Error::UnsupportedPayload`: The `value` could not be serialized.
    /// - `Error::Storage`: The record could not be written.
    pub fn update(&self, oid: &str, value: V) -> crate::Result<Arc<V>> {
        self.core.update(oid, value)
    }

    /// Lock the record for `oid` and return the key which authorizes changes to it.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::LockUnavailable`: The record is already locked.
    pub fn lock(&self, oid: &str) -> crate::Result<LockKey> {
        self.core.lock(oid)
    }

    /// Release the lock on the record for `oid`.
    ///
    /// This returns `true` if the record is now unlocked, including when it was not locked.
    ///
    /// # Errors
    /// - `Error::InvalidLock`: The record is locked with a different key.
    pub fn unlock(&self, oid: &str, key: &LockKey) -> crate::Result<bool> {
        self.core.unlock(oid, key)
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
    /// The order is the order in which the file system lists the directory.
    ///
    /// # Errors
    /// - `Error::Storage`: The directory could not be listed.
    pub fn ids(&self) -> crate::Result<Vec<String>> {
        self.core.ids()
    }

    /// Return the OIDs of all the records in the directory in lexicographic order.
    ///
    /// # Errors
    /// - `Error::Storage`: The directory could not be listed.
    pub fn ids_sorted(&self) -> crate::Result<Vec<String>> {
        self.core.ids_sorted()
    }

    /// Return the number of records.
    ///
    /// This is counted by this instance and does not reflect changes made by other instances. Use
    /// [`recount`] to count the records on disk.
    ///
    /// [`recount`]: crate::store::StrictStore::recount
    pub fn num_records(&self) -> u64 {
        self.core.num_records()
    }

    /// Count the records on disk, reset the number of records and return it.
    ///
    /// # Errors
    /// - `Error::Storage`: The directory could not be listed.
    pub fn recount(&self) -> crate::Result<u64> {
        self.core.recount()
    }

    /// Return the time the record for `oid` was last written.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no record for `oid`.
    /// - `Error::Storage`: The modification time could not be read.
    pub fn last_modified(&self, oid: &str) -> crate::Result<SystemTime> {
        self.core.last_modified(oid)
    }
}

impl<V> fmt::Debug for StrictStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrictStore")
            .field("path", &self.core.path())
            .finish()
    }
}
