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
use std::fs::{metadata, read, read_dir, remove_file};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::Builder as TempFileBuilder;
use tracing::{debug, trace};

use super::codec::{decode, encode, is_encoded};
use super::config::StoreConfig;
use super::file_lock::{FileLock, FileLocks};
use super::lock_table::{LockKey, LockTable};
use crate::error::{Error, Result};

/// The prefix of the staging files which records are written to before being moved into place.
const STAGING_PREFIX: &str = ".";

/// The suffix of staging files.
const STAGING_SUFFIX: &str = ".tmp";

/// A type which can be stored as a record.
pub trait Payload: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// The mutable state of a store instance.
#[derive(Debug)]
struct State<V> {
    /// The logical locks held on records.
    locks: LockTable,

    /// The values most recently read from or written to each record path, if caching is enabled.
    cache: Option<HashMap<PathBuf, Arc<V>>>,

    /// The number of records as tracked by this instance.
    num_records: u64,
}

impl<V> State<V> {
    fn cached(&self, path: &Path) -> Option<Arc<V>> {
        self.cache.as_ref()?.get(path).cloned()
    }

    fn cache_value(&mut self, path: PathBuf, value: &Arc<V>) {
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(path, Arc::clone(value));
        }
    }

    fn evict(&mut self, path: &Path) {
        if let Some(cache) = self.cache.as_mut() {
            cache.remove(path);
        }
    }

    /// Fail with `InvalidLock` unless `oid` is locked with `key`.
    fn check_key(&self, oid: &str, key: &LockKey) -> Result<()> {
        if self.locks.is_valid(oid, key) {
            Ok(())
        } else {
            Err(Error::InvalidLock(oid.to_owned()))
        }
    }

    /// Fail with `LockUnavailable` if `oid` is locked by anyone.
    fn check_unlocked(&self, oid: &str) -> Result<()> {
        if self.locks.is_locked(oid) {
            Err(Error::LockUnavailable(oid.to_owned()))
        } else {
            Ok(())
        }
    }
}

/// The engine shared by [`StrictStore`] and [`PermissiveStore`].
///
/// Every operation holds the instance mutex for its full duration, so operations on one instance
/// never interleave. Access from other instances and processes is coordinated only by the lock
/// files around each read and write.
///
/// [`StrictStore`]: crate::store::StrictStore
/// [`PermissiveStore`]: crate::store::PermissiveStore
pub(super) struct StoreCore<V> {
    path: PathBuf,
    file_locks: FileLocks,
    state: Mutex<State<V>>,
}

impl<V> StoreCore<V> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V: Payload> StoreCore<V> {
    /// Open the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if !config.path.is_dir() {
            return Err(Error::NotDirectory(config.path.clone()));
        }

        remove_abandoned_staging_files(&config.path, config.stale_lock_timeout)?;

        let num_records = list_names(&config.path)?.len() as u64;
        let cache = if config.cache {
            Some(HashMap::new())
        } else {
            None
        };

        debug!(
            path = %config.path.display(),
            num_records,
            cache = config.cache,
            "Opened store."
        );

        Ok(StoreCore {
            path: config.path.clone(),
            file_locks: FileLocks::new(
                &config.path,
                config.lock_poll_interval,
                config.stale_lock_timeout,
            ),
            state: Mutex::new(State {
                locks: LockTable::new(),
                cache,
                num_records,
            }),
        })
    }

    pub fn is_cached(&self) -> bool {
        self.state().cache.is_some()
    }

    /// Lock the instance state.
    ///
    /// State is only changed after the filesystem step of an operation has succeeded, so the state
    /// held by a poisoned mutex is still consistent.
    fn state(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_path(&self, oid: &str) -> PathBuf {
        self.path.join(encode(oid))
    }

    fn record_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn lock_file(&self, oid: &str) -> Result<FileLock> {
        let lock = self
            .file_locks
            .acquire(oid)
            .with_context(|| format!("Could not acquire the lock file for the OID '{}'.", oid))?;
        Ok(lock)
    }

    /// Read and deserialize the record at `path`. The caller must hold its lock file.
    fn read_record(&self, oid: &str, path: &Path) -> Result<V> {
        let bytes = match read(path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(oid.to_owned()))
            }
            Err(error) => {
                return Err(anyhow::Error::from(error)
                    .context(format!("Could not read the record for the OID '{}'.", oid))
                    .into())
            }
        };

        let value = rmp_serde::from_slice(&bytes)
            .with_context(|| format!("Could not deserialize the record for the OID '{}'.", oid))?;
        Ok(value)
    }

    /// Lock the file of the record at `path`, failing with `NotFound` if it doesn't exist.
    ///
    /// Existence is checked again once the lock is held, since another process may have removed
    /// the record while this one was waiting.
    fn lock_existing(&self, state: &mut State<V>, oid: &str, path: &Path) -> Result<FileLock> {
        if !self.record_exists(path) {
            state.evict(path);
            return Err(Error::NotFound(oid.to_owned()));
        }

        let lock = self.lock_file(oid)?;

        if !self.record_exists(path) {
            state.evict(path);
            return Err(Error::NotFound(oid.to_owned()));
        }

        Ok(lock)
    }

    /// Atomically write `bytes` to the record at `path`. The caller must hold its lock file.
    ///
    /// Unless `overwrite` is `true`, this fails with `AlreadyExists` if the record exists.
    fn write_record(&self, oid: &str, path: &Path, bytes: &[u8], overwrite: bool) -> Result<()> {
        let mut staging_file = TempFileBuilder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&self.path)
            .with_context(|| format!("Could not stage the record for the OID '{}'.", oid))?;
        staging_file
            .write_all(bytes)
            .with_context(|| format!("Could not write the record for the OID '{}'.", oid))?;

        let persisted = if overwrite {
            staging_file.persist(path)
        } else {
            staging_file.persist_noclobber(path)
        };

        match persisted {
            Ok(_) => Ok(()),
            Err(error) if !overwrite && error.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(oid.to_owned()))
            }
            Err(error) => Err(anyhow::Error::from(error.error)
                .context(format!("Could not write the record for the OID '{}'.", oid))
                .into()),
        }
    }

    /// Read the record for `oid` from the cache or disk.
    fn load(&self, state: &mut State<V>, oid: &str) -> Result<Arc<V>> {
        let path = self.record_path(oid);
        let lock = self.lock_existing(state, oid, &path)?;

        if let Some(value) = state.cached(&path) {
            trace!(oid, "Cache hit.");
            return Ok(value);
        }

        let value = Arc::new(self.read_record(oid, &path)?);
        drop(lock);

        state.cache_value(path, &value);

        Ok(value)
    }

    fn load_copy(&self, oid: &str) -> Result<V> {
        let path = self.record_path(oid);
        if !self.record_exists(&path) {
            return Err(Error::NotFound(oid.to_owned()));
        }

        let _lock = self.lock_file(oid)?;
        self.read_record(oid, &path)
    }

    /// Remove the record file at `path`. The caller must hold its lock file.
    fn unlink(&self, state: &mut State<V>, oid: &str, path: &Path) -> Result<()> {
        match remove_file(path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                state.evict(path);
                return Err(Error::NotFound(oid.to_owned()));
            }
            Err(error) => {
                return Err(anyhow::Error::from(error)
                    .context(format!("Could not remove the record for the OID '{}'.", oid))
                    .into())
            }
        }

        state.evict(path);
        state.num_records = state.num_records.saturating_sub(1);
        debug!(oid, "Removed record.");

        Ok(())
    }

    /// Remove the record for `oid` from disk and return its value.
    fn take(&self, state: &mut State<V>, oid: &str) -> Result<Arc<V>> {
        let path = self.record_path(oid);
        let lock = self.lock_existing(state, oid, &path)?;

        let value = match state.cached(&path) {
            Some(value) => value,
            None => Arc::new(self.read_record(oid, &path)?),
        };
        self.unlink(state, oid, &path)?;
        drop(lock);

        Ok(value)
    }

    /// Remove the record for `oid` from disk without reading it.
    fn discard(&self, state: &mut State<V>, oid: &str) -> Result<()> {
        let path = self.record_path(oid);
        let lock = self.lock_existing(state, oid, &path)?;
        self.unlink(state, oid, &path)?;
        drop(lock);
        Ok(())
    }

    /// Serialize `value` and write it as a new record.
    ///
    /// This fails with `AlreadyExists` if the record was created by someone else in the meantime.
    fn insert(&self, state: &mut State<V>, oid: &str, value: V) -> Result<Arc<V>> {
        let path = self.record_path(oid);
        let bytes = serialize(oid, &value)?;

        let lock = self.lock_file(oid)?;
        self.write_record(oid, &path, &bytes, false)?;
        drop(lock);

        let value = Arc::new(value);
        state.cache_value(path, &value);
        state.num_records += 1;
        debug!(oid, size = bytes.len(), "Inserted record.");

        Ok(value)
    }

    /// Serialize `value` and write it over the existing record.
    ///
    /// This fails with `NotFound` if the record was removed by someone else in the meantime.
    fn replace(&self, state: &mut State<V>, oid: &str, value: V) -> Result<Arc<V>> {
        let path = self.record_path(oid);
        let bytes = serialize(oid, &value)?;

        let lock = self.lock_existing(state, oid, &path)?;
        self.write_record(oid, &path, &bytes, true)?;
        drop(lock);

        let value = Arc::new(value);
        state.cache_value(path, &value);
        debug!(oid, size = bytes.len(), "Replaced record.");

        Ok(value)
    }

    pub fn get(&self, oid: &str) -> Result<Arc<V>> {
        let mut state = self.state();
        self.load(&mut state, oid)
    }

    pub fn get_copy(&self, oid: &str) -> Result<V> {
        let _state = self.state();
        self.load_copy(oid)
    }

    /// Get the values for each of `oids` in order.
    ///
    /// When getting a value fails, `on_error` decides whether to abort by returning `Err` or to
    /// skip the value by returning `Ok`.
    pub fn get_many<S, F>(&self, oids: &[S], mut on_error: F) -> Result<Vec<Arc<V>>>
    where
        S: AsRef<str>,
        F: FnMut(&str, Error) -> Result<()>,
    {
        let mut state = self.state();
        let mut values = Vec::with_capacity(oids.len());

        for oid in oids {
            match self.load(&mut state, oid.as_ref()) {
                Ok(value) => values.push(value),
                Err(error) => on_error(oid.as_ref(), error)?,
            }
        }

        Ok(values)
    }

    /// Get independent copies of the values for each of `oids` in order.
    ///
    /// See `get_many` for the meaning of `on_error`.
    pub fn get_many_copies<S, F>(&self, oids: &[S], mut on_error: F) -> Result<Vec<V>>
    where
        S: AsRef<str>,
        F: FnMut(&str, Error) -> Result<()>,
    {
        let _state = self.state();
        let mut values = Vec::with_capacity(oids.len());

        for oid in oids {
            match self.load_copy(oid.as_ref()) {
                Ok(value) => values.push(value),
                Err(error) => on_error(oid.as_ref(), error)?,
            }
        }

        Ok(values)
    }

    pub fn put(&self, oid: &str, value: V) -> Result<Arc<V>> {
        let mut state = self.state();
        if self.record_exists(&self.record_path(oid)) {
            return Err(Error::AlreadyExists(oid.to_owned()));
        }
        self.insert(&mut state, oid, value)
    }

    /// Write `value` for `oid`, replacing the existing record if there is one.
    ///
    /// An existing record may only be replaced if it is unlocked or, when `key` is given, locked
    /// with `key`. Whether the record exists is decided while holding its lock file.
    pub fn put_or_replace(&self, oid: &str, value: V, key: Option<&LockKey>) -> Result<Arc<V>> {
        let mut state = self.state();
        let path = self.record_path(oid);
        let bytes = serialize(oid, &value)?;

        let lock = self.lock_file(oid)?;
        let exists = self.record_exists(&path);
        if exists {
            match key {
                Some(key) => state.check_key(oid, key)?,
                None => state.check_unlocked(oid)?,
            }
        }
        self.write_record(oid, &path, &bytes, exists)?;
        drop(lock);

        let value = Arc::new(value);
        state.cache_value(path, &value);
        if exists {
            debug!(oid, size = bytes.len(), "Replaced record.");
        } else {
            state.num_records += 1;
            debug!(oid, size = bytes.len(), "Inserted record.");
        }

        Ok(value)
    }

    pub fn remove_locked(&self, oid: &str, key: &LockKey) -> Result<Arc<V>> {
        let mut state = self.state();
        state.check_key(oid, key)?;
        let value = self.take(&mut state, oid)?;
        state.locks.release(oid);
        Ok(value)
    }

    pub fn remove(&self, oid: &str) -> Result<Arc<V>> {
        let mut state = self.state();
        state.check_unlocked(oid)?;
        self.take(&mut state, oid)
    }

    pub fn delete_locked(&self, oid: &str, key: &LockKey) -> Result<bool> {
        let mut state = self.state();
        state.check_key(oid, key)?;
        self.discard(&mut state, oid)?;
        state.locks.release(oid);
        Ok(true)
    }

    pub fn delete(&self, oid: &str) -> Result<bool> {
        let mut state = self.state();
        state.check_unlocked(oid)?;
        self.discard(&mut state, oid)?;
        Ok(true)
    }

    pub fn update_locked(&self, oid: &str, value: V, key: &LockKey) -> Result<Arc<V>> {
        let mut state = self.state();
        state.check_key(oid, key)?;
        if !self.record_exists(&self.record_path(oid)) {
            return Err(Error::NotFound(oid.to_owned()));
        }
        self.replace(&mut state, oid, value)
    }

    pub fn update(&self, oid: &str, value: V) -> Result<Arc<V>> {
        let mut state = self.state();
        if !self.record_exists(&self.record_path(oid)) {
            return Err(Error::NotFound(oid.to_owned()));
        }
        state.check_unlocked(oid)?;
        self.replace(&mut state, oid, value)
    }

    pub fn lock(&self, oid: &str) -> Result<LockKey> {
        let mut state = self.state();
        if !self.record_exists(&self.record_path(oid)) {
            return Err(Error::NotFound(oid.to_owned()));
        }
        let key = state
            .locks
            .acquire(oid)
            .ok_or_else(|| Error::LockUnavailable(oid.to_owned()))?;
        trace!(oid, key = %key, "Locked record.");
        Ok(key)
    }

    pub fn unlock(&self, oid: &str, key: &LockKey) -> Result<bool> {
        let mut state = self.state();
        if !state.locks.is_locked(oid) {
            return Ok(true);
        }
        state.check_key(oid, key)?;
        state.locks.release(oid);
        trace!(oid, "Unlocked record.");
        Ok(true)
    }

    pub fn is_locked(&self, oid: &str) -> bool {
        self.state().locks.is_locked(oid)
    }

    pub fn is_valid_lock(&self, oid: &str, key: &LockKey) -> bool {
        self.state().locks.is_valid(oid, key)
    }

    pub fn oid_exists(&self, oid: &str) -> bool {
        self.record_exists(&self.record_path(oid))
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        let _state = self.state();
        Ok(list_names(&self.path)?
            .iter()
            .map(|name| decode(name))
            .collect())
    }

    pub fn ids_sorted(&self) -> Result<Vec<String>> {
        let mut ids = self.ids()?;
        ids.sort();
        Ok(ids)
    }

    pub fn num_records(&self) -> u64 {
        self.state().num_records
    }

    pub fn recount(&self) -> Result<u64> {
        let mut state = self.state();
        state.num_records = list_names(&self.path)?.len() as u64;
        Ok(state.num_records)
    }

    pub fn last_modified(&self, oid: &str) -> Result<SystemTime> {
        let _state = self.state();
        let path = self.record_path(oid);
        if !self.record_exists(&path) {
            return Err(Error::NotFound(oid.to_owned()));
        }
        let modified = metadata(&path)
            .and_then(|metadata| metadata.modified())
            .with_context(|| {
                format!("Could not read the modification time for the OID '{}'.", oid)
            })?;
        Ok(modified)
    }
}

fn serialize<V: Serialize>(oid: &str, value: &V) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|source| Error::UnsupportedPayload {
        oid: oid.to_owned(),
        source,
    })
}

/// Remove staging files in `directory` which are older than `max_age`.
///
/// A staging file only outlives its write if the writing process exited partway through. Newer
/// staging files may belong to a write in progress in another process and are left alone.
fn remove_abandoned_staging_files(directory: &Path, max_age: Duration) -> Result<()> {
    let context = || format!("Could not list the directory '{}'.", directory.display());

    for entry in read_dir(directory).with_context(context)? {
        let entry = entry.with_context(context)?;
        let is_staging_file = entry.file_name().to_str().map_or(false, |name| {
            name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
        });
        if !is_staging_file {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok());
        if age.map_or(true, |age| age <= max_age) {
            continue;
        }

        match remove_file(entry.path()) {
            Ok(()) => debug!(path = %entry.path().display(), "Removed abandoned staging file."),
            // Another instance removed it first.
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(anyhow::Error::from(error)
                    .context(format!(
                        "Could not remove the staging file '{}'.",
                        entry.path().display()
                    ))
                    .into())
            }
        }
    }

    Ok(())
}

/// Return the names of the record files in `directory`.
fn list_names(directory: &Path) -> Result<Vec<String>> {
    let context = || format!("Could not list the directory '{}'.", directory.display());
    let mut names = Vec::new();

    for entry in read_dir(directory).with_context(context)? {
        let entry = entry.with_context(context)?;
        if !entry.file_type().with_context(context)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_encoded(name) {
                names.push(name.to_owned());
            }
        }
    }

    Ok(names)
}
