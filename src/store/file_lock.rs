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

use std::fs::{metadata, remove_file, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime};

use tracing::{trace, warn};

use super::codec::encode;

/// The suffix appended to the encoded OID to form the name of its lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// A lock on the file of a single record.
///
/// The lock file is removed when this value is dropped.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// The path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, returning any error which occurred while removing the lock file.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        remove_lock_file(&self.path)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(error) = remove_lock_file(&self.path) {
                warn!(path = %self.path.display(), %error, "Failed to remove lock file.");
            }
        }
    }
}

fn remove_lock_file(path: &Path) -> io::Result<()> {
    match remove_file(path) {
        Ok(()) => Ok(()),
        // Someone presumed the lock abandoned and removed it.
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Advisory locks on records, implemented as lock files next to the records.
///
/// These locks protect the bytes of a record while it is being read or written and are honored
/// by every process which accesses the same directory through this crate. A lock file which has
/// been waited on for longer than the stale timeout, or whose modification time is older than the
/// stale timeout, is assumed to have been left behind by a process which exited without releasing
/// it, and is removed.
#[derive(Debug, Clone)]
pub struct FileLocks {
    directory: PathBuf,
    poll_interval: Duration,
    stale_timeout: Duration,
}

impl FileLocks {
    /// Create a lock manager for the records in `directory`.
    pub fn new(
        directory: impl Into<PathBuf>,
        poll_interval: Duration,
        stale_timeout: Duration,
    ) -> Self {
        Self {
            directory: directory.into(),
            poll_interval,
            stale_timeout,
        }
    }

    /// Return the path of the lock file for `oid`.
    pub fn lock_path(&self, oid: &str) -> PathBuf {
        let mut file_name = encode(oid);
        file_name.push_str(LOCK_SUFFIX);
        self.directory.join(file_name)
    }

    /// Return whether a lock file for `oid` currently exists.
    pub fn is_held(&self, oid: &str) -> bool {
        self.lock_path(oid).exists()
    }

    /// Acquire the lock for `oid`, blocking until it is available.
    ///
    /// # Errors
    /// - `io::Error`: The lock file could not be created or a stale lock file could not be
    /// removed.
    pub fn acquire(&self, oid: &str) -> io::Result<FileLock> {
        let path = self.lock_path(oid);
        let mut waiting_since = Instant::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    trace!(path = %path.display(), "Acquired lock file.");
                    return Ok(FileLock {
                        path,
                        released: false,
                    });
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                    if waiting_since.elapsed() > self.stale_timeout || self.is_stale(&path) {
                        warn!(
                            path = %path.display(),
                            timeout = ?self.stale_timeout,
                            "Lock file appears to be abandoned. Removing it."
                        );
                        remove_lock_file(&path)?;
                        waiting_since = Instant::now();
                    } else {
                        sleep(self.poll_interval);
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Return whether the lock file at `path` is older than the stale timeout.
    fn is_stale(&self, path: &Path) -> bool {
        metadata(path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map_or(false, |age| age > self.stale_timeout)
    }
}
