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

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The default interval between attempts to acquire a lock file.
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The default time after which a lock file is assumed to be abandoned.
pub const DEFAULT_STALE_LOCK_TIMEOUT: Duration = Duration::from_secs(6);

/// The configuration for opening a store.
///
/// Both [`StrictStore`] and [`PermissiveStore`] are opened from this type. Use
/// [`StoreConfig::new`] to get a config with reasonable defaults for everything except the path.
///
/// [`StrictStore`]: crate::store::StrictStore
/// [`PermissiveStore`]: crate::store::PermissiveStore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct StoreConfig {
    /// The directory which holds the records. It must already exist.
    pub path: PathBuf,

    /// Whether to keep the values which are read and written in memory.
    ///
    /// When this is enabled, [`StrictStore::get`] returns the instance held in the cache, so
    /// every caller sees the same instance. Use [`StrictStore::get_copy`] to get an independent
    /// instance read from disk.
    ///
    /// The default value is `false`.
    ///
    /// [`StrictStore::get`]: crate::store::StrictStore::get
    /// [`StrictStore::get_copy`]: crate::store::StrictStore::get_copy
    #[serde(default)]
    pub cache: bool,

    /// How long to wait between attempts to acquire the lock file of a record.
    ///
    /// The default value is 10 milliseconds.
    #[serde(default = "default_lock_poll_interval")]
    pub lock_poll_interval: Duration,

    /// How long a lock file may be waited on before it is assumed to be abandoned and removed.
    ///
    /// The default value is 6 seconds.
    #[serde(default = "default_stale_lock_timeout")]
    pub stale_lock_timeout: Duration,
}

fn default_lock_poll_interval() -> Duration {
    DEFAULT_LOCK_POLL_INTERVAL
}

fn default_stale_lock_timeout() -> Duration {
    DEFAULT_STALE_LOCK_TIMEOUT
}

impl StoreConfig {
    /// Create a config for a store in the directory at `path` with the default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: path.into(),
            cache: false,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
            stale_lock_timeout: DEFAULT_STALE_LOCK_TIMEOUT,
        }
    }

    /// Set whether values are cached in memory.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set the interval between attempts to acquire a lock file.
    pub fn lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Set the time after which a lock file is assumed to be abandoned.
    pub fn stale_lock_timeout(mut self, timeout: Duration) -> Self {
        self.stale_lock_timeout = timeout;
        self
    }
}
