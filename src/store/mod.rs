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

//! Persistent stores which keep each record in its own file.
//!
//! A store maps string OIDs to values of a serializable type. There are two stores which share
//! the same implementation:
//! - [`StrictStore`] reports every anomaly as a distinct [`Error`] variant.
//! - [`PermissiveStore`] reports every failure as an absent result.
//!
//! Both are opened from a [`StoreConfig`].
//!
//! [`StrictStore`]: crate::store::StrictStore
//! [`PermissiveStore`]: crate::store::PermissiveStore
//! [`StoreConfig`]: crate::store::StoreConfig
//! [`Error`]: crate::Error

use static_assertions::assert_impl_all;

pub use self::config::{StoreConfig, DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_STALE_LOCK_TIMEOUT};
pub use self::engine::Payload;
pub use self::file_lock::{FileLock, FileLocks, LOCK_SUFFIX};
pub use self::lock_table::{LockKey, LockTable};
pub use self::permissive::PermissiveStore;
pub use self::strict::StrictStore;

pub mod codec;
mod config;
mod engine;
mod file_lock;
mod lock_table;
mod permissive;
mod strict;

assert_impl_all!(StrictStore<String>: Send, Sync);
assert_impl_all!(PermissiveStore<String>: Send, Sync);
