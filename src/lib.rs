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

//! `oid-store` is a library for storing serializable values as individual files on disk.
//!
//! A store is a persistent, map-like collection which maps string object identifiers (OIDs) to
//! values. Each value is serialized to its own file in a directory, with a file name derived from
//! its OID. Values can optionally be kept in an in-memory cache for faster retrieval.
//!
//! Stores are safe to use from multiple threads and from multiple processes which share the same
//! directory:
//! - Within a process, every operation on a store instance is serialized by a mutex.
//! - Between processes, each read or write of a record is protected by a lock file.
//!
//! Callers can also lock a record to reserve it for exclusive modification. These locks are held
//! in memory and are only visible to callers of the same store instance.
//!
//! This library provides two stores:
//! - `StrictStore` reports every anomaly as a distinct `Error` variant.
//! - `PermissiveStore` reports failures as `None` or `false` and replaces existing records on
//! `put`.
//!
//! # Examples
//! ```
//! use oid_store::store::StrictStore;
//! use tempfile::tempdir;
//!
//! fn main() -> anyhow::Result<()> {
//!     let directory = tempdir()?;
//!     let store = StrictStore::<String>::new(directory.path(), false)?;
//!
//!     store.put("a:1", String::from("hello"))?;
//!     assert_eq!(*store.get("a:1")?, "hello");
//!
//!     // Lock the record to reserve it for modification.
//!     let key = store.lock("a:1")?;
//!     store.update_locked("a:1", String::from("world"), &key)?;
//!     assert_eq!(store.remove_locked("a:1", &key)?.as_str(), "world");
//!
//!     assert!(!store.oid_exists("a:1"));
//!     Ok(())
//! }
//! ```

pub use error::{Error, Result};

mod error;
pub mod store;
