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
use std::result;

use thiserror::Error as DeriveError;

/// The error type for operations with a store.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// There is no record for the given OID.
    #[error("There is no record for the OID '{0}'.")]
    NotFound(String),

    /// A record for the given OID already exists.
    #[error("A record for the OID '{0}' already exists.")]
    AlreadyExists(String),

    /// The value could not be serialized.
    #[error("The value for the OID '{oid}' could not be serialized.")]
    UnsupportedPayload {
        oid: String,
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// The provided lock key does not match the lock held on the record.
    #[error("The lock key provided for the OID '{0}' is not valid.")]
    InvalidLock(String),

    /// The record is locked by another caller.
    #[error("The OID '{0}' is locked.")]
    LockUnavailable(String),

    /// The store directory does not exist.
    #[error("The directory '{}' does not exist.", .0.display())]
    NotDirectory(PathBuf),

    /// A record could not be read, written or deserialized.
    #[error("{0:#}")]
    Storage(#[from] anyhow::Error),
}

/// The result type for operations with a store.
pub type Result<T> = result::Result<T, Error>;
