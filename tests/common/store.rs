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

use std::ops::Deref;
use std::path::Path;

use rstest::*;
use tempfile::{tempdir, TempDir};

use oid_store::store::{PermissiveStore, StoreConfig, StrictStore};

/// A store in a temporary directory which is removed when this value is dropped.
#[derive(Debug)]
pub struct TestStore<S> {
    store: S,
    directory: TempDir,
}

impl<S> TestStore<S> {
    pub fn path(&self) -> &Path {
        self.directory.path()
    }
}

impl<S> Deref for TestStore<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Return a `StrictStore` in a new temporary directory.
pub fn new_strict_store(cache: bool) -> TestStore<StrictStore<String>> {
    let directory = tempdir().unwrap();
    let store = StrictStore::open(&StoreConfig::new(directory.path()).cache(cache)).unwrap();
    TestStore { store, directory }
}

/// Return a `PermissiveStore` in a new temporary directory.
pub fn new_permissive_store(cache: bool) -> TestStore<PermissiveStore<String>> {
    let directory = tempdir().unwrap();
    let store = PermissiveStore::open(&StoreConfig::new(directory.path()).cache(cache)).unwrap();
    TestStore { store, directory }
}

#[fixture]
pub fn strict_store() -> TestStore<StrictStore<String>> {
    new_strict_store(false)
}

#[fixture]
pub fn cached_store() -> TestStore<StrictStore<String>> {
    new_strict_store(true)
}

#[fixture]
pub fn permissive_store() -> TestStore<PermissiveStore<String>> {
    new_permissive_store(false)
}
