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

use common::*;
use oid_store::store::{LockKey, PermissiveStore};

mod common;

#[rstest]
fn put_replaces_existing_record(
    permissive_store: TestStore<PermissiveStore<String>>,
) -> anyhow::Result<()> {
    assert_that!(permissive_store.put("a:1", "hello".into())).is_some();
    assert_that!(permissive_store.put("a:1", "world".into())).is_some();

    assert_that!(permissive_store.get_copy("a:1")).is_some().is_equal_to(String::from("world"));
    assert_that!(permissive_store.num_records()).is_equal_to(1);

    Ok(())
}

#[rstest]
fn failures_are_absent_results(permissive_store: TestStore<PermissiveStore<String>>) {
    assert_that!(permissive_store.get("missing")).is_none();
    assert_that!(permissive_store.get_copy("missing")).is_none();
    assert_that!(permissive_store.remove("missing")).is_none();
    assert_that!(permissive_store.delete("missing")).is_false();
    assert_that!(permissive_store.lock("missing")).is_none();
    assert_that!(permissive_store.last_modified("missing")).is_none();
    assert_that!(permissive_store.ids()).is_empty();
}

#[rstest]
fn put_on_locked_record_is_refused(
    permissive_store: TestStore<PermissiveStore<String>>,
) -> anyhow::Result<()> {
    permissive_store.put("oid", "original".into());
    let key = permissive_store.lock("oid");
    assert_that!(key).is_some();

    assert_that!(permissive_store.put("oid", "updated".into())).is_none();
    assert_that!(permissive_store.update("oid", "updated".into())).is_none();
    assert_that!(permissive_store.remove("oid")).is_none();
    assert_that!(permissive_store.delete("oid")).is_false();
    assert_that!(permissive_store.get_copy("oid")).is_some().is_equal_to(String::from("original"));

    Ok(())
}

#[rstest]
fn put_locked_keeps_lock(permissive_store: TestStore<PermissiveStore<String>>) -> anyhow::Result<()> {
    permissive_store.put("oid", "original".into());
    let key = permissive_store
        .lock("oid")
        .ok_or_else(|| anyhow::anyhow!("The record could not be locked."))?;

    assert_that!(permissive_store.put_locked("oid", "wrong".into(), &LockKey::from("bogus_key")))
        .is_none();
    assert_that!(permissive_store.put_locked("oid", "updated".into(), &key)).is_some();
    assert_that!(permissive_store.update_locked("oid", "again".into(), &key)).is_some();

    assert_that!(permissive_store.get_copy("oid")).is_some().is_equal_to(String::from("again"));
    assert_that!(permissive_store.is_valid_lock("oid", &key)).is_true();

    assert_that!(permissive_store.unlock("oid", &LockKey::from("bogus_key"))).is_false();
    assert_that!(permissive_store.unlock("oid", &key)).is_true();
    assert_that!(permissive_store.is_locked("oid")).is_false();

    Ok(())
}

#[rstest]
fn put_locked_creates_missing_record(permissive_store: TestStore<PermissiveStore<String>>) {
    assert_that!(permissive_store.put_locked("oid", "value".into(), &LockKey::from("1"))).is_some();
    assert_that!(permissive_store.oid_exists("oid")).is_true();
    assert_that!(permissive_store.is_locked("oid")).is_false();
}

#[rstest]
fn locked_removal_releases_lock(
    permissive_store: TestStore<PermissiveStore<String>>,
) -> anyhow::Result<()> {
    permissive_store.put("first", "1".into());
    permissive_store.put("second", "2".into());
    let first_key = permissive_store
        .lock("first")
        .ok_or_else(|| anyhow::anyhow!("The record could not be locked."))?;
    let second_key = permissive_store
        .lock("second")
        .ok_or_else(|| anyhow::anyhow!("The record could not be locked."))?;

    assert_that!(permissive_store.remove_locked("first", &second_key)).is_none();
    assert_that!(permissive_store.remove_locked("first", &first_key).map(|value| value.to_string()))
        .is_some()
        .is_equal_to(String::from("1"));
    assert_that!(permissive_store.delete_locked("second", &second_key)).is_true();

    assert_that!(permissive_store.is_locked("first")).is_false();
    assert_that!(permissive_store.is_locked("second")).is_false();
    assert_that!(permissive_store.num_records()).is_equal_to(0);

    Ok(())
}

#[rstest]
fn get_many_omits_missing_values(permissive_store: TestStore<PermissiveStore<String>>) {
    permissive_store.put("first", "1".into());
    permissive_store.put("third", "3".into());

    let values = permissive_store
        .get_many(&["first", "second", "third"])
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>();
    let copies = permissive_store.get_many_copies(&["first", "second", "third"]);

    assert_that!(values).is_equal_to(vec![String::from("1"), String::from("3")]);
    assert_that!(copies).is_equal_to(vec![String::from("1"), String::from("3")]);
}

#[rstest]
#[case::uncached(false)]
#[case::cached(true)]
fn listing_and_counting(#[case] cache: bool) {
    let store = new_permissive_store(cache);
    let mut oids = unique_oids(10);
    for oid in &oids {
        store.put(oid, "value".into());
    }
    oids.sort();

    assert_that!(store.ids_sorted()).is_equal_to(&oids);
    assert_that!(store.num_records()).is_equal_to(10);
    assert_that!(store.recount()).is_some().is_equal_to(10);
    assert_that!(store.last_modified(&oids[0])).is_some();
}

#[test]
fn unserializable_value_is_not_stored() -> anyhow::Result<()> {
    use serde::{Deserialize, Serialize, Serializer};

    #[derive(Debug, Deserialize)]
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("This value cannot be serialized."))
        }
    }

    let directory = tempfile::tempdir()?;
    let store = PermissiveStore::<Unserializable>::new(directory.path(), true)?;

    assert_that!(store.put("oid", Unserializable)).is_none();
    assert_that!(store.oid_exists("oid")).is_false();
    assert_that!(store.num_records()).is_equal_to(0);

    Ok(())
}
