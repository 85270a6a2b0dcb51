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

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Characters used to build random OIDs, including ones which must be escaped in file names.
const OID_CHARACTERS: &[char] = &[
    'a', 'b', 'c', 'x', 'y', 'z', 'A', 'B', 'Z', '0', '1', '9', '-', '_', '.', ':', '/', '\\',
    '*', '?', '"', '<', '>', '|', '\'', ';', ',', '^', '(', ')', '$', '~', ' ', '%', '\u{e9}',
    '\u{3b1}',
];

/// Return a random OID of `len` characters.
pub fn random_oid(len: usize) -> String {
    let mut rng = SmallRng::from_entropy();
    (0..len)
        .map(|_| *OID_CHARACTERS.choose(&mut rng).unwrap_or(&'a'))
        .collect()
}

/// Return `count` distinct random OIDs.
pub fn unique_oids(count: usize) -> Vec<String> {
    let mut rng = SmallRng::from_entropy();
    let mut oids = Vec::with_capacity(count);

    while oids.len() < count {
        let oid = random_oid(rng.gen_range(4..16));
        if !oids.contains(&oid) {
            oids.push(oid);
        }
    }

    oids
}
