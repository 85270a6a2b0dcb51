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

//! A reversible mapping between OIDs and file names.
//!
//! ASCII letters, digits and `-` are copied through. Any other character with a code point up to
//! `0xff` is written as `_` followed by two lowercase hex digits. Wider characters are written as
//! `__` followed by six lowercase hex digits. Because `_` is itself always escaped, an encoded
//! name can be decoded unambiguously.

use std::fmt::Write;

/// The character which introduces an escape sequence.
const ESCAPE: char = '_';

/// The number of hex digits in a narrow escape.
const NARROW_DIGITS: usize = 2;

/// The number of hex digits in a wide escape.
const WIDE_DIGITS: usize = 6;

/// Return whether `c` is copied through unescaped.
fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Encode `oid` into a name which is safe to use as a file name.
pub fn encode(oid: &str) -> String {
    let mut encoded = String::with_capacity(oid.len() * 3);

    for c in oid.chars() {
        if is_plain(c) {
            encoded.push(c);
        } else if (c as u32) <= 0xff {
            // Writing to a `String` cannot fail.
            let _ = write!(encoded, "{}{:02x}", ESCAPE, c as u32);
        } else {
            let _ = write!(encoded, "{}{}{:06x}", ESCAPE, ESCAPE, c as u32);
        }
    }

    encoded
}

/// Parse exactly `digits` hex digits from the start of `chars`.
fn parse_hex(chars: &[char], digits: usize) -> Option<u32> {
    if chars.len() < digits {
        return None;
    }

    chars[..digits].iter().try_fold(0u32, |value, c| {
        c.to_digit(16)
            .filter(|_| !c.is_ascii_uppercase())
            .map(|digit| value * 16 + digit)
    })
}

/// Decode the escape sequence at the start of `chars`.
///
/// This returns the decoded character and the number of characters consumed, or `None` if
/// `chars` does not start with a sequence that `encode` could have produced.
fn decode_escape(chars: &[char]) -> Option<(char, usize)> {
    match chars {
        [ESCAPE, ESCAPE, rest @ ..] => {
            let code = parse_hex(rest, WIDE_DIGITS)?;
            let c = char::from_u32(code).filter(|&c| (c as u32) > 0xff)?;
            Some((c, 2 + WIDE_DIGITS))
        }
        [ESCAPE, rest @ ..] => {
            let code = parse_hex(rest, NARROW_DIGITS)?;
            let c = char::from_u32(code).filter(|&c| !is_plain(c))?;
            Some((c, 1 + NARROW_DIGITS))
        }
        _ => None,
    }
}

/// Decode a file name produced by `encode` back into the original OID.
///
/// Characters which are not part of a valid escape sequence are copied through unchanged.
pub fn decode(name: &str) -> String {
    let chars = name.chars().collect::<Vec<_>>();
    let mut decoded = String::with_capacity(name.len());
    let mut position = 0;

    while position < chars.len() {
        match decode_escape(&chars[position..]) {
            Some((c, consumed)) => {
                decoded.push(c);
                position += consumed;
            }
            None => {
                decoded.push(chars[position]);
                position += 1;
            }
        }
    }

    decoded
}

/// Return whether `name` could have been produced by `encode`.
///
/// Names of lock files and temporary files contain a `.`, which `encode` never emits.
pub fn is_encoded(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| is_plain(c) || c == ESCAPE)
}
