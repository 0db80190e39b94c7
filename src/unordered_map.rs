/*!
The unordered map engine (component C6): decodes a CBOR map whose key
order is not fixed by the schema, matching each entry against a known
set of schema key patterns regardless of the order they appear in on
the wire, rejecting duplicate keys, entries the schema never claims,
and (once every schema key pattern has had its turn) any required key
that never turned up.

Grounded on the map-decode path in
`examples/original_source/src/zcbor_decode.c` and the exact
duplicate-key / unmatched-entry behaviors exercised by
`examples/original_source/tests/decode/testA_unordered_map`.

A schema key pattern may need to scan every still-unmatched entry
before it finds (or fails to find) its match, and a group repetition
(`min..max` copies of a sub-structure) needs to run that scan `min..max`
times. A single forward pass over the map can't do this: once an entry
has been read past, a straightforward iterator has lost it. So
[`MapEngine::open`] takes one pass over the map up front and records
each entry's `[key, value]` byte span without interpreting it (the
"one-pass index of the map" approach of spec.md §4.6 point 2), then
every subsequent `match_*` call rescans the as-yet-unclaimed spans
through a fresh, span-scoped sub-cursor, the same sub-cursor-over-a-
bounded-slice technique `Cursor::decode_bstr_cbor` already uses to keep
an embedded decode from reading past its wrapper. Rescanning through a
fresh cursor per entry means a key match that turns out to fail partway
through its value (the "half-succeeds, must roll back and leave the
bit clear" case) can't leave any trace on the original cursor or on
the entry's claimed bit: the sub-cursor it ran against is simply
discarded.
*/
use crate::cursor::Cursor;
use crate::error::Error;

/// A CBOR map opened for unordered, schema-key-driven matching.
///
/// `N` bounds how many entries a single call site can index, the same
/// caller-sized, no-heap-allocation discipline `Cursor<'a, BACKUPS>`
/// uses for its own backup stack.
pub struct MapEngine<'a, const B: usize, const N: usize> {
    data: &'a [u8],
    spans: [(usize, usize); N],
    count: usize,
    claimed: [bool; N],
}

impl<'a, const B: usize, const N: usize> MapEngine<'a, B, N> {
    /// Opens `cursor`'s next value as a map (definite- or
    /// indefinite-length) and indexes its entries without interpreting
    /// them. `max_recursion` bounds how deeply [`Cursor::skip_any`] may
    /// recurse while skipping over each key and value during indexing.
    pub fn open(cursor: &mut Cursor<'a, B>, max_recursion: usize) -> Result<Self, Error> {
        let data = cursor.backing_data();
        cursor.start_map()?;
        let mut spans = [(0usize, 0usize); N];
        let mut count = 0usize;
        while cursor.has_more()? {
            if count >= N {
                return Err(Error::TooBig);
            }
            let start = cursor.position();
            cursor.skip_any(max_recursion)?; // key
            cursor.skip_any(max_recursion)?; // value
            spans[count] = (start, cursor.position());
            count += 1;
        }
        cursor.end_map()?;
        Ok(MapEngine {
            data,
            spans,
            count,
            claimed: [false; N],
        })
    }

    /// Scans every not-yet-claimed entry for one whose key satisfies
    /// `key` and whose value then decodes via `value`, claiming and
    /// stopping at the first full match. An entry whose key doesn't
    /// satisfy `key` is left untouched, available to a later schema key
    /// pattern or a later call from the same group repetition.
    ///
    /// `key` should report "this entry's key is structurally valid but
    /// isn't the one I'm looking for" as `Ok(false)`, reserving `Err`
    /// for a key that's genuinely malformed; that distinction is what
    /// lets the scan keep looking at the remaining entries instead of
    /// aborting the whole map on the first near-miss.
    pub fn match_one(
        &mut self,
        mut key: impl FnMut(&mut Cursor<'a, B>) -> Result<bool, Error>,
        mut value: impl FnMut(&mut Cursor<'a, B>) -> Result<(), Error>,
    ) -> Result<bool, Error> {
        for i in 0..self.count {
            if self.claimed[i] {
                continue;
            }
            let (start, end) = self.spans[i];
            let mut entry = Cursor::<B>::new(&self.data[start..end]);
            if !key(&mut entry)? {
                continue;
            }
            value(&mut entry)?;
            self.claimed[i] = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Like [`MapEngine::match_one`], but fails with
    /// [`Error::MissingRequiredKey`] if no unclaimed entry matches,
    /// the required, non-repeating schema key case.
    pub fn match_required(
        &mut self,
        key: impl FnMut(&mut Cursor<'a, B>) -> Result<bool, Error>,
        value: impl FnMut(&mut Cursor<'a, B>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if self.match_one(key, value)? {
            Ok(())
        } else {
            Err(Error::MissingRequiredKey)
        }
    }

    /// Like [`MapEngine::match_required`], but additionally fails with
    /// [`Error::DuplicateKey`] if a second, still-unclaimed entry also
    /// satisfies `key` after the first has been claimed, the schema's
    /// "this key must be unique" case of spec.md §4.6.
    pub fn match_required_unique(
        &mut self,
        mut key: impl FnMut(&mut Cursor<'a, B>) -> Result<bool, Error>,
        value: impl FnMut(&mut Cursor<'a, B>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.match_required(&mut key, value)?;
        for i in 0..self.count {
            if self.claimed[i] {
                continue;
            }
            let (start, end) = self.spans[i];
            let mut entry = Cursor::<B>::new(&self.data[start..end]);
            if key(&mut entry)? {
                return Err(Error::DuplicateKey);
            }
        }
        Ok(())
    }

    /// Matches between `min` and `max` occurrences of a group
    /// repetition (a sub-structure's key/value pattern repeated within
    /// the map), scanning the unmatched entries for each occurrence in
    /// turn. Mirrors [`crate::decode::multi_decode`]'s min/max rollback
    /// contract, adapted to a search over unordered entries rather than
    /// a sequential container (which `multi_decode` has no way to drive
    /// here, since the next occurrence's entry may be anywhere among
    /// the still-unclaimed spans). Grounded on spec.md §4.6 point 3.
    pub fn match_group(
        &mut self,
        min: usize,
        max: usize,
        mut key: impl FnMut(&mut Cursor<'a, B>) -> Result<bool, Error>,
        mut value: impl FnMut(&mut Cursor<'a, B>) -> Result<(), Error>,
    ) -> Result<usize, Error> {
        let mut n = 0;
        while n < max {
            if !self.match_one(&mut key, &mut value)? {
                break;
            }
            n += 1;
        }
        if n < min {
            return Err(Error::MissingRequiredKey);
        }
        Ok(n)
    }

    /// Closes the map: every indexed entry must have been claimed by
    /// some schema key pattern, or [`Error::ElementsNotProcessed`] is
    /// raised (spec.md §4.6 point 4: an entry the schema never
    /// recognized at all).
    pub fn finish(self) -> Result<(), Error> {
        if self.claimed[..self.count].iter().any(|c| !c) {
            return Err(Error::ElementsNotProcessed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::FromCbor;
    use hex_literal::hex;

    // Schema: {"a": uint (required, index 0), "b": uint (optional, index 1)}
    fn key_a<'a, const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<bool, Error> {
        Ok(cursor.decode_tstr()?.0 == "a")
    }
    fn key_b<'a, const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<bool, Error> {
        Ok(cursor.decode_tstr()?.0 == "b")
    }

    #[test]
    fn accepts_keys_in_either_order() {
        // {"b": 2, "a": 1}
        let bytes = hex!("a2" "6162" "02" "6161" "01");
        let mut cursor = Cursor::<2>::new(&bytes);
        let mut engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();

        let mut a = None;
        engine
            .match_required(key_a, |c| {
                a = Some(u64::decode(c)?);
                Ok(())
            })
            .unwrap();

        let mut b = None;
        engine
            .match_one(key_b, |c| {
                b = Some(u64::decode(c)?);
                Ok(())
            })
            .unwrap();

        engine.finish().unwrap();
        assert_eq!(a, Some(1));
        assert_eq!(b, Some(2));
    }

    #[test]
    fn rejects_duplicate_key() {
        // {"a": 1, "a": 2} -- schema marks "a" as required-unique.
        let bytes = hex!("a2" "6161" "01" "6161" "02");
        let mut cursor = Cursor::<2>::new(&bytes);
        let mut engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();
        let res = engine.match_required_unique(key_a, |c| u64::decode(c).map(|_| ()));
        assert!(matches!(res, Err(Error::DuplicateKey)));
    }

    #[test]
    fn rejects_unmatched_entry() {
        // {"c": 1} -- "c" is not in the schema, so nothing ever claims it.
        let bytes = hex!("a1" "6163" "01");
        let mut cursor = Cursor::<2>::new(&bytes);
        let engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();
        // No key pattern ever runs against "c"; it's left unclaimed.
        let res = engine.finish();
        assert!(matches!(res, Err(Error::ElementsNotProcessed)));
    }

    #[test]
    fn optional_field_absent_from_map() {
        // Schema `{byte: uint, ? opt: uint}`; input `{"byte": 42}` -- the
        // optional key never appears.
        let bytes = hex!("a1" "6462797465" "182a");
        fn key_byte<'a, const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<bool, Error> {
            Ok(cursor.decode_tstr()?.0 == "byte")
        }
        fn key_opt<'a, const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<bool, Error> {
            Ok(cursor.decode_tstr()?.0 == "opt")
        }

        let mut cursor = Cursor::<2>::new(&bytes);
        let mut engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();

        let mut byte = None;
        engine
            .match_required(key_byte, |c| {
                byte = Some(u64::decode(c)?);
                Ok(())
            })
            .unwrap();

        let mut opt = None;
        let found = engine
            .match_one(key_opt, |c| {
                opt = Some(u64::decode(c)?);
                Ok(())
            })
            .unwrap();

        engine.finish().unwrap();
        assert_eq!(byte, Some(42));
        assert!(!found, "optional key must report as absent");
        assert_eq!(opt, None);
    }

    #[test]
    fn rejects_missing_required_key() {
        // {"b": 2} -- required key "a" never appears.
        let bytes = hex!("a1" "6162" "02");
        let mut cursor = Cursor::<2>::new(&bytes);
        let mut engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();
        let res = engine.match_required(key_a, |c| u64::decode(c).map(|_| ()));
        assert!(matches!(res, Err(Error::MissingRequiredKey)));
    }

    #[test]
    fn rejects_value_decode_failure_without_claiming_key() {
        // {"a": "not a uint"} -- the key matches, but the value doesn't
        // decode as the schema expects; the entry must stay unclaimed
        // (and so get reported as unmatched) rather than silently
        // absorbing a half-decoded pair.
        let bytes = hex!("a1" "6161" "6161");
        let mut cursor = Cursor::<2>::new(&bytes);
        let mut engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();
        let res = engine.match_one(key_a, |c| u64::decode(c).map(|_| ()));
        assert!(res.is_err());
        // The failed attempt must not have left the entry claimed.
        assert!(matches!(engine.finish(), Err(Error::ElementsNotProcessed)));
    }

    #[test]
    fn match_group_collects_repeated_entries_regardless_of_order() {
        // {"tag": 3, "x": 1, "y": 2} -- "x"/"y" belong to a 2-occurrence
        // group repetition that can appear in either order relative to
        // the required "tag" key.
        let bytes = hex!(
            "a3"
            "63746167" "03"
            "6178" "01"
            "6179" "02"
        );
        fn key_tag<'a, const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<bool, Error> {
            Ok(cursor.decode_tstr()?.0 == "tag")
        }
        fn key_xy<'a, const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<bool, Error> {
            Ok(matches!(cursor.decode_tstr()?.0, "x" | "y"))
        }

        let mut cursor = Cursor::<2>::new(&bytes);
        let mut engine = MapEngine::<2, 4>::open(&mut cursor, 8).unwrap();

        let mut tag = None;
        engine
            .match_required(key_tag, |c| {
                tag = Some(u64::decode(c)?);
                Ok(())
            })
            .unwrap();

        let mut values = alloc::vec::Vec::new();
        let n = engine
            .match_group(2, 2, key_xy, |c| {
                values.push(u64::decode(c)?);
                Ok(())
            })
            .unwrap();

        engine.finish().unwrap();
        assert_eq!(tag, Some(3));
        assert_eq!(n, 2);
        values.sort_unstable();
        assert_eq!(values, alloc::vec![1, 2]);
    }
}
