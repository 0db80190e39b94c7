/*!
Typed decode primitives (component C1) and the schema-level combinators
(component C5) that drive a [`Cursor`].

Usage mirrors the teacher crate's `FromCbor` trait, but every
implementation now operates against a stateful [`Cursor`] instead of a
one-shot byte slice, so that a schema-surface struct can decode its
fields one at a time, in order, sharing one cursor and one backup stack
across the whole top-level value.

```
use cbor_rt::cursor::Cursor;
use cbor_rt::decode::FromCbor;

let bytes = &[0x82, 0x0A, 0x33]; // [10, -20]
let mut cursor = Cursor::<4>::new(bytes);
let count = cursor.start_list().unwrap();
assert_eq!(count, Some(2));
let x = i32::decode(&mut cursor).unwrap();
let y = i32::decode(&mut cursor).unwrap();
cursor.end_list().unwrap();
assert_eq!((x, y), (10, -20));
```
*/
use crate::cursor::Cursor;
use crate::error::Error;

/// A trait for types that can be decoded from the current position of a
/// [`Cursor`].
///
/// Implementations must consume exactly one schema-level item (a single
/// element slot if inside a container) and leave the cursor positioned
/// immediately after it.
pub trait FromCbor: Sized {
    /// Decodes one value, advancing `cursor` past it.
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error>;
}

macro_rules! impl_uint_from_cbor {
    ($($ty:ty),*) => {
        $(
            impl FromCbor for $ty {
                fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
                    let (v, _shortest) = cursor.decode_uint()?;
                    Ok(v.try_into()?)
                }
            }
        )*
    };
}

impl_uint_from_cbor!(u8, u16, u32, usize);

impl FromCbor for u64 {
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        Ok(cursor.decode_uint()?.0)
    }
}

macro_rules! impl_int_from_cbor {
    ($($ty:ty),*) => {
        $(
            impl FromCbor for $ty {
                fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
                    let (v, _shortest) = cursor.decode_int()?;
                    Ok(v.try_into()?)
                }
            }
        )*
    };
}

impl_int_from_cbor!(i8, i16, i32, isize);

impl FromCbor for i64 {
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        Ok(cursor.decode_int()?.0)
    }
}

impl FromCbor for bool {
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        cursor.decode_bool()
    }
}

impl FromCbor for f64 {
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        Ok(cursor.decode_float()?.0)
    }
}

impl FromCbor for f32 {
    /// Narrows the decoded `f64` to `f32`, failing with
    /// [`Error::PrecisionLoss`] if that narrowing isn't exact, the
    /// float-width counterpart of the integer impls' `try_into()?`
    /// above, rather than a silent `as` cast.
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        let (v, _shortest) = cursor.decode_float()?;
        if crate::cursor::is_representable_as_f32(v) {
            Ok(v as f32)
        } else {
            Err(Error::PrecisionLoss)
        }
    }
}

impl FromCbor for alloc::string::String {
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        let (s, _shortest) = cursor.decode_tstr()?;
        Ok(s.into())
    }
}

impl<T> FromCbor for Option<T>
where
    T: FromCbor,
{
    /// Decodes `undefined` as `None`, anything else as `Some` by decoding
    /// `T` without consuming the probed byte twice: the probe only peeks
    /// far enough to distinguish `undefined` from everything else.
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        let is_undefined = cursor
            .probe(|c| c.decode_undefined())
            .is_ok();
        if is_undefined {
            Ok(None)
        } else {
            T::decode(cursor).map(Some)
        }
    }
}

// ---------------------------------------------------------------------
// C5: schema-level combinators -- repetition, optional presence, union.
// ---------------------------------------------------------------------

/// Decodes between `min` and `max` (inclusive) repetitions of `T` from
/// the current container, stopping as soon as either `max` items have
/// been read or the next item fails to decode as `T` (which is treated
/// as "the repetition is over", not a hard error, as long as at least
/// `min` items were read).
///
/// Grounded on zcbor's `zcbor_multi_decode`, which rolls back the
/// cursor on the failing attempt and returns success if the minimum was
/// already satisfied.
pub fn multi_decode<T, const B: usize>(
    cursor: &mut Cursor<B>,
    min: usize,
    max: usize,
) -> Result<alloc::vec::Vec<T>, Error>
where
    T: FromCbor,
{
    let mut out = alloc::vec::Vec::new();
    while out.len() < max {
        match cursor.probe(|c| T::decode(c)) {
            Ok(v) => out.push(v),
            Err(e) => {
                if out.len() >= min {
                    break;
                }
                return Err(e);
            }
        }
    }
    Ok(out)
}

/// Like [`multi_decode`], but for element types that can't implement
/// [`FromCbor`], most notably a borrowed `&'a str`/`&'a [u8]`, whose
/// lifetime ties it to the cursor's own backing buffer in a way the
/// trait's elided-lifetime `decode` signature can't express. Takes an
/// explicit per-element decode closure instead of requiring `T: FromCbor`.
pub fn multi_decode_with<'a, T, const B: usize>(
    cursor: &mut Cursor<'a, B>,
    min: usize,
    max: usize,
    mut decode_one: impl FnMut(&mut Cursor<'a, B>) -> Result<T, Error>,
) -> Result<alloc::vec::Vec<T>, Error> {
    let mut out = alloc::vec::Vec::new();
    while out.len() < max {
        match cursor.probe(|c| decode_one(c)) {
            Ok(v) => out.push(v),
            Err(e) => {
                if out.len() >= min {
                    break;
                }
                return Err(e);
            }
        }
    }
    Ok(out)
}

/// Decodes an optional field: if `T` fails to decode at the current
/// position the cursor is rolled back and `None` is returned instead of
/// propagating the error.
///
/// Grounded on zcbor's `zcbor_present_decode`.
pub fn present_decode<T, const B: usize>(cursor: &mut Cursor<B>) -> Result<Option<T>, Error>
where
    T: FromCbor,
{
    match cursor.probe(|c| T::decode(c)) {
        Ok(v) => Ok(Some(v)),
        Err(_) => Ok(None),
    }
}

/// Tries each decode closure in `alternatives` in order against a backed-up
/// cursor position, returning the first one that succeeds.
///
/// This is how a schema-surface `Union`/choice type should be decoded:
/// build one closure per alternative (each calling through to that
/// alternative's own `FromCbor`/field decode sequence) and pass them
/// here. Grounded on zcbor's `zcbor_union_start_code`/`_elem_code`, which
/// probes each arm against a single shared backup point.
pub fn union_decode<T, const B: usize>(
    cursor: &mut Cursor<B>,
    alternatives: &mut [&mut dyn FnMut(&mut Cursor<B>) -> Result<T, Error>],
) -> Result<T, Error> {
    let mut last_err = None;
    for alt in alternatives.iter_mut() {
        match cursor.probe(|c| alt(c)) {
            Ok(v) => return Ok(v),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or(Error::NoMoreItems))
}

/// Decodes a value preceded by an expected CBOR tag, verifying the tag
/// matches and is the only tag present.
pub fn tagged_decode<T, const B: usize>(cursor: &mut Cursor<B>, tag: u64) -> Result<T, Error>
where
    T: FromCbor,
{
    let mut tags = [0u64; 1];
    let n = cursor.decode_tags(&mut tags)?;
    if n != 1 || tags[0] != tag {
        return Err(Error::WrongValue(alloc::format!(
            "expected tag {tag}, found {n} tag(s)"
        )));
    }
    T::decode(cursor)
}

/// Decodes `T` embedded as a CBOR data item inside a byte string,
/// optionally tagged 24 (`zcbor_tag::CBOR_DATA_ITEM`) to mark it as
/// such. Fails with [`crate::error::Error::NotAtEnd`] if `T::decode`
/// doesn't consume every byte of the wrapper.
pub fn embedded_cbor_decode<T, const B: usize>(cursor: &mut Cursor<B>) -> Result<T, Error>
where
    T: FromCbor,
{
    cursor.decode_bstr_cbor(|inner| T::decode(inner))
}

/// Decodes then compares against a literal constant, rolling back and
/// failing with [`Error::WrongValue`] on a mismatch. The schema-surface
/// equivalent of zcbor's `expect` decoders, used for constants named
/// directly in a CDDL grammar (e.g. a fixed map key, a required literal
/// field).
pub fn expect_decode<T, const B: usize>(cursor: &mut Cursor<B>, expected: &T) -> Result<(), Error>
where
    T: FromCbor + PartialEq + core::fmt::Debug,
{
    cursor.probe(|c| {
        let actual = T::decode(c)?;
        if &actual != expected {
            return Err(Error::WrongValue(alloc::format!(
                "expected {expected:?}, found {actual:?}"
            )));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn rfc_unsigned_integers() {
        let cases: &[(&[u8], u64)] = &[
            (&hex!("00"), 0),
            (&hex!("01"), 1),
            (&hex!("0a"), 10),
            (&hex!("17"), 23),
            (&hex!("1818"), 24),
            (&hex!("1819"), 25),
            (&hex!("1864"), 100),
            (&hex!("1903e8"), 1000),
            (&hex!("1a000f4240"), 1_000_000),
            (&hex!("1b000000e8d4a51000"), 1_000_000_000_000),
            (&hex!("1bffffffffffffffff"), u64::MAX),
        ];
        for (bytes, expected) in cases {
            let mut cursor = Cursor::<0>::new(bytes);
            assert_eq!(u64::decode(&mut cursor).unwrap(), *expected);
            assert!(cursor.is_exhausted());
        }
    }

    #[test]
    fn rfc_negative_integers() {
        let cases: &[(&[u8], i64)] = &[
            (&hex!("20"), -1),
            (&hex!("29"), -10),
            (&hex!("3863"), -100),
            (&hex!("3903e7"), -1000),
        ];
        for (bytes, expected) in cases {
            let mut cursor = Cursor::<0>::new(bytes);
            assert_eq!(i64::decode(&mut cursor).unwrap(), *expected);
        }
    }

    #[test]
    fn rfc_simple_values() {
        let mut cursor = Cursor::<0>::new(&hex!("f4"));
        assert!(!bool::decode(&mut cursor).unwrap());

        let mut cursor = Cursor::<0>::new(&hex!("f5"));
        assert!(bool::decode(&mut cursor).unwrap());

        let mut cursor = Cursor::<0>::new(&hex!("f6"));
        assert_eq!(Option::<u64>::decode(&mut cursor).unwrap(), None);
    }

    #[test]
    fn rfc_floats() {
        let mut cursor = Cursor::<0>::new(&hex!("f90000"));
        assert_eq!(f64::decode(&mut cursor).unwrap(), 0.0);

        let mut cursor = Cursor::<0>::new(&hex!("fb3ff199999999999a"));
        assert_eq!(f64::decode(&mut cursor).unwrap(), 1.1);

        let mut cursor = Cursor::<0>::new(&hex!("f97e00"));
        assert!(f64::decode(&mut cursor).unwrap().is_nan());
    }

    #[test]
    fn f32_rejects_precision_loss() {
        // fb 3ff199999999999a -- the f64 1.1, which has no exact f32 value.
        let mut cursor = Cursor::<0>::new(&hex!("fb3ff199999999999a"));
        assert!(matches!(f32::decode(&mut cursor), Err(Error::PrecisionLoss)));

        // f90000 -- 0.0, representable exactly at every width.
        let mut cursor = Cursor::<0>::new(&hex!("f90000"));
        assert_eq!(f32::decode(&mut cursor).unwrap(), 0.0);

        // fa3f800000 -- 1.0 as a 4-byte IEEE single, round-trips exactly.
        let mut cursor = Cursor::<0>::new(&hex!("fa3f800000"));
        assert_eq!(f32::decode(&mut cursor).unwrap(), 1.0);
    }

    #[test]
    fn f32_accepts_nan_and_infinity() {
        // f97e00 -- the canonical half-precision NaN. A NaN never equals
        // itself, so the narrowing check must special-case it rather
        // than reject it as a precision loss.
        let mut cursor = Cursor::<0>::new(&hex!("f97e00"));
        assert!(f32::decode(&mut cursor).unwrap().is_nan());

        // f97c00 -- positive infinity.
        let mut cursor = Cursor::<0>::new(&hex!("f97c00"));
        assert_eq!(f32::decode(&mut cursor).unwrap(), f32::INFINITY);
    }

    #[test]
    fn tag_does_not_consume_element() {
        // [24(h'0102')] -- a one-element array containing a tagged bstr.
        let bytes = hex!("81d818420102");
        let mut cursor = Cursor::<2>::new(&bytes);
        let count = cursor.start_list().unwrap();
        assert_eq!(count, Some(1));
        let decoded: &[u8] = {
            let mut tags = [0u64; 1];
            let n = cursor.decode_tags(&mut tags).unwrap();
            assert_eq!(n, 1);
            assert_eq!(tags[0], crate::common::tag::CBOR_DATA_ITEM);
            cursor.decode_bstr().unwrap().0
        };
        assert_eq!(decoded, &[0x01, 0x02]);
        cursor.end_list().unwrap();
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn indefinite_length_list_of_lists() {
        // 9F 9F 01 FF 9F 02 03 FF FF
        let bytes = hex!("9f9f01ff9f0203ffff");
        let mut cursor = Cursor::<4>::new(&bytes);
        assert_eq!(cursor.start_list().unwrap(), None);

        assert_eq!(cursor.start_list().unwrap(), None);
        assert_eq!(u64::decode(&mut cursor).unwrap(), 1);
        cursor.end_list().unwrap();

        assert_eq!(cursor.start_list().unwrap(), None);
        assert_eq!(u64::decode(&mut cursor).unwrap(), 2);
        assert_eq!(u64::decode(&mut cursor).unwrap(), 3);
        cursor.end_list().unwrap();

        cursor.end_list().unwrap();
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn truncated_input_fails_cleanly() {
        // A 4-byte-length bstr header promising 4 bytes but only 2 are present.
        let bytes = hex!("440102");
        let mut cursor = Cursor::<0>::new(&bytes);
        assert!(matches!(
            cursor.decode_bstr(),
            Err(Error::NeedMoreData(_))
        ));
    }

    #[test]
    fn multi_decode_respects_bounds() {
        // ["a", "b"] as a sequence of tstrs at the top level (no enclosing array)
        let bytes = hex!("6161" "6162");
        let mut cursor = Cursor::<2>::new(&bytes);
        let items = multi_decode::<alloc::string::String, 2>(&mut cursor, 1, 3).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], "a");
        assert_eq!(items[1], "b");
    }

    #[test]
    fn multi_decode_with_supports_borrowed_elements() {
        // ["a", "b"] as a sequence of borrowed tstrs, bounded 1..3.
        let bytes = hex!("6161" "6162");
        let mut cursor = Cursor::<2>::new(&bytes);
        let items = multi_decode_with(&mut cursor, 1, 3, |c| Ok(c.decode_tstr()?.0)).unwrap();
        assert_eq!(items, alloc::vec!["a", "b"]);
    }

    #[test]
    fn embedded_cbor_decodes_through_wrapping_bstr() {
        // 24(h'01') -- tag 24 wrapping the CBOR encoding of 1.
        let bytes = hex!("d818" "41" "01");
        let mut cursor = Cursor::<4>::new(&bytes);
        let mut tags = [0u64; 1];
        let n = cursor.decode_tags(&mut tags).unwrap();
        assert_eq!(n, 1);
        assert_eq!(tags[0], crate::common::tag::CBOR_DATA_ITEM);
        let v: u64 = embedded_cbor_decode(&mut cursor).unwrap();
        assert_eq!(v, 1);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn union_tries_alternatives_in_order() {
        // Schema: A = 1, B = 3..23, C = tstr.
        #[derive(Debug, PartialEq)]
        enum Choice {
            A,
            B(u64),
            C(alloc::string::String),
        }
        fn decode_choice<const B: usize>(cursor: &mut Cursor<B>) -> Result<Choice, Error> {
            union_decode(
                cursor,
                &mut [
                    &mut |c: &mut Cursor<B>| {
                        expect_decode(c, &1u64)?;
                        Ok(Choice::A)
                    },
                    &mut |c: &mut Cursor<B>| {
                        let (v, _) = c.decode_uint()?;
                        if (3..=23).contains(&v) {
                            Ok(Choice::B(v))
                        } else {
                            Err(Error::WrongRange)
                        }
                    },
                    &mut |c: &mut Cursor<B>| {
                        let (s, _) = c.decode_tstr()?;
                        Ok(Choice::C(s.into()))
                    },
                ],
            )
        }

        let mut cursor = Cursor::<2>::new(&hex!("01"));
        assert_eq!(decode_choice(&mut cursor).unwrap(), Choice::A);

        let mut cursor = Cursor::<2>::new(&hex!("05"));
        assert_eq!(decode_choice(&mut cursor).unwrap(), Choice::B(5));

        let mut cursor = Cursor::<2>::new(&hex!("6568656c6c6f"));
        assert_eq!(
            decode_choice(&mut cursor).unwrap(),
            Choice::C("hello".into())
        );

        // null matches none of A/B/C's major types.
        let mut cursor = Cursor::<2>::new(&hex!("f6"));
        assert!(decode_choice(&mut cursor).is_err());
    }

    #[test]
    fn expect_decode_rolls_back_on_mismatch() {
        let bytes = hex!("05");
        let mut cursor = Cursor::<1>::new(&bytes);
        assert!(matches!(
            expect_decode(&mut cursor, &4u64),
            Err(Error::WrongValue(_))
        ));
        // Cursor must be unmoved so a caller can try another alternative.
        assert_eq!(u64::decode(&mut cursor).unwrap(), 5);
    }
}
