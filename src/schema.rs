/*!
The schema surface (component C7): the contract that schema-directed
code (e.g. generated from a CDDL description) is expected to satisfy
when calling into this crate's decode/encode/cursor/unordered-map
engine.

There is no CDDL compiler here: per scope, generating that code from a
schema description is out of bounds, but this module documents the
shape such code should take, via helper types for the common schema
patterns (bounded-range scalars, tagged choices), the generic
`decode_entry`/`encode_entry` entry-point wrappers every generated
schema type's own entry point should be built from, and one complete,
hand-written example (`Pet`) that exercises every layer of the engine
the way generated code would: a repetition bound decoded through
[`crate::decode::multi_decode_with`] and encoded through
[`crate::encode::multi_encode`], a range-validated byte string, and an
ordered choice enum. Grounded on
`examples/original_source/samples/pet` (`pet_types.h`, `pet_decode.c`,
`pet_encode.c`, `include/pet_decode.h`), the original project's own
worked sample for exactly this purpose.
*/
use crate::cursor::Cursor;
use crate::encode::{Encoder, ToCbor};
use crate::error::Error;

/// An unsigned integer schema-bounded to the inclusive range `[MIN, MAX]`.
///
/// Grounded on the repeated `(value == N) || wrong-range` guard clauses
/// zcbor generates for CDDL range constraints (see `pet_decode.c`'s
/// `birthday.len == 8` check, the same pattern applied to a length
/// instead of a numeric range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangedU64<const MIN: u64, const MAX: u64>(pub u64);

impl<const MIN: u64, const MAX: u64> RangedU64<MIN, MAX> {
    pub fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        let (v, _shortest) = cursor.decode_uint()?;
        if v < MIN || v > MAX {
            return Err(Error::WrongRange);
        }
        Ok(RangedU64(v))
    }
}

impl<const MIN: u64, const MAX: u64> ToCbor for RangedU64<MIN, MAX> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        debug_assert!(self.0 >= MIN && self.0 <= MAX);
        encoder.encode_uint(self.0)
    }
}

/// A byte string schema-bounded to an exact length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBytes<'a, const LEN: usize>(pub &'a [u8]);

impl<'a, const LEN: usize> FixedBytes<'a, LEN> {
    pub fn decode<const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<Self, Error> {
        let (bytes, _shortest) = cursor.decode_bstr()?;
        if bytes.len() != LEN {
            return Err(Error::WrongRange);
        }
        Ok(FixedBytes(bytes))
    }
}

impl<'a, const LEN: usize> ToCbor for FixedBytes<'a, LEN> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        debug_assert_eq!(self.0.len(), LEN);
        encoder.encode_bstr(self.0)
    }
}

// ---------------------------------------------------------------------
// C7 entry points: the `decode_T(buf, buf_len, &value, &out_len)` /
// `encode_T(buf, buf_len, &value, &out_len)` contract a generated
// schema type's top-level function should present, grounded on
// `examples/original_source/samples/pet/src/pet_decode.c`'s
// `cbor_decode_Pet`, which wraps its generated `decode_Pet` in
// `zcbor_entry_function` to allocate the backup-stack state array and
// reject a payload whose tail goes unconsumed.
// ---------------------------------------------------------------------

/// Runs `decode_one` over a fresh cursor covering the whole of `buf`,
/// then rejects any trailing bytes `decode_one` left unconsumed with
/// [`Error::AdditionalItems`], the Rust rendering of
/// `zcbor_entry_function`'s `ZCBOR_ERR_PAYLOAD_NOT_CONSUMED` check,
/// which a bare `T::decode(&mut cursor)` call has no way to perform on
/// its own, since `FromCbor`/schema decoders only ever promise to
/// consume *at least* one complete item, not the rest of the buffer.
///
/// Returns the decoded value together with the number of bytes
/// consumed (`out_len` in the original's out-parameter style).
pub fn decode_entry<'a, T, const B: usize>(
    buf: &'a [u8],
    decode_one: impl FnOnce(&mut Cursor<'a, B>) -> Result<T, Error>,
) -> Result<(T, usize), Error> {
    let mut cursor = Cursor::<B>::new(buf);
    let value = decode_one(&mut cursor)?;
    if !cursor.is_exhausted() {
        return Err(Error::AdditionalItems);
    }
    Ok((value, cursor.position()))
}

/// The encode-side counterpart of [`decode_entry`]: runs `encode_one`
/// against a fresh [`Encoder`] over `buf` and reports how many bytes it
/// wrote.
pub fn encode_entry<'a>(
    buf: &'a mut [u8],
    encode_one: impl FnOnce(&mut Encoder<'a>) -> Result<(), Error>,
) -> Result<usize, Error> {
    let mut encoder = Encoder::new(buf);
    encode_one(&mut encoder)?;
    Ok(encoder.position())
}

// ---------------------------------------------------------------------
// Worked example: the `Pet` schema from the original project's sample.
//
//   Pet = [
//     names: 1*3 tstr,
//     birthday: bstr .size 8,
//     species: &(cat: 1, dog: 2, other: 3),
//   ]
// ---------------------------------------------------------------------

/// The maximum number of names a [`Pet`] may declare, matching the
/// original sample's `--default-max-qty 3`.
pub const PET_MAX_NAMES: usize = 3;

/// The ordered choice of species, encoded as its discriminant integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    Cat,
    Dog,
    Other,
}

impl Species {
    fn decode<const B: usize>(cursor: &mut Cursor<B>) -> Result<Self, Error> {
        let (v, _shortest) = cursor.decode_uint()?;
        match v {
            1 => Ok(Species::Cat),
            2 => Ok(Species::Dog),
            3 => Ok(Species::Other),
            _ => Err(Error::WrongValue(alloc::format!(
                "{v} is not a valid species discriminant"
            ))),
        }
    }
}

impl ToCbor for Species {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_uint(match self {
            Species::Cat => 1,
            Species::Dog => 2,
            Species::Other => 3,
        })
    }
}

/// A pet: a name list bounded to 1-3 entries, an 8-byte birthday, and a
/// species choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pet<'a> {
    pub names: alloc::vec::Vec<&'a str>,
    pub birthday: FixedBytes<'a, 8>,
    pub species: Species,
}

impl<'a> Pet<'a> {
    /// Decodes a `Pet` from the current cursor position.
    pub fn decode<const B: usize>(cursor: &mut Cursor<'a, B>) -> Result<Pet<'a>, Error> {
        cursor.start_list()?;

        cursor.start_list()?;
        let names = crate::decode::multi_decode_with(cursor, 1, PET_MAX_NAMES, |c| {
            Ok(c.decode_tstr()?.0)
        })?;
        cursor.end_list()?;

        let birthday = FixedBytes::<8>::decode(cursor)?;
        let species = Species::decode(cursor)?;

        cursor.end_list()?;

        Ok(Pet {
            names,
            birthday,
            species,
        })
    }

    /// Encodes this `Pet`, matching the exact canonical byte layout the
    /// original sample's `cbor_encode_Pet` produces.
    pub fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        debug_assert!(!self.names.is_empty() && self.names.len() <= PET_MAX_NAMES);

        let mut outer = encoder.start_list(3)?;

        let mut names_list = outer.start_list(PET_MAX_NAMES)?;
        crate::encode::multi_encode(&mut names_list, &self.names, 1, PET_MAX_NAMES, |list, name| {
            list.encode_tstr(*name)
        })?;
        names_list.end()?;

        outer.emit(&self.birthday)?;
        outer.emit(&self.species)?;

        outer.end()
    }
}

/// `cbor_decode_Pet(payload, payload_len, result, payload_len_out)`: the
/// concrete schema entry wrapper for [`Pet`], matching
/// `examples/original_source/samples/pet/src/pet_decode.c`'s
/// `cbor_decode_Pet` (which allocates the backup-stack state array via
/// `ZCBOR_STATE_D` and runs the whole thing through
/// `zcbor_entry_function`). `out_len` is returned rather than written
/// through an out parameter, and the backup-stack depth is the caller's
/// own const generic choice rather than a macro-derived array size.
pub fn cbor_decode_pet<const B: usize>(buf: &[u8]) -> Result<(Pet<'_>, usize), Error> {
    decode_entry::<Pet<'_>, B>(buf, |cursor| Pet::decode::<B>(cursor))
}

/// `cbor_encode_Pet(payload, payload_len, value, payload_len_out)`: the
/// encode-side counterpart of [`cbor_decode_pet`].
pub fn cbor_encode_pet(buf: &mut [u8], value: &Pet) -> Result<usize, Error> {
    encode_entry(buf, |encoder| value.encode(encoder))
}
