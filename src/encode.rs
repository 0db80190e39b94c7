/*!
Typed encode primitives (component C1) and the encode-side container
engine (component C4) that writes into a caller-owned, fixed-size
buffer.

Unlike the teacher crate's `Encoder` (which wraps a growable `Vec<u8>`
and cannot fail), this `Encoder` writes into a borrowed `&mut [u8]` and
reports [`Error::NoPayload`] on overflow, per this project's external
interface: `encode_T(buf, buf_len, &value, &out_len) -> status`.

When the `canonical` feature is enabled (the default), list and map
headers are always written in definite-length, shortest-form. Because a
repetition's final count is often not known until its elements have
been written (e.g. `T*1..3`), the container writers reserve header space
sized for the schema's declared maximum count, then, once the actual
count is known, rewrite the header in its true shortest form and shift
the already-written body left if the header shrank. This is the direct
port of zcbor's placeholder-header-then-backpatch mechanic
(`examples/original_source/src/zcbor_encode.c::list_zcbor_map_start_encode`/
`list_zcbor_map_end_encode`). With `canonical` disabled, containers are
always written indefinite-length (a `break` byte closes them), which
needs no backpatching at all.
*/
use crate::error::Error;

/// A trait for types that know how to append themselves to an [`Encoder`].
///
/// Mirrors the teacher's `ToCbor` trait, generalized to a fallible,
/// bounded encoder: implementations report [`Error::NoPayload`] instead
/// of panicking when the destination buffer is full.
pub trait ToCbor {
    /// Appends `self` to `encoder`.
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error>;
}

macro_rules! impl_uint_to_cbor {
    ($($ty:ty),*) => {
        $(
            impl ToCbor for $ty {
                fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
                    encoder.encode_uint(*self as u64)
                }
            }
        )*
    };
}

impl_uint_to_cbor!(u8, u16, u32, u64, usize);

macro_rules! impl_int_to_cbor {
    ($($ty:ty),*) => {
        $(
            impl ToCbor for $ty {
                fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
                    encoder.encode_int(*self as i64)
                }
            }
        )*
    };
}

impl_int_to_cbor!(i8, i16, i32, i64, isize);

impl ToCbor for bool {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_bool(*self)
    }
}

impl ToCbor for f64 {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_float(*self)
    }
}

impl ToCbor for f32 {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_float(*self as f64)
    }
}

impl ToCbor for str {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_tstr(self)
    }
}

impl ToCbor for alloc::string::String {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_tstr(self)
    }
}

impl ToCbor for crate::common::CborBytes<'_> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        encoder.encode_bstr(self.0)
    }
}

impl<T> ToCbor for Option<T>
where
    T: ToCbor,
{
    fn encode(&self, encoder: &mut Encoder) -> Result<(), Error> {
        match self {
            Some(v) => v.encode(encoder),
            None => encoder.encode_undefined(),
        }
    }
}

/// A bounded, fallible, streaming encoder writing into a caller-supplied
/// buffer.
pub struct Encoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Encoder<'a> {
    /// Wraps `buf` for encoding, starting at offset 0.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Encoder { buf, pos: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.pos.checked_add(bytes.len()).ok_or(Error::TooBig)?;
        let dst = self.buf.get_mut(self.pos..end).ok_or(Error::NoPayload)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn write_uint_minor(&mut self, major: u8, val: u64) -> Result<(), Error> {
        let mut hdr = [0u8; 9];
        let len = encode_header(&mut hdr, major, val);
        self.write(&hdr[..len])
    }

    /// Encodes an unsigned integer (major type 0).
    pub fn encode_uint(&mut self, v: u64) -> Result<(), Error> {
        self.write_uint_minor(0, v)
    }

    /// Encodes a signed integer as major type 0 or 1, whichever applies.
    pub fn encode_int(&mut self, v: i64) -> Result<(), Error> {
        if v >= 0 {
            self.write_uint_minor(0, v as u64)
        } else {
            self.write_uint_minor(1, (-1 - v) as u64)
        }
    }

    /// Encodes a definite-length byte string.
    pub fn encode_bstr(&mut self, v: &[u8]) -> Result<(), Error> {
        self.write_uint_minor(2, v.len() as u64)?;
        self.write(v)
    }

    /// Encodes a definite-length text string.
    pub fn encode_tstr(&mut self, v: &str) -> Result<(), Error> {
        self.write_uint_minor(3, v.len() as u64)?;
        self.write(v.as_bytes())
    }

    /// Encodes a CBOR boolean.
    pub fn encode_bool(&mut self, v: bool) -> Result<(), Error> {
        self.write(&[(7 << 5) | if v { 21 } else { 20 }])
    }

    /// Encodes CBOR `null`.
    pub fn encode_null(&mut self) -> Result<(), Error> {
        self.write(&[(7 << 5) | 22])
    }

    /// Encodes CBOR `undefined`.
    pub fn encode_undefined(&mut self) -> Result<(), Error> {
        self.write(&[(7 << 5) | 23])
    }

    /// Encodes a semantic tag preceding the next emitted value.
    pub fn encode_tag(&mut self, tag: u64) -> Result<(), Error> {
        self.write_uint_minor(6, tag)
    }

    /// Encodes an `f64`, selecting the shortest IEEE-754 width (f16, f32,
    /// or f64) that round-trips the value exactly, the canonical
    /// encoding rule from RFC 8949 4.2.2.
    ///
    /// NaN and the infinities are always representable in f16, but a
    /// plain `f == f` round-trip check can't see that (NaN never equals
    /// itself), so they're special-cased the same way
    /// `cursor::is_representable_as_f16` handles them on the decode side.
    pub fn encode_float(&mut self, v: f64) -> Result<(), Error> {
        if v.is_nan() {
            self.write(&[(7 << 5) | 25])?;
            return self.write(&half::f16::NAN.to_be_bytes());
        }
        if v.is_infinite() {
            let f = if v.is_sign_negative() {
                half::f16::NEG_INFINITY
            } else {
                half::f16::INFINITY
            };
            self.write(&[(7 << 5) | 25])?;
            return self.write(&f.to_be_bytes());
        }
        if let Some(f) = lossless_float_coerce::<half::f16>(v) {
            self.write(&[(7 << 5) | 25])?;
            self.write(&f.to_be_bytes())
        } else if let Some(f) = lossless_float_coerce::<f32>(v) {
            self.write(&[(7 << 5) | 26])?;
            self.write(&f.to_be_bytes())
        } else {
            self.write(&[(7 << 5) | 27])?;
            self.write(&v.to_be_bytes())
        }
    }

    /// Encodes a byte string whose content is itself a CBOR data item
    /// (e.g. tag-24 embedded CBOR): reserves a header sized for
    /// `max_len`, runs `f` to write the embedded item directly after it,
    /// then rewrites the header in its true shortest form and shifts the
    /// body left if it shrank -- the same placeholder-then-backpatch
    /// scheme [`ListEncoder::end`] uses for a count it doesn't know up
    /// front, applied here to a byte length instead.
    pub fn encode_bstr_cbor(
        &mut self,
        max_len: usize,
        f: impl FnOnce(&mut Encoder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let header_start = self.pos;
        let mut hdr = [0u8; 9];
        let reserved_width = encode_header(&mut hdr, 2, max_len as u64);
        self.write(&hdr[..reserved_width])?;

        let body_start = self.pos;
        f(self)?;
        let body_len = self.pos - body_start;

        let mut hdr = [0u8; 9];
        let actual_width = encode_header(&mut hdr, 2, body_len as u64);
        debug_assert!(actual_width <= reserved_width);
        if actual_width < reserved_width {
            let shift = reserved_width - actual_width;
            self.buf.copy_within(body_start..self.pos, body_start - shift);
            self.pos -= shift;
        }
        self.buf[header_start..header_start + actual_width].copy_from_slice(&hdr[..actual_width]);
        Ok(())
    }

    /// Starts a CBOR array. `max_count` bounds how many elements will be
    /// written (the schema's upper repetition bound); the true count is
    /// fixed when [`ListEncoder::end`] runs.
    pub fn start_list(&mut self, max_count: usize) -> Result<ListEncoder<'_, 'a>, Error> {
        ListEncoder::new(self, 4, max_count)
    }

    /// Starts a CBOR map. `max_pairs` bounds how many key/value pairs
    /// will be written.
    pub fn start_map(&mut self, max_pairs: usize) -> Result<ListEncoder<'_, 'a>, Error> {
        ListEncoder::new(self, 5, max_pairs)
    }
}

fn lossless_float_coerce<T>(value: f64) -> Option<T>
where
    T: num_traits::FromPrimitive + Into<f64> + Copy,
{
    match <T as num_traits::FromPrimitive>::from_f64(value) {
        Some(f) if <T as Into<f64>>::into(f) == value => Some(f),
        _ => None,
    }
}

/// Writes a major-type + additional-info header for `val` into `buf`,
/// returning the number of bytes used. Ported from the teacher's
/// `encode::Encoder::emit_uint_minor`.
fn encode_header(buf: &mut [u8; 9], major: u8, val: u64) -> usize {
    match val {
        0..=23 => {
            buf[0] = (major << 5) | (val as u8);
            1
        }
        24..=0xFF => {
            buf[0] = (major << 5) | 24;
            buf[1] = val as u8;
            2
        }
        0x100..=0xFFFF => {
            buf[0] = (major << 5) | 25;
            buf[1..3].copy_from_slice(&(val as u16).to_be_bytes());
            3
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf[0] = (major << 5) | 26;
            buf[1..5].copy_from_slice(&(val as u32).to_be_bytes());
            5
        }
        _ => {
            buf[0] = (major << 5) | 27;
            buf[1..9].copy_from_slice(&val.to_be_bytes());
            9
        }
    }
}

/// A CBOR array or map under construction. Shared by [`Encoder::start_list`]
/// and [`Encoder::start_map`]; `major` (4 or 5) distinguishes them, and for
/// a map each logical entry is two calls to an `encode_*` method (key,
/// then value) against `count`.
pub struct ListEncoder<'e, 'a> {
    encoder: &'e mut Encoder<'a>,
    major: u8,
    header_start: usize,
    /// Width, in bytes, reserved for the header at `header_start`; `0`
    /// when running in indefinite-length (non-canonical) mode.
    reserved_width: usize,
    max_count: usize,
    count: usize,
}

impl<'e, 'a> ListEncoder<'e, 'a> {
    fn new(encoder: &'e mut Encoder<'a>, major: u8, max_count: usize) -> Result<Self, Error> {
        let header_start = encoder.pos;
        let reserved_width = if cfg!(feature = "canonical") {
            let mut hdr = [0u8; 9];
            let width = encode_header(&mut hdr, major, max_count as u64);
            encoder.write(&hdr[..width])?;
            width
        } else {
            encoder.write(&[(major << 5) | 31])?;
            0
        };
        Ok(ListEncoder {
            encoder,
            major,
            header_start,
            reserved_width,
            max_count,
            count: 0,
        })
    }

    fn record(&mut self) -> Result<(), Error> {
        self.count += 1;
        if self.count > self.max_count {
            return Err(Error::TooBig);
        }
        Ok(())
    }

    /// Encodes the next array element (or, for a map, the next key or
    /// value; callers are responsible for pairing calls correctly).
    pub fn encode_uint(&mut self, v: u64) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_uint(v)
    }

    /// See [`ListEncoder::encode_uint`].
    pub fn encode_int(&mut self, v: i64) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_int(v)
    }

    /// See [`ListEncoder::encode_uint`].
    pub fn encode_bstr(&mut self, v: &[u8]) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_bstr(v)
    }

    /// See [`ListEncoder::encode_uint`].
    pub fn encode_tstr(&mut self, v: &str) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_tstr(v)
    }

    /// See [`ListEncoder::encode_uint`].
    pub fn encode_bool(&mut self, v: bool) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_bool(v)
    }

    /// See [`ListEncoder::encode_uint`].
    pub fn encode_null(&mut self) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_null()
    }

    /// See [`ListEncoder::encode_uint`].
    pub fn encode_float(&mut self, v: f64) -> Result<(), Error> {
        self.record()?;
        self.encoder.encode_float(v)
    }

    /// Encodes any [`ToCbor`] value as the next element.
    pub fn emit<T: ToCbor + ?Sized>(&mut self, v: &T) -> Result<(), Error> {
        self.record()?;
        v.encode(self.encoder)
    }

    /// Starts a nested array as the next element.
    pub fn start_list(&mut self, max_count: usize) -> Result<ListEncoder<'_, 'a>, Error> {
        self.record()?;
        self.encoder.start_list(max_count)
    }

    /// Starts a nested map as the next element.
    pub fn start_map(&mut self, max_pairs: usize) -> Result<ListEncoder<'_, 'a>, Error> {
        self.record()?;
        self.encoder.start_map(max_pairs)
    }

    /// Finishes the container: in canonical mode, rewrites the header
    /// with the true (possibly shorter) shortest-form count and shifts
    /// the body left if the header shrank; in indefinite-length mode,
    /// writes the terminating break byte.
    ///
    /// `self.count` must already reflect the actual number of encode
    /// calls made (array element count, or twice the map pair count;
    /// callers encoding a map must call an `encode_*` method once per
    /// key and once per value).
    pub fn end(self) -> Result<(), Error> {
        if self.reserved_width == 0 {
            // Indefinite-length: no backpatch, just close with a break.
            return self.encoder.write(&[0xFF]);
        }

        let mut hdr = [0u8; 9];
        let actual_width = encode_header(&mut hdr, self.major, self.count as u64);
        debug_assert!(actual_width <= self.reserved_width);

        if actual_width < self.reserved_width {
            let shift = self.reserved_width - actual_width;
            let body_start = self.header_start + self.reserved_width;
            let body_end = self.encoder.pos;
            self.encoder
                .buf
                .copy_within(body_start..body_end, body_start - shift);
            self.encoder.pos = body_end - shift;
        }
        self.encoder.buf[self.header_start..self.header_start + actual_width]
            .copy_from_slice(&hdr[..actual_width]);
        Ok(())
    }
}

/// Encodes all of `items` into the array/map currently under
/// construction via `encode_one`, first checking `min <= items.len() <=
/// max`. Any encoder failure is fatal; there is no backtracking on
/// encode, per spec.md 4.5.
///
/// Grounded on zcbor's `zcbor_multi_encode`.
pub fn multi_encode<T>(
    list: &mut ListEncoder<'_, '_>,
    items: &[T],
    min: usize,
    max: usize,
    mut encode_one: impl FnMut(&mut ListEncoder<'_, '_>, &T) -> Result<(), Error>,
) -> Result<usize, Error> {
    if items.len() < min || items.len() > max {
        return Err(Error::WrongRange);
    }
    for item in items.iter() {
        encode_one(list, item)?;
    }
    Ok(items.len())
}

/// Encodes `tag` followed by `value`, the encode-side counterpart of
/// [`crate::decode::tagged_decode`].
pub fn tagged_encode<T: ToCbor + ?Sized>(
    encoder: &mut Encoder,
    tag: u64,
    value: &T,
) -> Result<(), Error> {
    encoder.encode_tag(tag)?;
    value.encode(encoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn rfc_unsigned_integers() {
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_uint(0).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("00"));

        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_uint(1_000_000).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("1a000f4240"));
    }

    #[test]
    fn negative_integers() {
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_int(-1).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("20"));

        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_int(-1000).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("3903e7"));
    }

    #[test]
    fn overflow_reports_no_payload() {
        let mut buf = [0u8; 1];
        let mut e = Encoder::new(&mut buf);
        assert!(matches!(e.encode_uint(1_000_000), Err(Error::NoPayload)));
    }

    #[test]
    fn canonical_float_picks_shortest_width() {
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_float(0.0).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("f90000"));

        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_float(f64::INFINITY).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("f97c00"));
    }

    #[test]
    fn nan_encodes_to_canonical_f16() {
        // A NaN never equals itself, so the lossless-round-trip check
        // alone can't select f16 for it; it must still pick the
        // shortest width rather than falling through to f64.
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_float(f64::NAN).unwrap();
        assert_eq!(&buf[..e.position()], &hex!("f97e00"));
    }

    #[cfg(feature = "canonical")]
    #[test]
    fn list_backpatch_shrinks_header_when_count_is_small() {
        // max_count = 1000 reserves a 3-byte header (major 4, additional 25);
        // only 1 item is actually written, so the header must shrink to 1 byte.
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        let mut l = e.start_list(1000).unwrap();
        l.encode_uint(7).unwrap();
        l.end().unwrap();
        assert_eq!(&buf[..e.position()], &hex!("8107"));
    }

    #[cfg(not(feature = "canonical"))]
    #[test]
    fn list_is_indefinite_length_without_canonical_feature() {
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        let mut l = e.start_list(1000).unwrap();
        l.encode_uint(7).unwrap();
        l.end().unwrap();
        assert_eq!(&buf[..e.position()], &hex!("9f07ff"));
    }

    #[cfg(feature = "canonical")]
    #[test]
    fn embedded_bstr_cbor_shrinks_header_to_actual_length() {
        // Embedding [1, 2] (a 3-byte encoding: 82 01 02) with a reserved
        // max_len of 1000 (3-byte header) must shrink to a 1-byte header.
        let mut buf = [0u8; 16];
        let mut e = Encoder::new(&mut buf);
        e.encode_bstr_cbor(1000, |inner| {
            let mut l = inner.start_list(2)?;
            l.encode_uint(1)?;
            l.encode_uint(2)?;
            l.end()
        })
        .unwrap();
        assert_eq!(&buf[..e.position()], &hex!("43" "820102"));
    }
}
