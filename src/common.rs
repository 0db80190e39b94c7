//! Shared wire-format primitives used by both the decode and encode sides.

use core::fmt;

/// Diagnostic trace point for a hot decode/encode path. Expands to
/// `tracing::trace!` when the `trace` feature is enabled, and to
/// nothing otherwise -- the call sites pay no cost (not even argument
/// evaluation) in a default build.
#[macro_export]
macro_rules! trace_point {
    ($($arg:tt)*) => {
        #[cfg(feature = "trace")]
        {
            tracing::trace!($($arg)*);
        }
    };
}

/// The eight CBOR major types (RFC 8949 §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorType {
    UnsignedInteger,
    NegativeInteger,
    ByteString,
    TextString,
    Array,
    Map,
    Tag,
    Simple,
}

impl MajorType {
    pub(crate) fn from_marker(marker: u8) -> Self {
        match marker >> 5 {
            0 => MajorType::UnsignedInteger,
            1 => MajorType::NegativeInteger,
            2 => MajorType::ByteString,
            3 => MajorType::TextString,
            4 => MajorType::Array,
            5 => MajorType::Map,
            6 => MajorType::Tag,
            7 => MajorType::Simple,
            _ => unreachable!(),
        }
    }

    pub(crate) fn shift(self) -> u8 {
        match self {
            MajorType::UnsignedInteger => 0,
            MajorType::NegativeInteger => 1,
            MajorType::ByteString => 2,
            MajorType::TextString => 3,
            MajorType::Array => 4,
            MajorType::Map => 5,
            MajorType::Tag => 6,
            MajorType::Simple => 7,
        }
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MajorType::UnsignedInteger => "unsigned integer",
            MajorType::NegativeInteger => "negative integer",
            MajorType::ByteString => "byte string",
            MajorType::TextString => "text string",
            MajorType::Array => "array",
            MajorType::Map => "map",
            MajorType::Tag => "tag",
            MajorType::Simple => "simple/float",
        })
    }
}

/// IANA-registered CBOR tags that schema-directed code commonly needs to
/// recognize. Mirrors `zcbor_rfc8949_tag` from the original C headers.
pub mod tag {
    /// Standard date/time string (RFC 8949 §3.4.1).
    pub const DATETIME_STR: u64 = 0;
    /// Epoch-based date/time (RFC 8949 §3.4.2).
    pub const DATETIME_EPOCH: u64 = 1;
    /// Unsigned bignum.
    pub const POS_BIGNUM: u64 = 2;
    /// Negative bignum.
    pub const NEG_BIGNUM: u64 = 3;
    /// Decimal fraction.
    pub const DECIMAL_FRACTION: u64 = 4;
    /// Bigfloat.
    pub const BIGFLOAT: u64 = 5;
    /// Encoded CBOR data item embedded in a byte string (RFC 8949 §3.4.5.1).
    pub const CBOR_DATA_ITEM: u64 = 24;
    /// URI.
    pub const URI: u64 = 32;
    /// Base64url-encoded text.
    pub const BASE64URL: u64 = 33;
    /// Base64-encoded text.
    pub const BASE64: u64 = 34;
    /// Self-described CBOR (RFC 8949 §3.4.6).
    pub const SELF_DESCRIBED: u64 = 55799;
}

/// A borrowed byte string, distinguished from a plain `&[u8]` slice at the
/// schema surface so aggregate types can name the field without ambiguity
/// against an array-of-bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CborBytes<'a>(pub &'a [u8]);

impl<'a> AsRef<[u8]> for CborBytes<'a> {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

impl<'a> From<&'a [u8]> for CborBytes<'a> {
    fn from(value: &'a [u8]) -> Self {
        CborBytes(value)
    }
}
