//! The error taxonomy shared by decoding, encoding, and the schema engine.

use core::str::Utf8Error;
use thiserror::Error;

/// Every way a CBOR decode, encode, or schema-directed operation can fail.
///
/// A single type is shared across the whole crate (unlike the original
/// zcbor, which returns one status code per call) so that schema-surface
/// code composing decode and encode calls with `?` doesn't need a
/// conversion layer between them.
#[derive(Error, Debug)]
pub enum Error {
    /// The input ended before a value's header or content could be read.
    #[error("Need at least {0} more bytes to decode value")]
    NeedMoreData(usize),

    /// A declared length exceeds `usize::MAX` or available memory.
    #[error("An encoded item requires more memory than available")]
    TooBig,

    /// The next item's major type did not match what the schema expected.
    #[error("Incorrect type, expecting {0}, found {1}")]
    WrongType(alloc::string::String, alloc::string::String),

    /// The decoded value does not match any permitted constant/choice.
    #[error("Value does not match any expected constant: {0}")]
    WrongValue(alloc::string::String),

    /// The decoded value is outside the range permitted by the schema.
    #[error("Value is outside the permitted range")]
    WrongRange,

    /// The CBOR item has an invalid minor-type value for its major type.
    #[error("Invalid minor-type value {0}")]
    InvalidMinorValue(u8),

    /// A simple value was found that is unassigned or reserved.
    #[error("Invalid simple type {0}")]
    InvalidSimpleType(u8),

    /// An indefinite-length string contains a chunk of the wrong major type.
    #[error("Chunked string contains an invalid chunk")]
    InvalidChunk,

    /// An indefinite-length map ended with a key but no matching value.
    #[error("Map has key but no value")]
    PartialMap,

    /// Extra, unread items remain after a definite-length sequence should
    /// have ended.
    #[error("Additional unread items in sequence")]
    AdditionalItems,

    /// An item was requested from a sequence that has already ended.
    #[error("No more items in sequence")]
    NoMoreItems,

    /// A schema-directed map decode finished with entries in the input
    /// that were never matched against any expected key.
    #[error("Map has entries that were not matched by the schema")]
    ElementsNotProcessed,

    /// A schema-directed map decode saw the same key twice.
    #[error("Map contains a duplicate key")]
    DuplicateKey,

    /// A schema-directed map decode finished without ever seeing a key
    /// the schema marked as required.
    #[error("Map is missing a required key")]
    MissingRequiredKey,

    /// The maximum configured recursion/skip depth was reached.
    #[error("Maximum recursion depth reached")]
    MaxRecursion,

    /// The cursor's fixed-capacity backup stack has no free slots.
    ///
    /// Raised when a schema needs more simultaneous backup points (nested
    /// unions, nested optional probes) than the `BACKUPS` const generic
    /// chosen for the `Cursor` provides.
    #[error("Backup stack exhausted")]
    BackupStackExhausted,

    /// No backup point is currently active to restore or consume.
    #[error("No backup point is active")]
    NoActiveBackup,

    /// A text string contains invalid UTF-8.
    #[error(transparent)]
    InvalidUtf8(#[from] Utf8Error),

    /// An integer conversion failed, typically due to an out-of-range value.
    #[error(transparent)]
    TryFromIntError(#[from] core::num::TryFromIntError),

    /// A floating-point conversion would result in a loss of precision.
    #[error("Loss of floating-point precision")]
    PrecisionLoss,

    /// The encode-side output buffer is too small to hold the encoded value.
    #[error("Output buffer has no room for the encoded payload")]
    NoPayload,

    /// A bstr-wrapped CBOR item (tag 24) did not consume exactly the
    /// byte string's declared length.
    #[error("Embedded CBOR item did not consume its enclosing byte string")]
    NotAtEnd,
}
