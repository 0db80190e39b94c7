#![no_main]

use cbor_rt::cursor::Cursor;
use libfuzzer_sys::fuzz_target;

// Any byte slice must either decode a single well-formed CBOR value and
// land exactly on its end, or fail cleanly -- never panic, never read
// past the end of `data`.
fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::<16>::new(data);
    let _ = cursor.skip_any(64);
});
