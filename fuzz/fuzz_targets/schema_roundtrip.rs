#![no_main]

use cbor_rt::cursor::Cursor;
use cbor_rt::encode::Encoder;
use cbor_rt::schema::Pet;
use libfuzzer_sys::fuzz_target;

// Any input the Pet schema accepts must re-encode to a value that
// decodes back to an equal structure.
fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::<4>::new(data);
    let Ok(pet) = Pet::decode(&mut cursor) else {
        return;
    };

    let mut buf = [0u8; 256];
    let mut encoder = Encoder::new(&mut buf);
    pet.encode(&mut encoder).expect("re-encoding an accepted Pet must not fail");

    let encoded = &buf[..encoder.position()];
    let mut cursor2 = Cursor::<4>::new(encoded);
    let pet2 = Pet::decode(&mut cursor2).expect("re-encoded Pet must decode");
    assert_eq!(pet, pet2);
});
