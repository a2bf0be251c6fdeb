#![no_main]

use libfuzzer_sys::fuzz_target;
use subtle_codecs::hex;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }

    let mut outbuf = [0u8; 8192];

    // decoding arbitrary input must never panic
    let _res = core::hint::black_box(hex::decode(&mut outbuf, data));

    let len = hex::encode(&mut outbuf, data);
    assert_eq!(len, hex::encoded_len(data.len()));

    let mut decoded = [0u8; 4096];
    let n = hex::decode(&mut decoded, &outbuf[..len]).unwrap();
    assert_eq!(&decoded[..n], data);
});
