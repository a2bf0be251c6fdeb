#![no_main]

use libfuzzer_sys::fuzz_target;
use subtle_codecs::base64::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }

    let mut enc = [0u8; 8192];
    let mut dec = [0u8; 8192];

    for e in [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD] {
        // decoding arbitrary input must never panic, and on success the
        // write count must stay within the declared bound
        if let Ok(n) = core::hint::black_box(e.decode(&mut dec, data)) {
            assert!(n <= e.decoded_len(data.len()));
        }

        let n = e.encode(&mut enc, data);
        assert_eq!(n, e.encoded_len(data.len()));

        let m = e.decode(&mut dec, &enc[..n]).unwrap();
        assert_eq!(&dec[..m], data);

        let m = e.strict().decode(&mut dec, &enc[..n]).unwrap();
        assert_eq!(&dec[..m], data);
    }
});
