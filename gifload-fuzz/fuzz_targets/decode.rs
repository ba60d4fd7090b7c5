// cargo fuzz run decode corpus/decode -- -timeout=30

#![no_main]

use libfuzzer_sys::fuzz_target;

use gifload::{Decoder, Frame};

fuzz_target!(|data: &[u8]| {
    Decoder::new(data)
        .max_image_sz(Some(1 << 20))
        .decode(&mut |frame: &Frame| {
            let _ = frame.image();
        });
});
