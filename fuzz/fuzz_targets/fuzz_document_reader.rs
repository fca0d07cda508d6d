#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(investigation) = isa::isajson::loads(text) {
            // Anything that loads must dump again
            let _ = isa::isajson::dumps(&investigation, &Default::default());
        }
    }
});
