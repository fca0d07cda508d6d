#![no_main]

use isa::isatab::{read_investigation, read_study_table};
use isa::model::{OntologySource, Protocol, Study};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Malformed input must come back as an error, never a panic
    let _ = read_investigation(Cursor::new(data));

    let mut study = Study::new("S1", "s_fuzz.txt");
    study.protocols.push(Protocol::new("P1", "sample collection"));
    let _ = read_study_table(Cursor::new(data), &[OntologySource::new("OBI")], &mut study);
});
