#![no_main]

use libfuzzer_sys::fuzz_target;

use xml2sheet::xml::SvdExtractor;

fuzz_target!(|data: &[u8]| {
    let mut entities = SvdExtractor::new(data).entities();
    let mut emitted = 0;
    for entity in entities.by_ref().take(10_000) {
        if entity.is_err() {
            break;
        }
        emitted += 1;
    }

    // Every emitted entity was opened first
    let counts = entities.counts();
    assert!(emitted <= counts.peripherals + counts.registers + counts.fields);
});
