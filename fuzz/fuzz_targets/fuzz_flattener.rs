#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use xml2sheet::xml::RecordStreamer;

fuzz_target!(|data: &[u8]| {
    // Detection and flattening must fail cleanly on arbitrary bytes, never panic
    let Ok((streamer, _detected)) = RecordStreamer::from_seekable(Cursor::new(data), 64) else {
        return;
    };

    for record in streamer.records().take(10_000) {
        if record.is_err() {
            break;
        }
    }
});
