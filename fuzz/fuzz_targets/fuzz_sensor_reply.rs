#![no_main]
use std::collections::VecDeque;
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use shutter_core::sensor::{DISTANCE_TAG, parse_reply};
use shutter_hardware::HwError;
use shutter_hardware::util::{MAX_LINE_LEN, read_line_with_timeout};

fuzz_target!(|data: &[u8]| {
    let mut bytes: VecDeque<u8> = data.iter().copied().collect();
    // running dry ends the read with an error instead of waiting out the timeout
    let line = read_line_with_timeout(
        || bytes.pop_front().map(Some).ok_or_else(|| HwError::Serial("input exhausted".into())),
        Duration::from_secs(1),
        Duration::ZERO,
    );
    if let Ok(Some(line)) = line {
        assert!(line.len() <= MAX_LINE_LEN);
        assert!(line.bytes().all(|b| (0x20..0x7f).contains(&b)));
        if let Some(v) = parse_reply(&line, DISTANCE_TAG) {
            assert!(v.is_finite());
        }
    }
});
