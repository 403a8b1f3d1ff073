#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    // Malformed text must come back as an error, never a panic
    let Ok(summary) = vcfqc::summary_text::parse_summary(&input) else {
        return;
    };

    // Anything that parses must re-serialize to something that parses to the same summary
    let reparsed = vcfqc::summary_text::parse_summary(&summary.to_string())
        .expect("serialized summary must parse");
    assert_eq!(reparsed, summary);
});
