#![no_main]

use libfuzzer_sys::fuzz_target;
use vcfqc::{GenotypeRecoder, input::parse_genotype, variant::GenotypeCall};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let min_depth = u32::from(data[0]).max(1);
    let (reference, alternate) = (u32::from(data[1]), u32::from(data[2]));
    let input = String::from_utf8_lossy(&data[3..]);

    let alleles = parse_genotype(&input);
    assert!(alleles.len() <= input.len() + 1, "allele count explosion");

    let call = GenotypeCall::from_alleles(&alleles).with_depths(reference, alternate);
    let code = GenotypeRecoder::new(min_depth, "NA").recode(&call);
    if call.is_called() {
        let value: f64 = code.parse().expect("called genotypes recode to a number");
        assert!((-1.0..=1.0).contains(&value));
    } else {
        assert_eq!(code, "NA");
    }
});
