use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use tempfile::tempdir;
use vcfqc::{
    Dialect, RecodeConfig, RecodeOptions, VcfQcError, concat::concat_recoded, recode_vcf,
    report::RunReport,
};

const SNPEFF_VCF: &str = "##fileformat=VCFv4.2
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">
##INFO=<ID=ANN,Number=.,Type=String,Description=\"Functional annotations: 'Allele | Annotation | Annotation_Impact | Gene_Name'\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
1\t100\trs10\tA\tT\t60\tPASS\tDP=22;ANN=T|missense_variant|MODERATE|BRCA1,T|intron_variant|MODIFIER|BRCA1\tGT:AD\t0/1:3,7\t0/0:15,0
1\t200\t.\tG\tC\t.\t.\tDP=5\tGT:AD\t./.:.\t1/1:0,4
";

const MULTIALLELIC_VCF: &str = "##fileformat=VCFv4.2
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1
1\t100\t.\tA\tT\t.\t.\tDP=3\tGT:AD\t0/1:1,2
1\t300\t.\tA\tC,G\t.\t.\tDP=9\tGT:AD\t1/2:0,4,5
";

fn write_file(dir: &Path, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn config(input: PathBuf, output: PathBuf) -> RecodeConfig {
    RecodeConfig {
        input,
        output,
        options: RecodeOptions::default(),
    }
}

#[test]
fn recodes_snpeff_vcf_end_to_end() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", SNPEFF_VCF).unwrap();
    let output = dir.path().join("out.tsv");

    let stats = recode_vcf(&config(input, output.clone())).unwrap();
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.emitted_rows, 2);
    assert_eq!(stats.samples, 2);
    assert_eq!(stats.annotation_columns, 5);
    assert_eq!(stats.dialect, Dialect::SnpEff);

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tDP\tAllele\tAnnotation\tAnnotation_Impact\tGene_Name\tS1\tS2"
    );
    assert_eq!(
        lines[1],
        "1\t100\trs10\tA\tT\t60\tPASSED\t22\tT\tmissense_variant\tMODERATE\tBRCA1\t0.7\t-1"
    );
    assert_eq!(lines[2], "1\t200\t.\tG\tC\t.\t.\t5\t.\t.\t.\t.\tNA\t0.4");
    assert_eq!(lines.len(), 3);
}

#[test]
fn reads_gzip_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.vcf.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(SNPEFF_VCF.as_bytes()).unwrap();
    fs::write(&input, encoder.finish().unwrap()).unwrap();
    let output = dir.path().join("out.tsv");

    let stats = recode_vcf(&config(input, output)).unwrap();
    assert_eq!(stats.emitted_rows, 2);
}

#[test]
fn column_subset_and_placeholders() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", SNPEFF_VCF).unwrap();
    let list = write_file(dir.path(), "columns.txt", "Gene_Name\n\nDP\n").unwrap();
    let output = dir.path().join("out.tsv");

    let mut cfg = config(input, output.clone());
    cfg.options.info_columns = vcfqc::recode::read_column_list(&list).unwrap();
    cfg.options.missing_data = String::from("NaN");
    cfg.options.missing_gt = String::from("?");
    cfg.options.min_call_depth = 4;
    recode_vcf(&cfg).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tGene_Name\tDP\tS1\tS2"
    );
    assert_eq!(lines[1], "1\t100\trs10\tA\tT\t60\tPASSED\tBRCA1\t22\t1\t-1");
    assert_eq!(lines[2], "1\t200\tNaN\tG\tC\tNaN\tNaN\tNaN\t5\t?\t1");
}

#[test]
fn undeclared_column_fails_before_output_exists() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", SNPEFF_VCF).unwrap();
    let output = dir.path().join("out.tsv");

    let mut cfg = config(input, output.clone());
    cfg.options.info_columns = Some(vec![String::from("Gene_Name"), String::from("CADD")]);
    let err = recode_vcf(&cfg).unwrap_err();

    match err.downcast_ref::<VcfQcError>() {
        Some(VcfQcError::Schema { missing }) => assert_eq!(missing, &["CADD"]),
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn multiallelic_record_aborts_unless_allowed() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", MULTIALLELIC_VCF).unwrap();
    let output = dir.path().join("out.tsv");

    let err = recode_vcf(&config(input.clone(), output.clone())).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VcfQcError>(),
        Some(VcfQcError::Multiallelic { position: 300, .. })
    ));
    // the record before the failure was already written
    let partial = fs::read_to_string(&output).unwrap();
    assert_eq!(partial.lines().count(), 2);
    assert!(!partial.contains("\t300\t"));

    let mut cfg = config(input, output.clone());
    cfg.options.multiallelic = true;
    let stats = recode_vcf(&cfg).unwrap();
    assert_eq!(stats.emitted_rows, 2);
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.lines().last().unwrap().starts_with("1\t300\t.\tA\tC\t"));
}

#[test]
fn structurally_invalid_file_is_rejected() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", "#CHROM\tPOS\n1\t2\n").unwrap();
    let output = dir.path().join("out.tsv");

    let err = recode_vcf(&config(input, output.clone())).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VcfQcError>(),
        Some(VcfQcError::Format { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn recoded_tables_concatenate() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", SNPEFF_VCF).unwrap();
    let first = dir.path().join("a.tsv");
    let second = dir.path().join("b.tsv");
    recode_vcf(&config(input.clone(), first.clone())).unwrap();
    recode_vcf(&config(input, second.clone())).unwrap();

    let merged = dir.path().join("all.tsv");
    let rows = concat_recoded(&[first, second], &merged).unwrap();
    assert_eq!(rows, 4);
    let text = fs::read_to_string(&merged).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert_eq!(text.lines().filter(|l| l.starts_with("CHROM")).count(), 1);
}

#[test]
fn run_report_written_next_to_output() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "in.vcf", SNPEFF_VCF).unwrap();
    let output = dir.path().join("cohort.tsv");
    let cfg = config(input.clone(), output.clone());
    let stats = recode_vcf(&cfg).unwrap();

    RunReport::for_recode(&input, &output, &cfg.options, &stats)
        .write(&output)
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("cohort_report.json")).unwrap())
            .unwrap();
    assert_eq!(json["statistics"]["total_records"], 2);
    assert_eq!(json["samples"], 2);
}
