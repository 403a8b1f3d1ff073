use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    FileSummary, RecodeConfig, RecodeOptions, RecodeStats, SummaryConfig, SummaryKind,
    concat::concat_recoded,
    merge,
    recode::{read_column_list, recode_vcf},
    report::RunReport,
    summarize::summarize_many,
    summary::HistogramConfig,
    summary_text::{read_summary, write_summary},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Recode and summarize annotated VCF files", long_about = None)]
struct Cli {
    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recode a VCF into a tab-separated table of annotations and genotype codes
    Recode(RecodeArgs),
    /// Summarize per-sample genotype, variant type and annotation statistics
    Summarize(SummarizeArgs),
    /// Merge summary files produced by `summarize`
    CatSummary(CatArgs),
    /// Concatenate recoded tables that share the same columns
    CatRecoded(CatArgs),
}

#[derive(Debug, Args)]
struct RecodeArgs {
    /// Input VCF (plain or gzip-compressed)
    #[arg(long, value_name = "VCF")]
    vcf: PathBuf,

    /// Recoded output table
    #[arg(long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Read depth at or above which a call is fully confident
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    min_call_depth: u32,

    /// Placeholder for missing fixed and annotation values
    #[arg(long, default_value = ".")]
    missing_data_char: String,

    /// Placeholder for uncalled genotypes
    #[arg(long, default_value = "NA")]
    missing_gt_char: String,

    /// File listing annotation columns to emit, one per line
    #[arg(long, value_name = "FILE")]
    info_columns: Option<PathBuf>,

    /// Accept records with more than one alternate allele
    #[arg(long)]
    multiallelic: bool,
}

#[derive(Debug, Args)]
struct SummarizeArgs {
    /// Analysis to run
    #[arg(value_enum)]
    kind: SummaryKind,

    /// Input VCFs; summaries of several files are merged
    #[arg(long, value_name = "VCF", num_args = 1.., required = true)]
    vcf: Vec<PathBuf>,

    /// Summary output file
    #[arg(long, value_name = "OUTPUT")]
    output: PathBuf,

    #[arg(long, default_value_t = 500)]
    max_depth: usize,

    #[arg(long, default_value_t = 250)]
    max_qual: usize,

    #[arg(long, default_value_t = 100)]
    max_indel_len: usize,

    /// Number of allele frequency spectrum bins
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    afs_bins: u32,

    /// Stop after this many records per file
    #[arg(long)]
    max_records: Option<usize>,
}

#[derive(Debug, Args)]
struct CatArgs {
    /// Files to combine, in order
    #[arg(short = 'i', value_name = "FILE", num_args = 1.., required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, value_name = "OUTPUT")]
    output: PathBuf,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let outcome = match cli.command {
        Command::Recode(args) => run_recode(args),
        Command::Summarize(args) => run_summarize(args),
        Command::CatSummary(args) => run_cat_summary(args),
        Command::CatRecoded(args) => run_cat_recoded(args),
    };

    if let Err(err) = &outcome {
        tracing::error!("{err:#}");
    }
    outcome
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
    Ok(())
}

fn run_recode(args: RecodeArgs) -> Result<()> {
    let info_columns = match &args.info_columns {
        Some(path) => read_column_list(path)?,
        None => None,
    };

    let config = RecodeConfig {
        input: args.vcf,
        output: args.output,
        options: RecodeOptions {
            min_call_depth: args.min_call_depth,
            missing_data: args.missing_data_char,
            missing_gt: args.missing_gt_char,
            multiallelic: args.multiallelic,
            info_columns,
        },
    };

    let stats = recode_vcf(&config)?;
    print_recode_summary(&stats);

    let report = RunReport::for_recode(&config.input, &config.output, &config.options, &stats);
    report
        .write(&config.output)
        .context("failed to write run report")?;
    Ok(())
}

fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let histograms = HistogramConfig {
        max_depth: args.max_depth,
        max_qual: args.max_qual,
        max_indel_len: args.max_indel_len,
        num_afs_bins: args.afs_bins as usize,
    };
    let configs: Vec<SummaryConfig> = args
        .vcf
        .iter()
        .map(|input| SummaryConfig {
            input: input.clone(),
            kind: args.kind,
            histograms,
            max_records: args.max_records,
        })
        .collect();

    let Some(FileSummary {
        summary,
        records,
        dialect,
    }) = summarize_many(&configs)?
    else {
        anyhow::bail!("no VCF files to summarize");
    };

    write_summary(&summary, &args.output)?;
    println!(
        "Summarized {records} records across {files} file(s) for {samples} samples.",
        files = args.vcf.len(),
        samples = summary.len(),
    );

    let report = RunReport::for_summary(
        &args.vcf,
        &args.output,
        dialect,
        histograms,
        summary.len(),
        records,
        summary.counter_names().len(),
    );
    report
        .write(&args.output)
        .context("failed to write run report")?;
    Ok(())
}

fn run_cat_summary(args: CatArgs) -> Result<()> {
    let summaries = args
        .inputs
        .iter()
        .map(|path| read_summary(path))
        .collect::<Result<Vec<_>>>()?;

    let Some(merged) = merge::merge_all(summaries)? else {
        anyhow::bail!("no summary files to merge");
    };
    write_summary(&merged, &args.output)?;
    println!(
        "Merged {files} summaries covering {samples} samples.",
        files = args.inputs.len(),
        samples = merged.len(),
    );
    Ok(())
}

fn run_cat_recoded(args: CatArgs) -> Result<()> {
    let rows = concat_recoded(&args.inputs, &args.output)?;
    println!(
        "Wrote {rows} rows from {files} tables.",
        files = args.inputs.len()
    );
    Ok(())
}

fn print_recode_summary(stats: &RecodeStats) {
    println!(
        "Processed {total} records; emitted {emitted} rows ({samples} samples, {columns} annotation columns, {dialect} annotations).",
        total = stats.total_records,
        emitted = stats.emitted_rows,
        samples = stats.samples,
        columns = stats.annotation_columns,
        dialect = stats.dialect,
    );
}
