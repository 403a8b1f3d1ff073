fn main() -> anyhow::Result<()> {
    vcfqc::cli::run()
}
