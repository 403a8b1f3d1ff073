//! Concatenation of recoded tables that share one header.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

use crate::error::VcfQcError;

fn read_header(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    );
    let mut header = String::new();
    reader
        .read_line(&mut header)
        .with_context(|| format!("failed to read header of {}", path.display()))?;
    Ok(header.trim_end_matches(['\n', '\r']).to_string())
}

/// Write the shared header once, then the data lines of every input in
/// order. Returns the number of data lines written.
pub fn concat_recoded(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    let Some(first) = inputs.first() else {
        bail!("no recoded tables to concatenate");
    };

    let header = read_header(first)?;
    for input in &inputs[1..] {
        let other = read_header(input)?;
        if other != header {
            tracing::error!(
                expected = %header,
                received = %other,
                file = %input.display(),
                "input files do not contain the same columns in the same order"
            );
            return Err(VcfQcError::HeaderMismatch {
                file: input.display().to_string(),
                reference: first.display().to_string(),
            }
            .into());
        }
    }

    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    writeln!(writer, "{header}")?;

    let mut written = 0;
    for input in inputs {
        let reader = BufReader::new(
            File::open(input).with_context(|| format!("failed to open {}", input.display()))?,
        );
        for line in reader.lines().skip(1) {
            let line = line.with_context(|| format!("failed to read {}", input.display()))?;
            writeln!(writer, "{line}")?;
            written += 1;
        }
        tracing::debug!(file = %input.display(), written, "appended recoded table");
    }
    writer.flush()?;

    tracing::info!(inputs = inputs.len(), rows = written, output = %output.display(), "concatenated recoded tables");
    Ok(written)
}
