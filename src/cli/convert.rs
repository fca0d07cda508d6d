use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use isa::{isajson, isatab};

use super::config::Config;

/// Convert a tabular directory to a JSON document
///
/// The document goes to `output`, or to standard output when none is given.
pub fn tabular_to_document(
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input.display());
    }
    let config = Config::load(config.as_deref())?;

    info!("ISA Converter - tabular to document");
    info!("===================================");
    info!("Input:  {}", input.display());
    match &output {
        Some(output) => info!("Output: {}", output.display()),
        None => info!("Output: <stdout>"),
    }

    let investigation = isatab::load(&input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    match output {
        Some(output) => {
            let file = File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let mut writer = BufWriter::new(file);
            isajson::dump(&investigation, &mut writer, &config.document)
                .context("Conversion failed")?;
            writer.flush()?;
            report_size(&output);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            isajson::dump(&investigation, &mut writer, &config.document)
                .context("Conversion failed")?;
            writer.flush()?;
        }
    }

    info!("Conversion complete!");
    info!("  Studies converted: {}", investigation.studies.len());
    info!(
        "  Assays converted: {}",
        investigation.studies.iter().map(|s| s.assays.len()).sum::<usize>()
    );
    Ok(())
}

/// Convert a JSON document to a tabular directory
pub fn document_to_tabular(input: PathBuf, output: PathBuf, config: Option<PathBuf>) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    let config = Config::load(config.as_deref())?;

    info!("ISA Converter - document to tabular");
    info!("===================================");
    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());
    info!("Max paths per table: {}", config.tabular.max_paths);

    let file =
        File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
    let investigation = isajson::load(BufReader::new(file))
        .with_context(|| format!("Failed to load {}", input.display()))?;

    isatab::dump(&investigation, &output, &config.tabular).context("Conversion failed")?;

    info!("Conversion complete!");
    info!("  Studies converted: {}", investigation.studies.len());
    info!("  Files written to {}", output.display());
    Ok(())
}

fn report_size(path: &Path) {
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    info!(
        "  Output file size: {} bytes ({:.2} KB)",
        file_size,
        file_size as f64 / 1024.0
    );
}
