use anyhow::Result;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use isa::validator::validate;

/// Validate a tabular directory or a JSON document
pub fn run(path: PathBuf) -> Result<ExitCode> {
    info!("ISA Validator");
    info!("=============");
    info!("Path: {}", path.display());

    let report = validate(&path)?;

    // Use colorized output if available
    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }

    if report.has_fatal() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
