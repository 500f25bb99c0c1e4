use std::io::{Read, Write};
use std::path::Path;
use std::{fs, io};

use anyhow::{Context, Result};

pub(super) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub(super) fn print_error_payload(err: &ohanami_core::OhanamiError, operation: &str) -> Result<()> {
    let mut stderr = io::stderr().lock();
    serde_json::to_writer_pretty(&mut stderr, &err.to_payload(operation))?;
    writeln!(stderr)?;
    Ok(())
}

pub(super) fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read report from stdin")?;
        return Ok(raw);
    }
    let path = Path::new(input);
    fs::read_to_string(path).with_context(|| format!("failed to read report {}", path.display()))
}
