//! Handing finished files to the operating system's print spooler

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Platforms with a known print command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was built for, if printing is supported there
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Platform::MacOs)
        } else if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else {
            None
        }
    }
}

/// A print command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Build the command that prints `path` on `platform`
///
/// Without a printer name the system default printer is used.
pub fn print_command(platform: Platform, path: &Path, printer: Option<&str>) -> PrintCommand {
    let file = path.display().to_string();
    let (program, args) = match (platform, printer) {
        (Platform::Linux, Some(printer)) => ("lp", vec!["-d".to_string(), printer.to_string(), file]),
        (Platform::Linux, None) => ("lp", vec![file]),
        (Platform::MacOs, Some(printer)) => ("lpr", vec!["-P".to_string(), printer.to_string(), file]),
        (Platform::MacOs, None) => ("lpr", vec![file]),
        (Platform::Windows, printer) => {
            let mut script = format!("Start-Process -FilePath '{}' -Verb Print", powershell_quote(&file));
            if let Some(printer) = printer {
                script.push_str(&format!(" -ArgumentList '/d:{}'", powershell_quote(printer)));
            }
            ("powershell", vec!["-NoProfile".to_string(), "-Command".to_string(), script])
        }
    };
    PrintCommand { program: program.to_string(), args }
}

/// Escape a value for a single-quoted PowerShell string
fn powershell_quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Send `path` to the printer and wait for the spooler to accept it
pub fn print_file(path: &Path, printer: Option<&str>) -> Result<()> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let platform = Platform::current()
        .ok_or_else(|| Error::Print(format!("printing is not supported on {}", std::env::consts::OS)))?;

    let command = print_command(platform, path, printer);
    log::info!("Printing {} with {}", path.display(), command.program);
    log::debug!("{} {:?}", command.program, command.args);

    let status = Command::new(&command.program)
        .args(&command.args)
        .status()
        .map_err(|e| Error::Print(format!("could not run {}: {}", command.program, e)))?;

    if !status.success() {
        return Err(Error::Print(format!("{} exited with {}", command.program, status)));
    }
    Ok(())
}
