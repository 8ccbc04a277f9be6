//! Result file persistence.
//!
//! Reports are stored as pretty-printed JSON. Writes go through a temporary
//! file that is renamed into place, so a crash never leaves a truncated
//! report behind.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::result::AnalysisReport;

/// Directory used when no output path is given.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// `some/dir/foo.c` becomes `output/foo.json`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("{}.json", stem))
}

/// Save a report, creating parent directories as needed.
pub fn save_result(path: &Path, report: &AnalysisReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;

    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;

    info!("saved result in {}", path.display());
    Ok(())
}

/// Load a report written by [`save_result`].
pub fn load_result(path: &Path) -> Result<AnalysisReport> {
    let file = File::open(path)?;
    let report = serde_json::from_reader(BufReader::new(file))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("c_files/basics/gcd.c")),
            PathBuf::from("output/gcd.json")
        );
    }
}
