//! Output files: writing, verification and the results directory

use crate::error::{PredictorError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Write `df` as CSV with a header row, replacing any existing file
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    debug!(path = %path.display(), rows = df.height(), "Wrote CSV");
    Ok(())
}

/// Fail unless `path` is an existing, non-empty file
pub fn verify_artifact(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(PredictorError::ArtifactMissing(path.to_path_buf())),
    }
}

/// Create `dir` if needed and prove it accepts new files
pub fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    let marker = dir.join(".write_check");
    File::create(&marker).map_err(|e| {
        PredictorError::ConfigError(format!(
            "results directory {} is not writable: {}",
            dir.display(),
            e
        ))
    })?;
    fs::remove_file(&marker)?;
    Ok(())
}
