//! Two-column text export.
//!
//! A run is saved as `<base>.txt` (one `elapsed\tmass` line per sample, no
//! header) with the chart image next to it as `<base>.svg`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::chart::ChartFrame;
use crate::sample::Sample;
use crate::{ExportError, ExportResult};

/// Characters refused in the final path segment.
pub const ILLEGAL_FILENAME_CHARS: &[char] = &[
    '#', '%', '&', '{', '}', '\\', '<', '>', '.', '?', '$', '!', ' ', '\'', '"', ':', '@',
];

/// Format samples as tab-separated lines.
///
/// Times always carry a fractional part (`1.0`); masses use the shortest
/// form that round-trips (`0`, `0.05`).
pub fn format_series(samples: &[Sample]) -> String {
    let mut out = String::with_capacity(samples.len() * 16);
    for s in samples {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{:?}\t{}", s.elapsed_seconds, s.mass_grams);
    }
    out
}

/// Reject a base path whose file name contains an illegal character.
pub fn validate_base_path(base: &Path) -> ExportResult<()> {
    let segment = base
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or(ExportError::EmptyPath)?;

    if let Some(character) = segment.chars().find(|c| ILLEGAL_FILENAME_CHARS.contains(c)) {
        return Err(ExportError::IllegalFilename { segment, character });
    }
    Ok(())
}

/// Files written for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub data: PathBuf,
    pub chart: PathBuf,
}

pub fn export_paths(base: &Path) -> ExportResult<ExportPaths> {
    validate_base_path(base)?;
    Ok(ExportPaths {
        data: base.with_extension("txt"),
        chart: base.with_extension("svg"),
    })
}

/// Validate the base path, then write the data file and the chart image.
///
/// Nothing is written when validation fails. The data file goes first, so
/// a failed data write never leaves a chart behind.
pub fn write_export(
    base: &Path,
    samples: &[Sample],
    chart: &ChartFrame,
) -> ExportResult<ExportPaths> {
    let paths = export_paths(base)?;

    write_file(&paths.data, &format_series(samples))?;
    write_file(&paths.chart, &chart.to_svg())?;

    info!(
        data = %paths.data.display(),
        chart = %paths.chart.display(),
        samples = samples.len(),
        "series exported"
    );
    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> ExportResult<()> {
    fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
