//! sc-series: the sample series of one run, its tabular export and chart.

pub mod chart;
pub mod export;
pub mod sample;
pub mod store;

pub use chart::{ChartFrame, ChartView, DEFAULT_PLOT_TITLE};
pub use export::{
    ExportPaths, ILLEGAL_FILENAME_CHARS, export_paths, format_series, validate_base_path,
    write_export,
};
pub use sample::{SEED_SAMPLE, Sample};
pub use store::{SeriesStore, Snapshot};

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("Possible illegal character {character:?} in file name {segment:?}; file is NOT saved")]
    IllegalFilename { segment: String, character: char },

    #[error("Export path has no file name")]
    EmptyPath,

    #[error("Failed to write {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
