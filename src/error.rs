use std::path::PathBuf;

/// Failures while reading a USDA export. Any of these is fatal for the dataset
/// family being loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not load file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read CSV '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("unexpected columns in file '{}': column '{column}' not found", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("no {family} dataset directory found under '{}'", .dir.display())]
    MissingDataset { family: String, dir: PathBuf },
}
