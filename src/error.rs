use std::path::PathBuf;

use thiserror::Error;

/// Errors from [`crate::DataFetcher`].
///
/// A failed probe of the primary host is never reported; it only selects the
/// fallback mirror.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid dataset filename {0:?}")]
    InvalidFilename(String),

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("downloading {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cached file is not valid tabular data.
    #[error(transparent)]
    Parse(#[from] anyhow::Error),
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from [`crate::make_mesh`].
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("feature matrix has no rows")]
    EmptyMatrix,

    #[error("mesh needs at least one dimension")]
    ZeroDim,

    #[error("requested {dim} dimensions but the matrix has {columns} columns")]
    DimOutOfRange { dim: usize, columns: usize },

    #[error("step size must be finite and positive, got {0}")]
    InvalidStep(f64),

    #[error("column {0} contains a non-finite value")]
    NonFiniteValue(usize),

    #[error("column {column} spans too many or too few samples at step {step}")]
    UncountableAxis { column: usize, step: f64 },

    #[error("mesh of shape {0:?} is too large")]
    TooLarge(Vec<usize>),

    #[error("reshaping mesh: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
