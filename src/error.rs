use thiserror::Error;

/// Everything that can go wrong while setting up, running or scoring a
/// simulation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("site table: {0}")]
    Csv(#[from] csv::Error),
    #[error("state file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("raster, line {line}: {message}")]
    Raster { line: usize, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("coordinate ({x}, {y}) lies outside the grid")]
    OutOfBounds { x: f64, y: f64 },
    #[error("layer geometry {found} does not match terrain geometry {expected}")]
    GeometryMismatch { expected: String, found: String },
    #[error("no vegetation layer for label {label}")]
    MissingLayer { label: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
