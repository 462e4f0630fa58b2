use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown metric '{name}'")]
    UnknownMetric { name: String },

    #[error("Unknown filter dimension '{name}'")]
    UnknownDimension { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration value for {key}: '{value}'")]
    Config { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, DashboardError>;
