use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoatError {
    #[error("Invalid image metadata: {0}")]
    InvalidMetadata(String),

    #[error("Raster shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Band {index} requested but image only has {available} bands")]
    MissingBand { index: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid geometry for label {label}: {reason}")]
    InvalidGeometry { label: u32, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, BoatError>;
