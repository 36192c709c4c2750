use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] simd_json::Error),
    #[error("expected a GeoJSON FeatureCollection, found a {0}")]
    NotFeatureCollection(&'static str),
    #[error("feature {feature}: missing required property {column:?}")]
    MissingProperty { feature: usize, column: &'static str },
    #[error("feature {feature}: position ({lon}, {lat}) is not a longitude/latitude pair")]
    CoordinateOutOfRange { feature: usize, lon: f64, lat: f64 },
    #[error("{location}: {column:?} holds {value:?}, which is not a number")]
    InvalidNumber {
        location: String,
        column: String,
        value: String,
    },
    #[error("attribute table line {line}: {reason}")]
    Attributes { line: usize, reason: String },
    #[error("unknown taxonomy {0:?} (expected `risk-categories` or `detailed-risk-categories`)")]
    UnknownTaxonomy(String),
}

impl DashboardError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
