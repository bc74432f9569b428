//! Configuration errors.
//!
//! The simulation itself never fails once running; the only fatal condition is
//! a configuration that the index math cannot work with, rejected at reset.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{field} must be at least 1")]
    ZeroIterations { field: &'static str },
    #[error("grid resolution {0}x{1}x{2} has no cells")]
    EmptyGrid(u32, u32, u32),
    #[error("no spawn regions configured")]
    NoSpawnRegions,
    #[error("foam is enabled but the foam capacity is zero")]
    FoamCapacity,
    #[error("{what} would need {count} elements, more than the limit of {max}")]
    TooLarge {
        what: &'static str,
        count: u64,
        max: u64,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
