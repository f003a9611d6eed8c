//! Error types for genepool-evo
//!
//! This module defines all error types used throughout the library.

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::session::RunToken;

/// Error type for the gene codec
///
/// Encoding errors are fatal: a run cannot evolve with a broken codec.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodingError {
    /// A tick index outside `[0, total_ticks]`
    #[error("Tick {tick} out of range for gene '{gene}' (valid: 0..={total_ticks})")]
    TickOutOfRange {
        gene: String,
        tick: i64,
        total_ticks: i64,
    },

    /// An actual value outside the gene's bounds beyond rounding tolerance
    #[error("Value {value} outside [{minimum}, {maximum}] for gene '{gene}'")]
    ValueOutOfRange {
        gene: String,
        value: Decimal,
        minimum: Decimal,
        maximum: Decimal,
    },

    /// Minimum greater than maximum
    #[error("Invalid bounds for gene '{gene}': minimum {minimum} exceeds maximum {maximum}")]
    InvalidBounds {
        gene: String,
        minimum: Decimal,
        maximum: Decimal,
    },

    /// Decimal precision the codec cannot represent
    #[error("Gene '{gene}' requests {decimals} decimals (max {max})")]
    UnsupportedPrecision { gene: String, decimals: u32, max: u32 },

    /// The tick count does not fit the tick integer type
    #[error("Gene '{gene}' has too many ticks to encode")]
    TickOverflow { gene: String },

    /// NaN or infinite host value
    #[error("Gene '{gene}' cannot represent non-finite value {value}")]
    NonFinite { gene: String, value: f64 },

    /// Genome length differs from the gene pool
    #[error("Genome length {actual} does not match gene pool size {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Error type for invalid run or strategy parameters
///
/// Raised at construction time, before any generation runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Inbreeding factor outside `[0, 1]`
    #[error("Inbreeding factor must be in [0, 1], got {0}")]
    InvalidInbreedingFactor(f64),

    /// Distance function selector outside the enumerated set
    #[error("Unknown distance metric selector {0} (expected 0 = Euclidean, 1 = Manhattan)")]
    UnknownDistanceMetric(u8),

    /// A probability-like parameter outside `[0, 1]`
    #[error("{name} must be in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    /// A threshold that is negative, non-finite or otherwise unusable
    #[error("Invalid {name} threshold: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    /// Population size that cannot be evolved
    #[error("Population size must be at least {min}, got {actual}")]
    InvalidPopulationSize { min: usize, actual: usize },

    /// Generation cap of zero
    #[error("Maximum generations must be at least 1")]
    InvalidGenerationCap,

    /// Elite count not smaller than the population
    #[error("Elite count {elite_count} must be smaller than population size {population_size}")]
    InvalidEliteCount {
        elite_count: usize,
        population_size: usize,
    },

    /// Tournament of size zero
    #[error("Tournament size must be at least 1")]
    InvalidTournamentSize,

    /// Gene pool without genes
    #[error("Gene pool is empty")]
    EmptyGenePool,

    /// Host gene identifiers disagree with the gene pool
    #[error("Gene pool does not match host gene identifiers: {0}")]
    GenePoolMismatch(String),

    /// Duplicate gene identifier
    #[error("Duplicate gene identifier '{0}'")]
    DuplicateGene(String),

    /// Required builder component missing
    #[error("{0} must be specified")]
    Missing(&'static str),

    /// Settings document could not be parsed
    #[error("Failed to parse settings: {0}")]
    Parse(String),
}

/// A callback arrived for a run that has been superseded
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Stale run: callback for {actual} while {expected} is active")]
pub struct StaleRunError {
    /// The currently active run
    pub expected: RunToken,
    /// The run the callback belongs to
    pub actual: RunToken,
}

/// Error type for host fitness evaluation
///
/// Recoverable per individual: the individual receives the sentinel
/// worst fitness and the generation completes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    /// The host reported a failure
    #[error("Fitness evaluation failed: {0}")]
    Failed(String),

    /// The host did not answer in time
    #[error("Fitness evaluation timed out after {0:?}")]
    Timeout(Duration),

    /// The host side of the bridge went away
    #[error("Host bridge closed")]
    BridgeClosed,

    /// The host returned NaN or an infinity
    #[error("Fitness evaluation returned non-finite value {0}")]
    NonFinite(f64),

    /// The genome could not be decoded for the host
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The run was superseded while the evaluation was outstanding
    #[error(transparent)]
    Superseded(#[from] StaleRunError),
}

impl EvaluationError {
    /// Whether this error means the whole run must be abandoned
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded(_))
    }

    /// Whether this error aborts the run instead of degrading one individual
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Superseded(_) | Self::Encoding(_))
    }
}

/// Error type for genetic operator failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperatorError {
    /// Pairing could not produce parents
    #[error("Pairing failed: {0}")]
    PairingFailed(String),

    /// Crossover operation failed
    #[error("Crossover failed: {0}")]
    CrossoverFailed(String),

    /// Selection operation failed
    #[error("Selection failed: {0}")]
    SelectionFailed(String),
}

/// Error type for result reporting
///
/// Never fatal to a run; callers log and move on.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("Endpoint returned status {0}")]
    Status(u16),
}

/// Error type for observer snapshot persistence
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot version is not supported
    #[error("Snapshot version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Top-level error type for evolution operations
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Gene codec error
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Operator error
    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),

    /// The run was superseded
    #[error(transparent)]
    StaleRun(#[from] StaleRunError),

    /// Snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Observer history would be appended out of order
    #[error("Generation {found} appended out of order (expected {expected})")]
    HistoryOrder { expected: usize, found: usize },

    /// A generation with unevaluated individuals
    #[error("Generation {generation} has {unevaluated} unevaluated individuals")]
    IncompleteGeneration {
        generation: usize,
        unevaluated: usize,
    },

    /// Empty population
    #[error("Empty population")]
    EmptyPopulation,

    /// The run hit a fatal error and cannot continue
    #[error("Run aborted: {0}")]
    Aborted(String),
}

/// Result type alias for evolution operations
pub type EvoResult<T> = Result<T, EvolutionError>;

/// Result type alias for operator operations
pub type OperatorResult<T> = Result<T, OperatorError>;
