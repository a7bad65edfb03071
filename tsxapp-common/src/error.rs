//! Error types for tsxapp

use thiserror::Error;

/// Failure to interpret a cell, PLMN or UE identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Generic malformed identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Value does not fit in the declared bit count.
    #[error("invalid identifier: value {value:#x} exceeds {bit_len} bits")]
    ValueTooLarge {
        /// Offending value
        value: u64,
        /// Declared number of bits
        bit_len: usize,
    },
}

/// Error types for the tsxapp library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identifier codec errors.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// I/O errors (configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}
