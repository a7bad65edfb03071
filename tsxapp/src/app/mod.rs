//! xApp application layer.
//!
//! - configuration loading and validation
//! - periodic state display
//! - component wiring and task lifecycle

mod config_loader;
mod display;
mod manager;

pub use config_loader::{
    load_and_validate_config, load_config, load_config_from_str, validate_config, ConfigError,
    ConfigValidationError,
};

pub use display::{CellRow, DisplayContext, DisplayTask, StateSnapshot, TopologyCellRow, UeRow};

pub use manager::XappManager;
