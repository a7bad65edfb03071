//! Mobile handover state: UE and cell records built from E2 indications.

pub mod controller;
pub mod data;
pub mod task;

pub use controller::{serving_five_qi, slice_from_config, MhoController, MhoError};
pub use data::{CellData, RrcState, UeData, UNKNOWN_FIVE_QI};
pub use task::MhoTask;
