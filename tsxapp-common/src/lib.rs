//! Common types and utilities for tsxapp
//!
//! Identifier codecs (PLMN, Cell Global Identity, UE id, bit strings), the
//! configuration model and logging setup shared by every tsxapp crate.

pub mod bits;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod logging;
pub mod types;

pub use bits::{bit_string_to_u64, byte_len, u64_to_bit_string, MAX_BIT_LENGTH};
pub use config::{
    A1Config, EndpointConfig, ServiceModelConfig, SliceConfig, SteeringConfig, XappConfig,
};
pub use error::{Error, IdentifierError};
pub use identifiers::{
    cell_key, decode_cell_global_id, encode_cell_global_id, format_ue_id, parse_ue_id,
    reindex_for_transport, restore_wire_order, CGI_HEX_LEN, NCI_BITS, NCI_MASK, UE_ID_LEN,
};
pub use logging::{
    init_logging, init_logging_with_filter, log_a1_message, log_e2_message, log_protocol_message,
    Direction, HexDump, LogLevel,
};
pub use types::{Plmn, PlmnEncoding};
