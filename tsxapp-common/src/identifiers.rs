//! Cell Global Identity and UE identity string forms.
//!
//! A CGI string is the 60-bit value `plmn_id << 36 | nci` rendered as 15
//! lowercase hex digits. The first 6 digits carry the PLMN, the last 9 the
//! NR cell identity:
//!
//! ```text
//!   wire order      P P P P P P n0 n1 n2 n3 n4 n5 n6 n7 n8
//!   topology order  P P P P P P n8 n6 n7 n4 n5 n2 n3 n0 n1
//! ```
//!
//! The topology directory keys cells by the reordered form. Conversion
//! happens once, when decoded indication identities become store keys;
//! control encoding works from the structured identity and never re-reads
//! a key string.

use crate::error::IdentifierError;

/// Bits in an NR cell identity.
pub const NCI_BITS: usize = 36;

/// Mask selecting the NCI part of a CGI value.
pub const NCI_MASK: u64 = (1 << NCI_BITS) - 1;

/// Width of a normalized CGI string.
pub const CGI_HEX_LEN: usize = 15;

/// Width of a normalized UE identity string.
pub const UE_ID_LEN: usize = 16;

/// Packs a PLMN identifier and NCI into a normalized CGI string.
pub fn encode_cell_global_id(plmn_id: u32, nci: u64) -> String {
    let value = (u64::from(plmn_id & 0x00FF_FFFF) << NCI_BITS) | (nci & NCI_MASK);
    format!("{value:0width$x}", width = CGI_HEX_LEN)
}

/// Splits a normalized CGI string back into its PLMN identifier and NCI.
pub fn decode_cell_global_id(cgi: &str) -> Result<(u32, u64), IdentifierError> {
    check_cgi(cgi)?;
    let value = u64::from_str_radix(cgi, 16)
        .map_err(|e| IdentifierError::InvalidIdentifier(format!("CGI '{cgi}': {e}")))?;
    Ok(((value >> NCI_BITS) as u32, value & NCI_MASK))
}

fn check_cgi(cgi: &str) -> Result<(), IdentifierError> {
    if cgi.len() != CGI_HEX_LEN || !cgi.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IdentifierError::InvalidIdentifier(format!(
            "CGI '{cgi}' is not {CGI_HEX_LEN} hex digits"
        )));
    }
    Ok(())
}

// Callers guarantee `c` is 15 ASCII hex digits.
fn to_topology_order(c: &str) -> String {
    [&c[0..6], &c[14..15], &c[12..14], &c[10..12], &c[8..10], &c[6..8]].concat()
}

fn to_wire_order(t: &str) -> String {
    [&t[0..6], &t[13..15], &t[11..13], &t[9..11], &t[7..9], &t[6..7]].concat()
}

/// Converts a wire-order CGI into topology order when `topo_ids_enabled`.
pub fn reindex_for_transport(cgi: &str, topo_ids_enabled: bool) -> Result<String, IdentifierError> {
    check_cgi(cgi)?;
    if !topo_ids_enabled {
        return Ok(cgi.to_string());
    }
    Ok(to_topology_order(cgi))
}

/// Inverse of [`reindex_for_transport`].
pub fn restore_wire_order(cgi: &str, topo_ids_enabled: bool) -> Result<String, IdentifierError> {
    check_cgi(cgi)?;
    if !topo_ids_enabled {
        return Ok(cgi.to_string());
    }
    Ok(to_wire_order(cgi))
}

/// Encodes and reindexes in one step: the store key for a decoded cell.
pub fn cell_key(plmn_id: u32, nci: u64, topo_ids_enabled: bool) -> String {
    let cgi = encode_cell_global_id(plmn_id, nci);
    if topo_ids_enabled {
        to_topology_order(&cgi)
    } else {
        cgi
    }
}

/// Renders a numeric UE identity as the fixed-width store key.
pub fn format_ue_id(ue_id: u64) -> String {
    format!("{ue_id:0width$}", width = UE_ID_LEN)
}

/// Parses a store-key UE identity back to its number.
pub fn parse_ue_id(ue_id: &str) -> Result<u64, IdentifierError> {
    if ue_id.is_empty() || !ue_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentifierError::InvalidIdentifier(format!("UE id '{ue_id}'")));
    }
    ue_id
        .parse()
        .map_err(|_| IdentifierError::InvalidIdentifier(format!("UE id '{ue_id}'")))
}
