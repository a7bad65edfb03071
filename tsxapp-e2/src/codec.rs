//! E2SM-MHO message encoding/decoding
//!
//! Compact big-endian layout, one format byte in front of every message:
//!
//! ```text
//! CGI          kind(1) | PLMN(3) | bit_len(1) | bit string(ceil(bit_len/8))
//! UE id        tag(1)  | id (8, 4, 2 or 8 bytes by tag)
//! header       fmt=1   | CGI
//! meas report  fmt=1   | UE id | count(2) | { CGI | rsrp(4) | has_5qi(1) | [5qi(1)] }*
//! rrc status   fmt=2   | UE id | status(1)
//! trigger      type(1) | reporting period ms(4)
//! ctrl header  fmt=1   | CGI | priority(1)
//! ctrl message fmt=1   | serving CGI | UE id | target CGI
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tsxapp_common::{bit_string_to_u64, byte_len, u64_to_bit_string, IdentifierError, Plmn};

use crate::protocol::{
    CellIdentity, Cgi, ControlHeader, EventTrigger, HandoverControl, IndicationHeader,
    IndicationMessage, MeasReportItem, MeasurementReport, RrcStatus, RrcStatusReport, TriggerType,
    UeIdentity, ECI_BITS,
};

const FORMAT_1: u8 = 1;
const FORMAT_2: u8 = 2;

const CELL_KIND_NR: u8 = 1;
const CELL_KIND_EUTRA: u8 = 2;

/// Errors that can occur during E2SM-MHO encoding/decoding
#[derive(Debug, Error, PartialEq, Eq)]
pub enum E2CodecError {
    /// Buffer too short
    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort {
        /// Number of bytes needed
        needed: usize,
        /// Number of bytes available
        available: usize,
    },

    /// Unknown message format
    #[error("unknown message format: {0}")]
    UnknownFormat(u8),

    /// Unknown cell identity kind
    #[error("unknown cell identity kind: {0}")]
    UnknownCellKind(u8),

    /// Unknown UE identity type
    #[error("unknown UE id type: {0}")]
    UnknownUeIdType(u8),

    /// Unknown RRC status
    #[error("unknown RRC status: {0}")]
    UnknownRrcStatus(u8),

    /// Unknown trigger type
    #[error("unknown trigger type: {0}")]
    UnknownTriggerType(u8),

    /// Bytes left over after a complete message
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// Too many measurement items for the count field
    #[error("measurement report has {0} items, at most 65535 allowed")]
    TooManyItems(usize),

    /// Malformed cell or PLMN identity
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Result type for E2SM-MHO codec operations
pub type Result<T> = std::result::Result<T, E2CodecError>;

fn need(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(E2CodecError::BufferTooShort {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn finish(buf: &[u8]) -> Result<()> {
    if !buf.is_empty() {
        return Err(E2CodecError::TrailingBytes(buf.len()));
    }
    Ok(())
}

fn expect_format(buf: &mut &[u8], allowed: &[u8]) -> Result<u8> {
    need(buf, 1)?;
    let format = buf.get_u8();
    if !allowed.contains(&format) {
        return Err(E2CodecError::UnknownFormat(format));
    }
    Ok(format)
}

fn put_cgi(buf: &mut BytesMut, cgi: &Cgi) -> Result<()> {
    let kind = match cgi.cell {
        CellIdentity::Nr(_) => CELL_KIND_NR,
        CellIdentity::Eutra(_) => CELL_KIND_EUTRA,
    };
    let bit_len = cgi.cell.bit_len();
    let bits = u64_to_bit_string(cgi.cell.value(), bit_len)?;
    buf.put_u8(kind);
    buf.put_slice(&cgi.plmn.encode());
    buf.put_u8(bit_len as u8);
    buf.put_slice(&bits);
    Ok(())
}

fn get_cgi(buf: &mut &[u8]) -> Result<Cgi> {
    need(buf, 5)?;
    let kind = buf.get_u8();
    let mut plmn = [0u8; 3];
    buf.copy_to_slice(&mut plmn);
    let bit_len = usize::from(buf.get_u8());

    let expected_bits = match kind {
        CELL_KIND_NR => tsxapp_common::NCI_BITS,
        CELL_KIND_EUTRA => ECI_BITS,
        other => return Err(E2CodecError::UnknownCellKind(other)),
    };
    if bit_len != expected_bits {
        return Err(IdentifierError::InvalidIdentifier(format!(
            "cell identity kind {kind} must be {expected_bits} bits, got {bit_len}"
        ))
        .into());
    }

    let len = byte_len(bit_len);
    need(buf, len)?;
    let value = bit_string_to_u64(&buf[..len], bit_len)?;
    buf.advance(len);

    let plmn = Plmn::decode(plmn)?;
    Ok(if kind == CELL_KIND_NR {
        Cgi::nr(plmn, value)
    } else {
        Cgi::eutra(plmn, value as u32)
    })
}

fn put_ue_id(buf: &mut BytesMut, ue_id: &UeIdentity) {
    buf.put_u8(ue_id.tag());
    match ue_id {
        UeIdentity::GnbUe { amf_ue_ngap_id } | UeIdentity::NgEnbUe { amf_ue_ngap_id } => {
            buf.put_u64(*amf_ue_ngap_id)
        }
        UeIdentity::EnbUe { mme_ue_s1ap_id } => buf.put_u32(*mme_ue_s1ap_id),
        UeIdentity::EnGnbUe { menb_ue_x2ap_id } => buf.put_u16(*menb_ue_x2ap_id),
    }
}

fn get_ue_id(buf: &mut &[u8]) -> Result<UeIdentity> {
    need(buf, 1)?;
    let tag = buf.get_u8();
    match tag {
        1 | 4 => {
            need(buf, 8)?;
            let amf_ue_ngap_id = buf.get_u64();
            Ok(if tag == 1 {
                UeIdentity::GnbUe { amf_ue_ngap_id }
            } else {
                UeIdentity::NgEnbUe { amf_ue_ngap_id }
            })
        }
        2 => {
            need(buf, 4)?;
            Ok(UeIdentity::EnbUe {
                mme_ue_s1ap_id: buf.get_u32(),
            })
        }
        3 => {
            need(buf, 2)?;
            Ok(UeIdentity::EnGnbUe {
                menb_ue_x2ap_id: buf.get_u16(),
            })
        }
        other => Err(E2CodecError::UnknownUeIdType(other)),
    }
}

/// Encodes an indication header.
pub fn encode_indication_header(header: &IndicationHeader) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u8(FORMAT_1);
    put_cgi(&mut buf, &header.cgi)?;
    Ok(buf.freeze())
}

/// Decodes an indication header.
pub fn decode_indication_header(data: &[u8]) -> Result<IndicationHeader> {
    let mut buf = data;
    expect_format(&mut buf, &[FORMAT_1])?;
    let cgi = get_cgi(&mut buf)?;
    finish(buf)?;
    Ok(IndicationHeader { cgi })
}

/// Encodes an indication message.
pub fn encode_indication_message(msg: &IndicationMessage) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(msg.format());
    match msg {
        IndicationMessage::MeasurementReport(report) => {
            let count = u16::try_from(report.items.len())
                .map_err(|_| E2CodecError::TooManyItems(report.items.len()))?;
            put_ue_id(&mut buf, &report.ue_id);
            buf.put_u16(count);
            for item in &report.items {
                put_cgi(&mut buf, &item.cgi)?;
                buf.put_i32(item.rsrp);
                match item.five_qi {
                    Some(five_qi) => {
                        buf.put_u8(1);
                        buf.put_u8(five_qi);
                    }
                    None => buf.put_u8(0),
                }
            }
        }
        IndicationMessage::RrcStatus(report) => {
            put_ue_id(&mut buf, &report.ue_id);
            buf.put_u8(report.rrc_status as u8);
        }
    }
    Ok(buf.freeze())
}

/// Decodes an indication message.
pub fn decode_indication_message(data: &[u8]) -> Result<IndicationMessage> {
    let mut buf = data;
    let format = expect_format(&mut buf, &[FORMAT_1, FORMAT_2])?;
    let ue_id = get_ue_id(&mut buf)?;

    let msg = if format == FORMAT_1 {
        need(buf, 2)?;
        let count = usize::from(buf.get_u16());
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let cgi = get_cgi(&mut buf)?;
            need(buf, 5)?;
            let rsrp = buf.get_i32();
            let five_qi = match buf.get_u8() {
                0 => None,
                _ => {
                    need(buf, 1)?;
                    Some(buf.get_u8())
                }
            };
            items.push(MeasReportItem { cgi, rsrp, five_qi });
        }
        IndicationMessage::MeasurementReport(MeasurementReport { ue_id, items })
    } else {
        need(buf, 1)?;
        let raw = buf.get_u8();
        let rrc_status = RrcStatus::from_u8(raw).ok_or(E2CodecError::UnknownRrcStatus(raw))?;
        IndicationMessage::RrcStatus(RrcStatusReport { ue_id, rrc_status })
    };

    finish(buf)?;
    Ok(msg)
}

/// Encodes a subscription event trigger.
pub fn encode_event_trigger(trigger: &EventTrigger) -> Bytes {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(trigger.trigger_type as u8);
    buf.put_u32(trigger.reporting_period_ms);
    buf.freeze()
}

/// Decodes a subscription event trigger.
pub fn decode_event_trigger(data: &[u8]) -> Result<EventTrigger> {
    let mut buf = data;
    need(buf, 5)?;
    let raw = buf.get_u8();
    let trigger_type = TriggerType::from_u8(raw).ok_or(E2CodecError::UnknownTriggerType(raw))?;
    let reporting_period_ms = buf.get_u32();
    finish(buf)?;
    Ok(EventTrigger {
        trigger_type,
        reporting_period_ms,
    })
}

/// Encodes a control header.
pub fn encode_control_header(header: &ControlHeader) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u8(FORMAT_1);
    put_cgi(&mut buf, &header.serving_cgi)?;
    buf.put_u8(header.priority);
    Ok(buf.freeze())
}

/// Decodes a control header.
pub fn decode_control_header(data: &[u8]) -> Result<ControlHeader> {
    let mut buf = data;
    expect_format(&mut buf, &[FORMAT_1])?;
    let serving_cgi = get_cgi(&mut buf)?;
    need(buf, 1)?;
    let priority = buf.get_u8();
    finish(buf)?;
    Ok(ControlHeader {
        serving_cgi,
        priority,
    })
}

/// Encodes a handover control message.
pub fn encode_control_message(msg: &HandoverControl) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(40);
    buf.put_u8(FORMAT_1);
    put_cgi(&mut buf, &msg.serving_cgi)?;
    put_ue_id(&mut buf, &msg.ue_id);
    put_cgi(&mut buf, &msg.target_cgi)?;
    Ok(buf.freeze())
}

/// Decodes a handover control message.
pub fn decode_control_message(data: &[u8]) -> Result<HandoverControl> {
    let mut buf = data;
    expect_format(&mut buf, &[FORMAT_1])?;
    let serving_cgi = get_cgi(&mut buf)?;
    let ue_id = get_ue_id(&mut buf)?;
    let target_cgi = get_cgi(&mut buf)?;
    finish(buf)?;
    Ok(HandoverControl {
        serving_cgi,
        ue_id,
        target_cgi,
    })
}
