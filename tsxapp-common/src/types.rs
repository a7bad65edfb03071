//! PLMN identity and the MCC/MNC conventions used by cell identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

/// Public Land Mobile Network identifier.
///
/// MCC is always 3 decimal digits, MNC is 2 or 3 (`long_mnc`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Plmn {
    /// Mobile Country Code (0-999)
    pub mcc: u16,
    /// Mobile Network Code (0-999)
    pub mnc: u16,
    /// True if MNC is 3 digits
    pub long_mnc: bool,
}

impl Plmn {
    /// Creates a new PLMN.
    pub const fn new(mcc: u16, mnc: u16, long_mnc: bool) -> Self {
        Self { mcc, mnc, long_mnc }
    }

    /// Parses the decimal MCC/MNC strings used by A1 policy documents.
    pub fn from_strings(mcc: &str, mnc: &str) -> Result<Self, IdentifierError> {
        let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if mcc.len() != 3 || !digits_only(mcc) {
            return Err(IdentifierError::InvalidIdentifier(format!("MCC '{mcc}'")));
        }
        if !(2..=3).contains(&mnc.len()) || !digits_only(mnc) {
            return Err(IdentifierError::InvalidIdentifier(format!("MNC '{mnc}'")));
        }
        let mcc_value = mcc
            .parse()
            .map_err(|_| IdentifierError::InvalidIdentifier(format!("MCC '{mcc}'")))?;
        let mnc_value = mnc
            .parse()
            .map_err(|_| IdentifierError::InvalidIdentifier(format!("MNC '{mnc}'")))?;
        Ok(Self::new(mcc_value, mnc_value, mnc.len() == 3))
    }

    /// MCC as a 3-digit string.
    pub fn mcc_string(&self) -> String {
        format!("{:03}", self.mcc)
    }

    /// MNC as a 2 or 3 digit string.
    pub fn mnc_string(&self) -> String {
        if self.long_mnc {
            format!("{:03}", self.mnc)
        } else {
            format!("{:02}", self.mnc)
        }
    }

    fn digits(&self) -> [u8; 6] {
        let (mnc1, mnc2, mnc3) = if self.long_mnc {
            (self.mnc / 100 % 10, self.mnc / 10 % 10, self.mnc % 10)
        } else {
            (self.mnc / 10 % 10, self.mnc % 10, 0x0F)
        };
        [
            (self.mcc / 100 % 10) as u8,
            (self.mcc / 10 % 10) as u8,
            (self.mcc % 10) as u8,
            mnc1 as u8,
            mnc2 as u8,
            mnc3 as u8,
        ]
    }

    fn from_digits(d: [u8; 6]) -> Result<Self, IdentifierError> {
        if d[..5].iter().any(|n| *n > 9) || (d[5] > 9 && d[5] != 0x0F) {
            return Err(IdentifierError::InvalidIdentifier(format!(
                "PLMN digits {d:?}"
            )));
        }
        let mcc = u16::from(d[0]) * 100 + u16::from(d[1]) * 10 + u16::from(d[2]);
        let plmn = if d[5] == 0x0F {
            Self::new(mcc, u16::from(d[3]) * 10 + u16::from(d[4]), false)
        } else {
            Self::new(
                mcc,
                u16::from(d[3]) * 100 + u16::from(d[4]) * 10 + u16::from(d[5]),
                true,
            )
        };
        Ok(plmn)
    }

    /// Encodes the PLMN as the three TS 24.008 octets.
    ///
    /// ```text
    /// octet 1: MCC digit 2 | MCC digit 1
    /// octet 2: MNC digit 3 (or F) | MCC digit 3
    /// octet 3: MNC digit 2 | MNC digit 1
    /// ```
    pub fn encode(&self) -> [u8; 3] {
        let d = self.digits();
        [(d[1] << 4) | d[0], (d[5] << 4) | d[2], (d[4] << 4) | d[3]]
    }

    /// Decodes the three TS 24.008 octets, rejecting non-BCD nibbles.
    pub fn decode(bytes: [u8; 3]) -> Result<Self, IdentifierError> {
        Self::from_digits([
            bytes[0] & 0x0F,
            bytes[0] >> 4,
            bytes[1] & 0x0F,
            bytes[2] & 0x0F,
            bytes[2] >> 4,
            bytes[1] >> 4,
        ])
    }
}

impl fmt::Debug for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plmn({}-{})", self.mcc_string(), self.mnc_string())
    }
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mcc_string(), self.mnc_string())
    }
}

/// Convention for folding a PLMN into the 24-bit integer that prefixes a
/// Cell Global Identity.
///
/// * `Bcd`: the TS 24.008 octets read big-endian, e.g. 138/426 -> `0x316824`.
/// * `Direct`: MCC digits then MNC digits as nibbles, a 2-digit MNC padded
///   with `F`, e.g. 138/426 -> `0x138426`, 001/01 -> `0x00101F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlmnEncoding {
    /// Nibble-swapped 3GPP octets
    #[default]
    Bcd,
    /// Plain digit concatenation
    Direct,
}

impl PlmnEncoding {
    /// Folds a PLMN into its 24-bit identifier.
    pub fn plmn_id(self, plmn: &Plmn) -> u32 {
        let octets = match self {
            PlmnEncoding::Bcd => plmn.encode(),
            PlmnEncoding::Direct => {
                let d = plmn.digits();
                [(d[0] << 4) | d[1], (d[2] << 4) | d[3], (d[4] << 4) | d[5]]
            }
        };
        u32::from_be_bytes([0, octets[0], octets[1], octets[2]])
    }

    /// Recovers a PLMN from its 24-bit identifier.
    pub fn plmn(self, plmn_id: u32) -> Result<Plmn, IdentifierError> {
        if plmn_id > 0x00FF_FFFF {
            return Err(IdentifierError::InvalidIdentifier(format!(
                "PLMN id {plmn_id:#x} exceeds 24 bits"
            )));
        }
        let [_, o1, o2, o3] = plmn_id.to_be_bytes();
        match self {
            PlmnEncoding::Bcd => Plmn::decode([o1, o2, o3]),
            PlmnEncoding::Direct => {
                Plmn::from_digits([o1 >> 4, o1 & 0x0F, o2 >> 4, o2 & 0x0F, o3 >> 4, o3 & 0x0F])
            }
        }
    }

    /// Builds the 24-bit identifier from MCC/MNC strings.
    pub fn encode_mcc_mnc(self, mcc: &str, mnc: &str) -> Result<u32, IdentifierError> {
        Ok(self.plmn_id(&Plmn::from_strings(mcc, mnc)?))
    }

    /// Splits a 24-bit identifier into MCC/MNC strings.
    pub fn decode_mcc_mnc(self, plmn_id: u32) -> Result<(String, String), IdentifierError> {
        let plmn = self.plmn(plmn_id)?;
        Ok((plmn.mcc_string(), plmn.mnc_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plmn_encode_2digit_mnc() {
        // MCC=310, MNC=41
        assert_eq!(Plmn::new(310, 41, false).encode(), [0x13, 0xF0, 0x14]);
    }

    #[test]
    fn test_plmn_encode_3digit_mnc() {
        assert_eq!(Plmn::new(138, 426, true).encode(), [0x31, 0x68, 0x24]);
    }

    #[test]
    fn test_plmn_decode_rejects_non_bcd() {
        assert!(Plmn::decode([0x1A, 0xF0, 0x14]).is_err());
        assert_eq!(
            Plmn::decode([0x13, 0xF0, 0x14]).unwrap(),
            Plmn::new(310, 41, false)
        );
    }

    #[test]
    fn test_from_strings() {
        let plmn = Plmn::from_strings("001", "01").unwrap();
        assert_eq!(plmn, Plmn::new(1, 1, false));
        assert_eq!(plmn.mcc_string(), "001");
        assert_eq!(plmn.mnc_string(), "01");
        assert!(Plmn::from_strings("01", "01").is_err());
        assert!(Plmn::from_strings("001", "1").is_err());
        assert!(Plmn::from_strings("00a", "01").is_err());
    }

    #[test]
    fn test_bcd_plmn_id() {
        let id = PlmnEncoding::Bcd.encode_mcc_mnc("138", "426").unwrap();
        assert_eq!(id, 0x316824);
        assert_eq!(
            PlmnEncoding::Bcd.decode_mcc_mnc(id).unwrap(),
            ("138".to_string(), "426".to_string())
        );
    }

    #[test]
    fn test_direct_plmn_id() {
        let id = PlmnEncoding::Direct.encode_mcc_mnc("138", "426").unwrap();
        assert_eq!(id, 0x138426);
        let id = PlmnEncoding::Direct.encode_mcc_mnc("001", "01").unwrap();
        assert_eq!(id, 0x00101F);
        assert_eq!(
            PlmnEncoding::Direct.decode_mcc_mnc(id).unwrap(),
            ("001".to_string(), "01".to_string())
        );
    }

    #[test]
    fn test_conventions_disagree() {
        let plmn = Plmn::new(310, 41, false);
        assert_ne!(
            PlmnEncoding::Bcd.plmn_id(&plmn),
            PlmnEncoding::Direct.plmn_id(&plmn)
        );
    }

    #[test]
    fn test_plmn_id_out_of_range() {
        assert!(PlmnEncoding::Bcd.plmn(0x0100_0000).is_err());
    }

    #[test]
    fn test_plmn_display() {
        assert_eq!(Plmn::new(138, 426, true).to_string(), "138426");
        assert_eq!(format!("{:?}", Plmn::new(1, 1, false)), "Plmn(001-01)");
    }
}
