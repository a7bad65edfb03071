//! Test fixtures: configurations, encoded indications and policy requests.

use bytes::Bytes;
use tsxapp::RawIndication;
use tsxapp_a1::{Header, PolicyRequestMessage, PolicyType, RequestMessage};
use tsxapp_common::{Plmn, XappConfig};
use tsxapp_e2::codec;
use tsxapp_e2::{
    Cgi, IndicationHeader, IndicationMessage, MeasReportItem, MeasurementReport, RrcStatus,
    RrcStatusReport, UeIdentity,
};

/// PLMN used by every fixture cell.
pub const TEST_PLMN: Plmn = Plmn::new(138, 426, true);

/// Default E2 node id.
pub const TEST_NODE: &str = "e2:4/1";

/// NR cell under the test PLMN.
pub fn nr_cell(nci: u64) -> Cgi {
    Cgi::nr(TEST_PLMN, nci)
}

/// UE identity of a gNB-attached UE.
pub fn gnb_ue(id: u64) -> UeIdentity {
    UeIdentity::GnbUe { amf_ue_ngap_id: id }
}

/// Configuration with fast steering and no start delay.
pub fn fast_config() -> XappConfig {
    let mut config = XappConfig::default();
    config.steering.interval_ms = 50;
    config.steering.start_delay_ms = 0;
    config.display_interval_ms = 60_000;
    config.a1.ack_timeout_ms = 200;
    config
}

/// Builder for measurement report indications.
#[derive(Debug, Clone)]
pub struct MeasReportBuilder {
    ue: UeIdentity,
    serving: Cgi,
    items: Vec<MeasReportItem>,
}

impl MeasReportBuilder {
    /// Report from `ue` served by `serving`.
    pub fn new(ue: UeIdentity, serving: Cgi) -> Self {
        Self {
            ue,
            serving,
            items: Vec::new(),
        }
    }

    /// Adds the serving cell measurement with its 5QI.
    pub fn serving(mut self, rsrp: i32, five_qi: u8) -> Self {
        self.items.push(MeasReportItem {
            cgi: self.serving,
            rsrp,
            five_qi: Some(five_qi),
        });
        self
    }

    /// Adds a neighbor measurement.
    pub fn neighbor(mut self, cgi: Cgi, rsrp: i32) -> Self {
        self.items.push(MeasReportItem {
            cgi,
            rsrp,
            five_qi: None,
        });
        self
    }

    /// Encodes the indication.
    pub fn build(self) -> RawIndication {
        let message = IndicationMessage::MeasurementReport(MeasurementReport {
            ue_id: self.ue,
            items: self.items,
        });
        encode(self.serving, &message)
    }
}

/// RRC state change indication.
pub fn rrc_status_indication(ue: UeIdentity, serving: Cgi, rrc_status: RrcStatus) -> RawIndication {
    encode(
        serving,
        &IndicationMessage::RrcStatus(RrcStatusReport {
            ue_id: ue,
            rrc_status,
        }),
    )
}

fn encode(serving: Cgi, message: &IndicationMessage) -> RawIndication {
    RawIndication {
        header: codec::encode_indication_header(&IndicationHeader { cgi: serving })
            .expect("Failed to encode indication header"),
        payload: codec::encode_indication_message(message)
            .expect("Failed to encode indication message"),
    }
}

/// Policy scoped to one UE preferring `prefer` and forbidding `forbid`.
pub fn ue_policy(ue_id: &str, prefer: &[u64], forbid: &[u64]) -> String {
    let cells = |ncis: &[u64]| {
        ncis.iter()
            .map(|nci| {
                format!(
                    r#"{{"plmnId": {{"mcc": "138", "mnc": "426"}}, "cId": {{"ncI": {nci}}}}}"#
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut resources = Vec::new();
    if !prefer.is_empty() {
        resources.push(format!(
            r#"{{"cellIdList": [{}], "preference": "PREFER"}}"#,
            cells(prefer)
        ));
    }
    if !forbid.is_empty() {
        resources.push(format!(
            r#"{{"cellIdList": [{}], "preference": "FORBID"}}"#,
            cells(forbid)
        ));
    }
    format!(
        r#"{{"scope": {{"ueId": "{ue_id}"}}, "tspResources": [{}]}}"#,
        resources.join(", ")
    )
}

/// A1 request for `policy_id` carrying `document`.
pub fn policy_request(
    config: &XappConfig,
    policy_id: &str,
    document: impl Into<Bytes>,
) -> PolicyRequestMessage {
    PolicyRequestMessage {
        policy_id: policy_id.to_string(),
        policy_type: PolicyType::new(config.a1.policy_type_id()),
        message: RequestMessage {
            header: Header {
                request_id: format!("req-{policy_id}"),
                app_id: config.app_id.clone(),
                ..Default::default()
            },
            payload: document.into(),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meas_report_builder_decodes() {
        let raw = MeasReportBuilder::new(gnb_ue(7), nr_cell(39))
            .serving(-80, 9)
            .neighbor(nr_cell(40), -95)
            .build();

        let header = codec::decode_indication_header(&raw.header).unwrap();
        assert_eq!(header.cgi, nr_cell(39));
        let IndicationMessage::MeasurementReport(report) =
            codec::decode_indication_message(&raw.payload).unwrap()
        else {
            panic!("expected measurement report");
        };
        assert_eq!(report.ue_id, gnb_ue(7));
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn test_ue_policy_document() {
        let doc = ue_policy("0000000000000001", &[39], &[81, 82]);
        assert!(doc.contains(r#""preference": "PREFER""#));
        assert!(doc.contains(r#""ncI": 82"#));
    }
}
