//! Indication processing state machine.
//!
//! Every indication runs the same prelude under the ingestion lock:
//!
//! ```text
//!   UE unknown                ──► create, attach to serving cell
//!   UE known, same cell       ──► continue
//!   UE known, other cell      ──► discard (only the node of origin is kept)
//!   UE idle, RRC report       ──► continue on the reported cell
//! ```
//!
//! then the trigger-specific handler:
//!
//! - periodic report: update measurements unless RSRP is unchanged
//! - measurement report: update measurements
//! - RRC status change: CONNECTED→IDLE detaches, IDLE→CONNECTED re-attaches
//!
//! Handovers decided by steering go through [`MhoController::move_ue`],
//! which takes the same lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use tsxapp_a1::{PlmnId, SliceId};
use tsxapp_common::{format_ue_id, log_e2_message, Direction, PlmnEncoding, SliceConfig};
use tsxapp_e2::codec::{self, E2CodecError};
use tsxapp_e2::{
    Cgi, E2Indication, IndicationMessage, MeasReportItem, MeasurementReport, RrcStatus,
    RrcStatusReport, TriggerType, UeIdentity,
};

use super::data::{CellData, RrcState, UeData, UNKNOWN_FIVE_QI};
use crate::store::{Store, StoreError};

/// 5QI codes above this value map to QoS class 2.
const FIVE_QI_CLASS_THRESHOLD: u8 = 127;

/// Errors raised while handling an indication.
#[derive(Debug, Error)]
pub enum MhoError {
    /// Header or payload could not be decoded
    #[error("undecodable indication: {0}")]
    Decode(#[from] E2CodecError),

    /// Store integrity fault
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Measurement report delivered under the RRC status trigger
    #[error("measurement report received on {0} subscription")]
    UnexpectedTrigger(TriggerType),
}

/// Measurements extracted from one report.
#[derive(Debug, Default)]
struct Measurements {
    rsrp_serving: i32,
    rsrp_neighbors: BTreeMap<String, i32>,
    rsrp_table: BTreeMap<String, i32>,
    cgi_table: BTreeMap<String, Cgi>,
}

/// Outcome of the shared prelude.
struct Admitted {
    ue: UeData,
    cgi_key: String,
    is_new: bool,
}

/// Owns UE and cell state and applies indications to it.
pub struct MhoController {
    ues: Arc<Store<UeData>>,
    cells: Arc<Store<CellData>>,
    ingest_lock: Mutex<()>,
    plmn_encoding: PlmnEncoding,
    topo_ids_enabled: bool,
    default_slice: SliceId,
}

impl MhoController {
    /// Creates a controller with empty stores.
    pub fn new(plmn_encoding: PlmnEncoding, topo_ids_enabled: bool, slice: &SliceConfig) -> Self {
        Self {
            ues: Arc::new(Store::new()),
            cells: Arc::new(Store::new()),
            ingest_lock: Mutex::new(()),
            plmn_encoding,
            topo_ids_enabled,
            default_slice: slice_from_config(slice),
        }
    }

    /// UE store.
    pub fn ues(&self) -> &Arc<Store<UeData>> {
        &self.ues
    }

    /// Cell store.
    pub fn cells(&self) -> &Arc<Store<CellData>> {
        &self.cells
    }

    /// Store key of a cell under the configured conventions.
    pub fn cell_key(&self, cgi: &Cgi) -> String {
        cgi.key(self.plmn_encoding, self.topo_ids_enabled)
    }

    /// Decodes an indication and applies it.
    pub async fn handle_indication(&self, indication: &E2Indication) -> Result<(), MhoError> {
        log_e2_message(Direction::Rx, "Indication", &indication.payload);
        let header = codec::decode_indication_header(&indication.header)?;
        let message = codec::decode_indication_message(&indication.payload)?;
        let node_id = indication.node_id.as_str();

        match (message, indication.trigger) {
            (IndicationMessage::MeasurementReport(report), TriggerType::Periodic) => {
                self.handle_periodic_report(&header.cgi, &report, node_id).await
            }
            (IndicationMessage::MeasurementReport(report), TriggerType::UponRcvMeasReport) => {
                self.handle_meas_report(&header.cgi, &report, node_id).await
            }
            (IndicationMessage::MeasurementReport(_), trigger) => {
                Err(MhoError::UnexpectedTrigger(trigger))
            }
            (IndicationMessage::RrcStatus(report), _) => {
                self.handle_rrc_state(&header.cgi, &report, node_id).await
            }
        }
    }

    /// Applies a periodic measurement report.
    pub async fn handle_periodic_report(
        &self,
        serving: &Cgi,
        report: &MeasurementReport,
        node_id: &str,
    ) -> Result<(), MhoError> {
        let _guard = self.ingest_lock.lock().await;
        let Some(Admitted { mut ue, is_new, .. }) =
            self.admit(report.ue_id, serving, node_id, false)?
        else {
            return Ok(());
        };

        let measurements = self.measurements(serving, &report.items)?;
        let five_qi = serving_five_qi(serving, &report.items);

        if !is_new
            && measurements.rsrp_serving == ue.rsrp_serving
            && measurements.rsrp_neighbors == ue.rsrp_neighbors
        {
            trace!(ue_id = %ue.ue_id, "Periodic report unchanged");
            return Ok(());
        }

        self.update_five_qi(&mut ue, five_qi);
        apply_measurements(&mut ue, measurements);
        self.ues.put(&ue.ue_id.clone(), ue)?;
        Ok(())
    }

    /// Applies an event-triggered measurement report.
    pub async fn handle_meas_report(
        &self,
        serving: &Cgi,
        report: &MeasurementReport,
        node_id: &str,
    ) -> Result<(), MhoError> {
        let _guard = self.ingest_lock.lock().await;
        let Some(Admitted { mut ue, .. }) = self.admit(report.ue_id, serving, node_id, false)?
        else {
            return Ok(());
        };

        let measurements = self.measurements(serving, &report.items)?;
        let five_qi = serving_five_qi(serving, &report.items);
        self.update_five_qi(&mut ue, five_qi);
        apply_measurements(&mut ue, measurements);
        self.ues.put(&ue.ue_id.clone(), ue)?;
        Ok(())
    }

    /// Applies an RRC status change.
    pub async fn handle_rrc_state(
        &self,
        serving: &Cgi,
        report: &RrcStatusReport,
        node_id: &str,
    ) -> Result<(), MhoError> {
        let _guard = self.ingest_lock.lock().await;
        let Some(Admitted {
            mut ue, cgi_key, ..
        }) = self.admit(report.ue_id, serving, node_id, true)?
        else {
            return Ok(());
        };

        match (ue.rrc_status, report.rrc_status) {
            (RrcStatus::Connected, RrcStatus::Idle) => {
                ue.state = RrcState::Idle;
                self.detach_ue(&ue.ue_id)?;
                info!(ue_id = %ue.ue_id, cell = %cgi_key, "UE went idle");
            }
            (RrcStatus::Idle, RrcStatus::Connected) => {
                ue.state = RrcState::Connected;
                self.attach_ue(&mut ue, &cgi_key, *serving)?;
                info!(ue_id = %ue.ue_id, cell = %cgi_key, "UE reconnected");
            }
            _ => {}
        }
        ue.rrc_status = report.rrc_status;
        self.ues.put(&ue.ue_id.clone(), ue)?;
        Ok(())
    }

    /// Hands a UE over from `source` to `target` under the ingestion lock.
    ///
    /// Bumps the handover counters of both cells and re-attaches the UE.
    /// Returns `None` without writing when the UE is gone or no longer
    /// served by `source`.
    pub async fn move_ue(
        &self,
        ue_id: &str,
        source: &str,
        target: &str,
        target_cgi: Cgi,
    ) -> Result<Option<UeData>, StoreError> {
        let _guard = self.ingest_lock.lock().await;
        let Some(mut ue) = self.ues.value(ue_id)? else {
            return Ok(None);
        };
        if ue.cgi_string != source {
            debug!(ue_id, source, serving = %ue.cgi_string, "UE left source cell before handover");
            return Ok(None);
        }

        let mut target_cell = self
            .cells
            .value(target)?
            .unwrap_or_else(|| CellData::new(target, target_cgi));
        target_cell.handovers_in += 1;
        self.cells.put(target, target_cell)?;
        if let Some(mut source_cell) = self.cells.value(source)? {
            source_cell.handovers_out += 1;
            self.cells.put(source, source_cell)?;
        }

        ue.state = RrcState::Connected;
        self.attach_ue(&mut ue, target, target_cgi)?;
        Ok(Some(ue))
    }

    /// Moves a UE to `cgi_key`: detaches it everywhere, records the new
    /// serving cell and adds it to that cell, creating the cell if needed.
    /// Callers hold the ingestion lock.
    fn attach_ue(&self, ue: &mut UeData, cgi_key: &str, cgi: Cgi) -> Result<(), StoreError> {
        self.detach_ue(&ue.ue_id)?;

        ue.cgi_string = cgi_key.to_string();
        ue.cgi = Some(cgi);
        self.ues.put(&ue.ue_id, ue.clone())?;

        let mut cell = self
            .cells
            .value(cgi_key)?
            .unwrap_or_else(|| CellData::new(cgi_key, cgi));
        cell.ues.insert(ue.ue_id.clone());
        self.cells.put(cgi_key, cell)?;
        debug!(ue_id = %ue.ue_id, cell = %cgi_key, "UE attached");
        Ok(())
    }

    /// Removes a UE from every cell membership.
    fn detach_ue(&self, ue_id: &str) -> Result<(), StoreError> {
        for entry in self.cells.entries() {
            let mut cell = entry.value;
            if cell.ues.remove(ue_id) {
                self.cells.put(&entry.key, cell)?;
            }
        }
        Ok(())
    }

    /// Shared prelude. `rrc_report` lets an idle UE through from any cell so
    /// it can reconnect where it reappears.
    fn admit(
        &self,
        identity: UeIdentity,
        serving: &Cgi,
        node_id: &str,
        rrc_report: bool,
    ) -> Result<Option<Admitted>, StoreError> {
        let ue_id = format_ue_id(identity.numeric_id());
        let cgi_key = self.cell_key(serving);

        let (mut ue, is_new) = match self.ues.value(&ue_id)? {
            Some(ue) => (ue, false),
            None => {
                let mut ue = UeData::new(identity, self.default_slice.clone());
                self.ues.put(&ue_id, ue.clone())?;
                self.attach_ue(&mut ue, &cgi_key, *serving)?;
                info!(ue_id = %ue_id, cell = %cgi_key, "New UE");
                (ue, true)
            }
        };

        if ue.e2_node_id != node_id {
            ue.e2_node_id = node_id.to_string();
            self.ues.put(&ue_id, ue.clone())?;
        }

        if ue.cgi_string != cgi_key && !(rrc_report && ue.is_idle()) {
            debug!(
                ue_id = %ue_id,
                serving = %ue.cgi_string,
                reported = %cgi_key,
                "Discarding indication from non-serving cell"
            );
            return Ok(None);
        }

        Ok(Some(Admitted {
            ue,
            cgi_key,
            is_new,
        }))
    }

    fn measurements(
        &self,
        serving: &Cgi,
        items: &[MeasReportItem],
    ) -> Result<Measurements, StoreError> {
        let mut out = Measurements::default();
        for item in items {
            let key = self.cell_key(&item.cgi);
            if item.cgi.cell == serving.cell {
                out.rsrp_serving = item.rsrp;
            } else {
                out.rsrp_neighbors.insert(key.clone(), item.rsrp);
                if self.cells.get(&key)?.is_none() {
                    self.cells.put(&key, CellData::new(key.as_str(), item.cgi))?;
                    debug!(cell = %key, "New neighbor cell");
                }
            }
            out.rsrp_table.insert(key.clone(), item.rsrp);
            out.cgi_table.insert(key, item.cgi);
        }
        Ok(out)
    }

    fn update_five_qi(&self, ue: &mut UeData, five_qi: i64) {
        if ue.five_qi != five_qi {
            info!(ue_id = %ue.ue_id, five_qi, "5QI changed");
        }
        ue.five_qi = five_qi;
    }
}

/// QoS class from the serving-cell item: 2 above 127, 1 otherwise, -1 when
/// the item or its 5QI is missing.
pub fn serving_five_qi(serving: &Cgi, items: &[MeasReportItem]) -> i64 {
    items
        .iter()
        .filter(|item| item.cgi.cell == serving.cell)
        .last()
        .map_or(UNKNOWN_FIVE_QI, |item| match item.five_qi {
            Some(code) if code > FIVE_QI_CLASS_THRESHOLD => 2,
            Some(_) => 1,
            None => UNKNOWN_FIVE_QI,
        })
}

/// Slice assigned to new UEs.
pub fn slice_from_config(slice: &SliceConfig) -> SliceId {
    SliceId {
        sd: Some(slice.sd.clone()),
        sst: slice.sst,
        plmn_id: PlmnId::new(slice.mcc.clone(), slice.mnc.clone()),
    }
}

fn apply_measurements(ue: &mut UeData, measurements: Measurements) {
    ue.rsrp_serving = measurements.rsrp_serving;
    ue.rsrp_neighbors = measurements.rsrp_neighbors;
    ue.rsrp_table = measurements.rsrp_table;
    ue.cgi_table = measurements.cgi_table;
}

/// Warns about an indication that could not be applied.
pub(crate) fn report_failure(indication: &E2Indication, err: &MhoError) {
    warn!(
        node_id = %indication.node_id,
        trigger = %indication.trigger,
        "Dropping indication: {}",
        err
    );
}
