//! Periodic state dump.
//!
//! Every display interval the task logs the topology cells, the tracked
//! cells and every UE with its measurements. Column widths are remembered
//! in the [`DisplayContext`] between dumps so consecutive dumps line up.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::mho::MhoController;
use crate::rnib::Rnib;
use crate::tasks::{DisplayMessage, Task, TaskMessage};

/// Topology cell row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyCellRow {
    /// Entity id
    pub id: String,
    /// Cell object id
    pub cgi: String,
    /// Cell type
    pub cell_type: String,
}

/// Tracked cell row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellRow {
    /// Cell key
    pub cgi: String,
    /// Attached UEs
    pub ues: usize,
    /// Handovers in
    pub handovers_in: u64,
    /// Handovers out
    pub handovers_out: u64,
}

/// UE row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UeRow {
    /// UE id
    pub ue_id: String,
    /// QoS class
    pub five_qi: i64,
    /// Serving cell key
    pub cgi: String,
    /// Serving RSRP
    pub rsrp_serving: i32,
    /// Neighbor RSRP in key order
    pub rsrp_neighbors: Vec<i32>,
    /// Every measured cell in key order
    pub measured: Vec<String>,
    /// Whether the UE is idle
    pub idle: bool,
}

/// Everything one dump shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    /// Cells known to the topology
    pub topology: Vec<TopologyCellRow>,
    /// Cells in the cell store
    pub cells: Vec<CellRow>,
    /// UEs in the UE store
    pub ues: Vec<UeRow>,
}

impl StateSnapshot {
    /// Collects a snapshot from the stores and the topology.
    pub async fn collect(controller: &MhoController, rnib: &dyn Rnib) -> Self {
        let topology = match rnib.get_cell_types().await {
            Ok(cells) => cells
                .into_iter()
                .map(|(id, cell)| TopologyCellRow {
                    id,
                    cgi: cell.cgi,
                    cell_type: cell.cell_type,
                })
                .collect(),
            Err(e) => {
                warn!("Cannot read cell types: {}", e);
                Vec::new()
            }
        };

        let cells = controller
            .cells()
            .entries()
            .map(|entry| CellRow {
                cgi: entry.key,
                ues: entry.value.ues.len(),
                handovers_in: entry.value.handovers_in,
                handovers_out: entry.value.handovers_out,
            })
            .collect();

        let ues = controller
            .ues()
            .entries()
            .map(|entry| {
                let ue = entry.value;
                UeRow {
                    idle: ue.is_idle(),
                    rsrp_neighbors: ue.rsrp_neighbors.values().copied().collect(),
                    measured: ue.rsrp_table.keys().cloned().collect(),
                    ue_id: ue.ue_id,
                    five_qi: ue.five_qi,
                    cgi: ue.cgi_string,
                    rsrp_serving: ue.rsrp_serving,
                }
            })
            .collect();

        Self {
            topology,
            cells,
            ues,
        }
    }

    /// YAML rendering.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Rendering state kept between dumps.
#[derive(Debug, Default)]
pub struct DisplayContext {
    cgi_width: usize,
    ue_width: usize,
    dumps: u64,
}

impl DisplayContext {
    /// Fresh context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dumps rendered so far.
    pub fn dumps(&self) -> u64 {
        self.dumps
    }

    /// Renders a snapshot as log lines.
    pub fn render(&mut self, snapshot: &StateSnapshot) -> Vec<String> {
        self.dumps += 1;
        self.cgi_width = snapshot
            .cells
            .iter()
            .map(|c| c.cgi.len())
            .chain(snapshot.ues.iter().map(|u| u.cgi.len()))
            .fold(self.cgi_width, usize::max);
        let ue_ids: Vec<String> = snapshot.ues.iter().map(|u| display_ue_id(&u.ue_id)).collect();
        self.ue_width = ue_ids.iter().map(String::len).fold(self.ue_width, usize::max);
        let (cw, uw) = (self.cgi_width, self.ue_width);

        let mut lines = Vec::new();
        lines.push(format!("---- CELLS ({}) ----", snapshot.topology.len()));
        for cell in &snapshot.topology {
            lines.push(format!(
                "ID:{} CGI:{} CellType:{}",
                cell.id, cell.cgi, cell.cell_type
            ));
        }
        for cell in &snapshot.cells {
            lines.push(format!(
                "CGI:{:<cw$} UEs:{} HO-in:{} HO-out:{}",
                cell.cgi, cell.ues, cell.handovers_in, cell.handovers_out
            ));
        }

        lines.push(format!("---- UES ({}) ----", snapshot.ues.len()));
        for (ue, id) in snapshot.ues.iter().zip(&ue_ids) {
            let neighbors: Vec<String> = ue.rsrp_neighbors.iter().map(i32::to_string).collect();
            lines.push(format!(
                "ID:{:<uw$} 5QI:{:>2} CGI:{:<cw$} RSRP:{} [{}]{}",
                id,
                ue.five_qi,
                ue.cgi,
                ue.rsrp_serving,
                neighbors.join(" "),
                if ue.idle { " IDLE" } else { "" }
            ));
        }

        lines.push("---- UES [TABLE] ----".to_string());
        for (ue, id) in snapshot.ues.iter().zip(&ue_ids) {
            lines.push(format!(
                "ID:{:<uw$} 5QI:{:>2} CGI:{:<cw$} [{}]",
                id,
                ue.five_qi,
                ue.cgi,
                ue.measured.join(" ")
            ));
        }
        lines
    }
}

/// UE id without its zero padding.
fn display_ue_id(ue_id: &str) -> String {
    match ue_id.trim_start_matches('0') {
        "" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Periodic dump task.
pub struct DisplayTask {
    ctx: DisplayContext,
    controller: Arc<MhoController>,
    rnib: Arc<dyn Rnib>,
    interval: Duration,
}

impl DisplayTask {
    /// Creates the task.
    pub fn new(controller: Arc<MhoController>, rnib: Arc<dyn Rnib>, interval: Duration) -> Self {
        Self {
            ctx: DisplayContext::new(),
            controller,
            rnib,
            interval,
        }
    }

    async fn refresh(&mut self) {
        let snapshot = StateSnapshot::collect(&self.controller, self.rnib.as_ref()).await;
        for line in self.ctx.render(&snapshot) {
            debug!("{}", line);
        }
    }
}

#[async_trait::async_trait]
impl Task for DisplayTask {
    type Message = DisplayMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!("Display task started");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh().await,
                Some(msg) = rx.recv() => {
                    match msg {
                        TaskMessage::Message(DisplayMessage::Refresh) => self.refresh().await,
                        TaskMessage::Shutdown => {
                            info!("Display task received shutdown signal");
                            break;
                        }
                    }
                }
                else => {
                    info!("Display task channel closed");
                    break;
                }
            }
        }

        info!("Display task stopped after {} dumps", self.ctx.dumps());
    }
}
