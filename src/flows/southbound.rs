//! Southbound dispatch.
//!
//! The controller never encodes switch protocol messages itself. It hands
//! each [`FlowRule`] to a [`Southbound`] implementation and treats the send
//! as fire-and-forget: failures are reported back, never retried here.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use super::{FlowError, FlowRule};

/// Capability to push a forwarding rule to a switch
pub trait Southbound: Send + Sync {
    fn send_flow_rule(&self, rule: &FlowRule) -> Result<(), FlowError>;
}

/// Writes every rule to the log and nothing else
#[derive(Debug, Default)]
pub struct LoggingSouthbound;

impl Southbound for LoggingSouthbound {
    fn send_flow_rule(&self, rule: &FlowRule) -> Result<(), FlowError> {
        info!(
            "Install flow on {}: dst_mac={} -> out_port={} priority={}",
            rule.switch, rule.dst_mac, rule.out_port, rule.priority
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct FlowRecord<'a> {
    issued_at: DateTime<Utc>,
    #[serde(flatten)]
    rule: &'a FlowRule,
}

/// Appends one JSON object per rule to a file, for an external agent to
/// replay against the switches
#[derive(Debug)]
pub struct JsonLinesSouthbound {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSouthbound {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Southbound for JsonLinesSouthbound {
    fn send_flow_rule(&self, rule: &FlowRule) -> Result<(), FlowError> {
        let dispatch_err = |reason: String| FlowError::Dispatch {
            switch: rule.switch,
            reason,
        };

        let record = FlowRecord {
            issued_at: Utc::now(),
            rule,
        };
        let mut line = serde_json::to_string(&record).map_err(|e| dispatch_err(e.to_string()))?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| dispatch_err("flow sink lock poisoned".to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| dispatch_err(format!("{}: {}", self.path.display(), e)))
    }
}
