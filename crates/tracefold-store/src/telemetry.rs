//! Append-only storage for daemon telemetry records.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from telemetry record handling.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Parameter TelemetryRecords is missing")]
    MissingRecords,
    #[error("Invalid telemetry payload: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("Lock error")]
    Lock,
}

/// One PutTelemetryRecords payload, stored as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecords {
    #[serde(rename = "EC2InstanceId", default)]
    pub ec2_instance_id: Option<String>,
    #[serde(rename = "Hostname", default)]
    pub hostname: Option<String>,
    #[serde(rename = "ResourceARN", default)]
    pub resource_arn: Option<String>,
    #[serde(rename = "TelemetryRecords")]
    pub records: Vec<Value>,
}

impl TelemetryRecords {
    /// Reads a payload from request parameters.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, TelemetryError> {
        if !params.contains_key("TelemetryRecords") {
            return Err(TelemetryError::MissingRecords);
        }
        Ok(serde_json::from_value(Value::Object(params.clone()))?)
    }
}

#[derive(Debug, Default)]
pub struct TelemetryLog {
    entries: Mutex<Vec<TelemetryRecords>>,
}

impl TelemetryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, records: TelemetryRecords) -> Result<(), TelemetryError> {
        let mut guard = self.entries.lock().map_err(|_| TelemetryError::Lock)?;
        tracing::debug!(
            hostname = records.hostname.as_deref().unwrap_or("-"),
            records = records.records.len(),
            "Recorded telemetry"
        );
        guard.push(records);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<TelemetryRecords> {
        let Ok(guard) = self.entries.lock() else {
            return Vec::new();
        };
        guard.clone()
    }
}
