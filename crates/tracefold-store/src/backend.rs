//! Per-region backends and the registry that owns them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ingest::{IngestionCoordinator, RejectionRecord};
use crate::store::{CompletionPolicy, TraceStore};
use crate::summary::{QueryError, SummaryQuery, SummaryQueryEngine, SummaryResult};
use crate::telemetry::{TelemetryError, TelemetryLog, TelemetryRecords};

/// Trace and telemetry state for one region.
#[derive(Debug)]
pub struct Backend {
    region: String,
    traces: Arc<TraceStore>,
    telemetry: TelemetryLog,
    ingestion: IngestionCoordinator,
    summaries: SummaryQueryEngine,
}

impl Backend {
    pub fn new(region: impl Into<String>) -> Self {
        Self::with_policy(region, CompletionPolicy::default())
    }

    pub fn with_policy(region: impl Into<String>, policy: CompletionPolicy) -> Self {
        let traces = Arc::new(TraceStore::with_policy(policy));
        Self {
            region: region.into(),
            ingestion: IngestionCoordinator::new(traces.clone()),
            summaries: SummaryQueryEngine::new(traces.clone()),
            traces,
            telemetry: TelemetryLog::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn traces(&self) -> &TraceStore {
        &self.traces
    }

    pub fn telemetry(&self) -> &TelemetryLog {
        &self.telemetry
    }

    /// PutTraceSegments: returns the unprocessed segments.
    pub fn process_segments<S: AsRef<str>>(&self, documents: &[S]) -> Vec<RejectionRecord> {
        self.ingestion.ingest(documents)
    }

    /// GetTraceSummaries.
    pub fn trace_summaries(&self, query: &SummaryQuery) -> Result<SummaryResult, QueryError> {
        self.summaries.summarize(query)
    }

    /// PutTelemetryRecords.
    pub fn add_telemetry_records(&self, records: TelemetryRecords) -> Result<(), TelemetryError> {
        self.telemetry.append(records)
    }
}

/// Region key to [`Backend`], built once at startup.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Backend>>,
}

impl BackendRegistry {
    pub fn from_regions<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_regions_with_policy(regions, CompletionPolicy::default())
    }

    pub fn from_regions_with_policy<I, S>(regions: I, policy: CompletionPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backends = regions
            .into_iter()
            .map(|region| {
                let region = region.into();
                let backend = Arc::new(Backend::with_policy(region.clone(), policy));
                (region, backend)
            })
            .collect();
        Self { backends }
    }

    pub fn get(&self, region: &str) -> Option<Arc<Backend>> {
        self.backends.get(region).cloned()
    }

    /// Registered region keys, sorted.
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        regions.sort_unstable();
        regions
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
