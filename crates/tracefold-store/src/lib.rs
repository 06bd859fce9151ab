//! Trace aggregation, ingestion and summary queries for tracefold.
//!
//! Segments flow through an [`IngestionCoordinator`] into a [`TraceStore`],
//! which keeps each trace's segments ordered and decides when the trace is
//! finished. A [`SummaryQueryEngine`] reads finished traces back out under
//! a time window. [`Backend`] bundles these per region and
//! [`BackendRegistry`] owns one backend per configured region.

mod backend;
mod ingest;
mod store;
mod summary;
mod telemetry;

pub use backend::{Backend, BackendRegistry};
pub use ingest::{IngestionCoordinator, RejectionRecord};
pub use store::{CompletionPolicy, StoreError, TraceAggregate, TraceStore};
pub use summary::{QueryError, SummaryQuery, SummaryQueryEngine, SummaryResult, TraceSummary};
pub use telemetry::{TelemetryError, TelemetryLog, TelemetryRecords};
