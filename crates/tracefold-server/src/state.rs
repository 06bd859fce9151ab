use std::sync::Arc;

use axum::http::HeaderMap;
use tracefold_config::{CompletionRule, ServiceConfig};
use tracefold_store::{Backend, BackendRegistry, CompletionPolicy};
use tracing::debug;

use crate::error::AppError;
use crate::region::region_from_headers;

pub struct ServerState {
    pub registry: BackendRegistry,
    pub default_region: String,
}

impl ServerState {
    pub fn new(registry: BackendRegistry, default_region: impl Into<String>) -> Self {
        Self {
            registry,
            default_region: default_region.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let policy = match config.completion {
            CompletionRule::LastSegment => CompletionPolicy::LastSegmentClosed,
            CompletionRule::AllSegments => CompletionPolicy::AllSegmentsClosed,
        };
        let registry = BackendRegistry::from_regions_with_policy(&config.regions, policy);
        Self::new(registry, &config.default_region)
    }

    /// Backend for the region the request was signed for, or the default.
    pub fn backend(&self, headers: &HeaderMap) -> Result<Arc<Backend>, AppError> {
        let region = region_from_headers(headers).unwrap_or(&self.default_region);
        debug!(region, "Resolved backend");
        self.registry
            .get(region)
            .ok_or_else(|| AppError::InvalidRegion(format!("Unknown region: {}", region)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    #[test]
    fn test_backend_resolution() {
        let state = ServerState::new(BackendRegistry::from_regions(["us-east-1", "eu-west-1"]), "us-east-1");

        let backend = state.backend(&HeaderMap::new()).unwrap();
        assert_eq!(backend.region(), "us-east-1");

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("AWS4-HMAC-SHA256 Credential=AKID/20240101/eu-west-1/xray/aws4_request"),
        );
        assert_eq!(state.backend(&headers).unwrap().region(), "eu-west-1");

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("AWS4-HMAC-SHA256 Credential=AKID/20240101/mars-1/xray/aws4_request"),
        );
        assert_eq!(state.backend(&headers).unwrap_err().code(), "InvalidRegion");
    }

    #[test]
    fn test_from_config_uses_completion_rule() {
        let config = ServiceConfig {
            regions: vec!["local".into()],
            default_region: "local".into(),
            completion: CompletionRule::AllSegments,
            ..ServiceConfig::default()
        };
        let state = ServerState::from_config(&config);
        let backend = state.backend(&HeaderMap::new()).unwrap();
        assert_eq!(backend.traces().policy(), CompletionPolicy::AllSegmentsClosed);
    }
}
