use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    auth_requests: IntCounterVec,
    accounts_created: IntCounter,
}

impl AuthMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let auth_requests = IntCounterVec::new(
            Opts::new(
                "auth_requests_total",
                "Count of authenticated requests grouped by middleware outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_requests.clone()))?;

        let accounts_created = IntCounter::new(
            "auth_accounts_created_total",
            "Count of accounts created through the open signup route",
        )?;
        registry.register(Box::new(accounts_created.clone()))?;

        Ok(Self {
            registry,
            auth_requests,
            accounts_created,
        })
    }

    pub fn auth_outcome(&self, outcome: &str) {
        self.auth_requests.with_label_values(&[outcome]).inc();
    }

    pub fn account_created(&self) {
        self.accounts_created.inc();
    }

    pub fn auth_outcome_count(&self, outcome: &str) -> u64 {
        self.auth_requests.with_label_values(&[outcome]).get()
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
