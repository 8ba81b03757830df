use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::admission::AdmissionSettings;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub tracked_clients: usize,
    pub admission: AdmissionSettings,
}

impl HealthResponse {
    pub fn healthy(tracked_clients: usize, admission: AdmissionSettings) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tracked_clients,
            admission,
        }
    }
}
