use serde::Serialize;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../console/src/generated/health-response.ts")]
pub struct HealthResponse {
    pub status: &'static str,
}
