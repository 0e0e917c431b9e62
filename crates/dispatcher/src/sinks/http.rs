//! HttpTelemetrySink - POSTs temperature readings as JSON

use std::time::Duration;

use contracts::{ContractError, TelemetrySink, TemperatureReading};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

/// Telemetry sink posting to an HTTP endpoint
///
/// Body: `{"temperature": f32, "timestamp": i64, "device_id": str}`.
pub struct HttpTelemetrySink {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTelemetrySink {
    /// Create a sink for `endpoint` with a per-request timeout
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!("thermocam/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name.clone(),
                message: format!("HTTP client error: {}", e),
            })?;

        Ok(Self {
            name,
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TelemetrySink for HttpTelemetrySink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_telemetry_send",
        skip(self, reading),
        fields(sink = %self.name, endpoint = %self.endpoint)
    )]
    async fn send(&mut self, reading: &TemperatureReading) -> Result<(), ContractError> {
        let body = serde_json::to_vec(reading)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: self.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::sink_write(
                &self.name,
                format!("endpoint returned {}", status),
            ));
        }

        debug!(status = %status, "reading accepted");
        Ok(())
    }
}
