// vMix API HTTP client
//
// Thin transport wrapper: builds function URLs, maps reqwest failures to
// typed errors and leaves policy (what to send, when to retry) to the
// caller. Exactly one request per call, no retries.

use std::time::Duration;

use tracing::debug;
use url::Url;

use super::status::VmixStatus;
use super::{OverlayAction, OverlayChannel};
use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client for the vMix web API (`http://host:8088/api`).
#[derive(Debug, Clone)]
pub struct VmixClient {
    http: reqwest::Client,
    api_url: Url,
    timeout: Duration,
}

impl VmixClient {
    /// Create a client with its own pooled `reqwest::Client`.
    pub fn new(api_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            api_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client from a URL string.
    pub fn from_url(api_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        Self::new(Url::parse(api_url)?, transport)
    }

    // ── Functions ───────────────────────────────────────────────────

    /// Set a text field on a title input.
    pub async fn set_text(&self, input: &str, field: &str, value: &str) -> Result<(), Error> {
        self.function(
            "SetText",
            &[("Input", input), ("SelectedName", field), ("Value", value)],
        )
        .await
    }

    /// Drive an overlay channel.
    pub async fn overlay(
        &self,
        channel: OverlayChannel,
        action: OverlayAction,
    ) -> Result<(), Error> {
        self.function(&action.function_name(channel), &[]).await
    }

    pub async fn start_recording(&self) -> Result<(), Error> {
        self.function("StartRecording", &[]).await
    }

    pub async fn stop_recording(&self) -> Result<(), Error> {
        self.function("StopRecording", &[]).await
    }

    /// Fetch and parse the XML state document.
    pub async fn status(&self) -> Result<VmixStatus, Error> {
        let body = self.get(self.api_url.clone()).await?;
        VmixStatus::from_xml(&body)
    }

    /// Invoke an arbitrary vMix function with extra query parameters.
    pub async fn function(&self, name: &str, params: &[(&str, &str)]) -> Result<(), Error> {
        let url = self.function_url(name, params);
        self.get(url).await.map(drop)
    }

    // ── Request helpers ─────────────────────────────────────────────

    pub(crate) fn function_url(&self, name: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.api_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("Function", name);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// GET a URL and return the body, mapping failures to typed errors.
    async fn get(&self, url: Url) -> Result<String, Error> {
        debug!(function = url.query().unwrap_or("<status>"), "GET vMix");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::Rejected {
                status: status.as_u16(),
                message: body.trim().chars().take(200).collect(),
            })
        }
    }
}
