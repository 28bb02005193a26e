// SPDX-License-Identifier: MIT
//
// Tier 3: remote paid compression service.
//
// Only attempted when a credential was supplied. Upload, request
// compression at the service's fixed "recommended" level (the safe choice
// for legal documents), download the result. Network calls rely on the
// HTTP client's own connect/read timeouts.

use std::fs;
use std::path::Path;
use std::time::Duration;

use exhibitkit_core::error::{ExhibitError, Result};
use exhibitkit_core::types::CompressionMethod;
use reqwest::blocking::{Client, multipart};
use tracing::debug;

use super::CompressionStrategy;

const DEFAULT_BASE_URL: &str = "https://api.smallpdf.com/v2";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct RemoteStrategy {
    api_key: String,
    base_url: String,
    client: Client,
}

impl RemoteStrategy {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            base_url,
            client,
        }
    }

    fn http_error(context: &str, err: reqwest::Error) -> ExhibitError {
        ExhibitError::Compression(format!("remote service {context}: {err}"))
    }
}

impl CompressionStrategy for RemoteStrategy {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Remote
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<()> {
        // Step 1: upload.
        let form = multipart::Form::new()
            .file("file", input)
            .map_err(|err| ExhibitError::Compression(format!("cannot read upload: {err}")))?;
        let upload: serde_json::Value = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|err| Self::http_error("upload", err))?
            .error_for_status()
            .map_err(|err| Self::http_error("upload", err))?
            .json()
            .map_err(|err| Self::http_error("upload response", err))?;
        let file_id = upload["id"]
            .as_str()
            .ok_or_else(|| ExhibitError::Compression("upload response missing file id".into()))?;

        // Step 2: request compression at the recommended level.
        let request_body = serde_json::json!({
            "files": [{ "id": file_id }],
            "compression_level": "recommended",
        });
        let response: serde_json::Value = self
            .client
            .post(format!("{}/compress", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .map_err(|err| Self::http_error("compress request", err))?
            .error_for_status()
            .map_err(|err| Self::http_error("compress request", err))?
            .json()
            .map_err(|err| Self::http_error("compress response", err))?;
        let download_url = response["files"][0]["url"].as_str().ok_or_else(|| {
            ExhibitError::Compression("compress response missing download url".into())
        })?;

        // Step 3: download the result.
        let bytes = self
            .client
            .get(download_url)
            .send()
            .map_err(|err| Self::http_error("download", err))?
            .error_for_status()
            .map_err(|err| Self::http_error("download", err))?
            .bytes()
            .map_err(|err| Self::http_error("download body", err))?;

        fs::write(output, &bytes)
            .map_err(|err| ExhibitError::Compression(format!("cannot write output: {err}")))?;
        debug!(bytes = bytes.len(), "remote compression downloaded");
        Ok(())
    }
}
