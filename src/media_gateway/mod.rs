//! MediaGateway - Remote Image Host Adapter
//!
//! ## Responsibilities
//!
//! - Signed uploads and deletions against the hosted image API
//! - Paginated folder listing for reconciliation
//! - Delivery URL fetches for the export builders
//! - Idempotent folder setup via a placeholder upload
//!
//! This is a thin pass-through; nothing here knows about sessions or
//! visibility. All failures surface as `Error::Gateway` and callers
//! decide whether to degrade or report.

mod types;

pub use types::{ListPage, RemoteAsset, RemoteUpload};

use crate::error::{Error, Result};
use crate::session_registry::now_unix;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// 1x1 transparent PNG, used to materialize a folder on the host
const FOLDER_PLACEHOLDER_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Page size for the listing API
const LIST_MAX_RESULTS: u32 = 500;

/// Remote media host configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Account name, part of every API path
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API origin, overridable for tests
    pub base_url: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            api_key: std::env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            api_secret: std::env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            base_url: std::env::var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com".to_string()),
        }
    }
}

/// MediaGateway instance
pub struct MediaGateway {
    http: Client,
    config: GatewayConfig,
}

impl MediaGateway {
    /// Create a gateway with explicit transport timeouts. The original
    /// service had none; unbounded remote calls stall requests forever.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Gateway(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn api_url(&self, tail: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.config.base_url, self.config.cloud_name, tail
        )
    }

    /// Upload image bytes as `<folder>/<public_id>`.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        public_id: &str,
        folder: &str,
    ) -> Result<RemoteUpload> {
        let timestamp = now_unix();
        let params = vec![
            ("folder".to_string(), folder.to_string()),
            ("public_id".to_string(), public_id.to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(public_id.to_string());
        let mut form = reqwest::multipart::Form::new().part("file", part);
        for (k, v) in &params {
            form = form.text(k.clone(), v.clone());
        }
        form = form
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        self.post_upload_form(form).await
    }

    /// Upload the placeholder pixel to materialize a folder.
    async fn upload_placeholder(&self, folder: &str) -> Result<RemoteUpload> {
        let timestamp = now_unix();
        let params = vec![
            ("folder".to_string(), folder.to_string()),
            ("public_id".to_string(), "folder_placeholder".to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let mut form =
            reqwest::multipart::Form::new().text("file", FOLDER_PLACEHOLDER_DATA_URI.to_string());
        for (k, v) in &params {
            form = form.text(k.clone(), v.clone());
        }
        form = form
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        self.post_upload_form(form).await
    }

    async fn post_upload_form(&self, form: reqwest::multipart::Form) -> Result<RemoteUpload> {
        let url = self.api_url("image/upload");
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Upload request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!(
                "Upload rejected with {}: {}",
                status, body
            )));
        }

        resp.json::<RemoteUpload>()
            .await
            .map_err(|e| Error::Gateway(format!("Upload response unparseable: {}", e)))
    }

    /// Delete an asset by remote id.
    pub async fn destroy(&self, remote_id: &str) -> Result<()> {
        let timestamp = now_unix();
        let params = vec![
            ("public_id".to_string(), remote_id.to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let mut form = reqwest::multipart::Form::new();
        for (k, v) in &params {
            form = form.text(k.clone(), v.clone());
        }
        form = form
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = self.api_url("image/destroy");
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Destroy request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!(
                "Destroy rejected with {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    /// List every asset under `<folder>/`, following pagination cursors
    /// until the host reports no more pages.
    pub async fn list_folder(&self, folder: &str) -> Result<Vec<RemoteAsset>> {
        let url = self.api_url("resources/image/upload");
        let prefix = format!("{}/", folder);
        let max_results = LIST_MAX_RESULTS.to_string();
        let mut assets = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(&url)
                .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
                .query(&[
                    ("prefix", prefix.as_str()),
                    ("max_results", max_results.as_str()),
                ]);
            if let Some(ref c) = cursor {
                req = req.query(&[("next_cursor", c.as_str())]);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| Error::Gateway(format!("Listing request failed: {}", e)))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Gateway(format!(
                    "Listing rejected with {}: {}",
                    status, body
                )));
            }

            let page = resp
                .json::<ListPage>()
                .await
                .map_err(|e| Error::Gateway(format!("Listing response unparseable: {}", e)))?;

            assets.extend(page.resources);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        tracing::debug!(folder = %folder, count = assets.len(), "Listed remote folder");
        Ok(assets)
    }

    /// Fetch image bytes from a delivery URL.
    ///
    /// Non-success status returns `None` so exports can skip that one
    /// image without aborting the whole archive.
    pub async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Fetch failed for {}: {}", url, e)))?;

        if !resp.status().is_success() {
            tracing::warn!(url = %url, status = %resp.status(), "Image fetch skipped");
            return Ok(None);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Gateway(format!("Fetch body read failed: {}", e)))?;
        Ok(Some(bytes.to_vec()))
    }

    /// Idempotently ensure the folder exists on the host: upload the
    /// placeholder pixel, then confirm by listing one entry.
    pub async fn ensure_folder(&self, folder: &str) -> Result<bool> {
        self.upload_placeholder(folder).await?;

        let exists = match self.list_folder(folder).await {
            Ok(assets) => !assets.is_empty(),
            Err(e) => {
                tracing::warn!(folder = %folder, error = %e, "Folder confirmation listing failed");
                false
            }
        };

        Ok(exists)
    }
}

/// Request signature: sha256 hex of the sorted `k=v` pairs joined with
/// `&`, with the API secret appended.
fn sign_params(params: &[(String, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
