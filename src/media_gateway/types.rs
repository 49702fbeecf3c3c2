//! Wire types for the remote media host REST API

use serde::{Deserialize, Serialize};

/// One asset as reported by the remote listing API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Remote asset id, `<folder>/<basename>`
    pub public_id: String,
    /// Image format ("png", "jpg", ...); absent for some legacy assets
    #[serde(default)]
    pub format: Option<String>,
    /// Upload time in the host's fixed textual format
    #[serde(default)]
    pub created_at: Option<String>,
    /// Delivery URL
    pub secure_url: String,
}

impl RemoteAsset {
    /// Basename of the public id (the part after the folder prefix)
    pub fn basename(&self) -> &str {
        self.public_id
            .rsplit('/')
            .next()
            .unwrap_or(&self.public_id)
    }

    /// Format with the host's default applied
    pub fn format_or_default(&self) -> &str {
        self.format.as_deref().unwrap_or("png")
    }
}

/// Response body of the upload endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUpload {
    pub public_id: String,
    pub secure_url: String,
}

/// Paginated listing response
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub resources: Vec<RemoteAsset>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}
