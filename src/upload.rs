//! Off-chain content upload
//!
//! Files are pinned by an external HTTP service. The request is multipart:
//! a `tags` JSON field, the confirming `transaction` signature, and one
//! `file[]` part per file. The service answers with one message per stored
//! file, and the manifest entry carries the permanent content id.

use crate::constants::RESERVED_TXN_MANIFEST;
use crate::error::{Result, TxMintError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// A file to pin alongside the mint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Serialize `value` as a JSON document named `name`
    pub fn json<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(name, serde_json::to_vec(value)?).with_content_type("application/json"))
    }

    /// Lowercase hex SHA-256 of the contents, as recorded in the payment memo
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// One tag attached to an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTag {
    pub name: String,
    pub value: String,
}

/// Filename to tags
pub type UploadTags = BTreeMap<String, Vec<FileTag>>;

/// Tag every file with the mint it belongs to
pub fn mint_tags(files: &[UploadFile], mint: &str) -> UploadTags {
    files
        .iter()
        .map(|file| {
            (
                file.name.clone(),
                vec![FileTag {
                    name: "mint".to_string(),
                    value: mint.to_string(),
                }],
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMessage {
    pub filename: String,
    #[serde(rename = "transactionId", default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub messages: Vec<UploadMessage>,
}

impl UploadResponse {
    /// Content id of the reserved manifest entry, if the service stored one
    pub fn manifest_transaction_id(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.filename == RESERVED_TXN_MANIFEST)
            .and_then(|m| m.transaction_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload(
        &self,
        files: &[UploadFile],
        tags: &UploadTags,
        transaction: &str,
    ) -> Result<UploadResponse>;
}

/// `UploadService` backed by the pinning service's HTTP endpoint
pub struct HttpUploadService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploadService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TxMintError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn form(files: &[UploadFile], tags: &UploadTags, transaction: &str) -> Result<Form> {
        let mut form = Form::new()
            .text("tags", serde_json::to_string(tags)?)
            .text("transaction", transaction.to_string());

        for file in files {
            let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
            if let Some(content_type) = &file.content_type {
                part = part.mime_str(content_type).map_err(|e| {
                    TxMintError::UploadServiceError(format!(
                        "Bad content type for {}: {}",
                        file.name, e
                    ))
                })?;
            }
            form = form.part("file[]", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl UploadService for HttpUploadService {
    async fn upload(
        &self,
        files: &[UploadFile],
        tags: &UploadTags,
        transaction: &str,
    ) -> Result<UploadResponse> {
        let form = Self::form(files, tags, transaction)?;
        debug!(endpoint = %self.endpoint, files = files.len(), transaction, "Uploading files");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TxMintError::UploadServiceError(e.to_string()))?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| TxMintError::UploadServiceError(format!("Malformed response: {}", e)))?;

        info!(
            transaction,
            stored = body.messages.len(),
            manifest = ?body.manifest_transaction_id(),
            "Upload finished"
        );
        Ok(body)
    }
}
