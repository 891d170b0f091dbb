//! Google Cloud Storage through the JSON API.
//!
//! Uploads and downloads authenticate with an OAuth access token. Retrieval
//! URLs are V2 signed URLs, signed with the service account's RSA key so
//! they can carry an arbitrarily distant expiry.

use super::{detect_content_type, permanent_url_expiry, Storage, StoredObject};
use async_trait::async_trait;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use jsonwebtoken::{Algorithm, EncodingKey};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::{AppError, ExternalServiceError};
use std::fs;

pub const GCS_DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

/// Signs read URLs on behalf of a service account.
#[derive(Clone)]
pub struct GcsUrlSigner {
    client_email: String,
    key: EncodingKey,
}

impl GcsUrlSigner {
    pub fn from_pem(
        client_email: impl Into<String>,
        private_key_pem: &str,
    ) -> Result<Self, AppError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Failed to parse GCS private key: {}", e))
        })?;

        Ok(Self {
            client_email: client_email.into(),
            key,
        })
    }

    /// Load a service account JSON key file as downloaded from the cloud console.
    pub fn from_service_account_file(path: &str) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Failed to read service account key from {}: {}",
                path,
                e
            ))
        })?;
        let account: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid service account key in {}: {}",
                path,
                e
            ))
        })?;

        Self::from_pem(account.client_email, &account.private_key)
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Canonical V2 string for a GET of `/{bucket}/{key}` expiring at `expires`.
    pub fn string_to_sign(bucket: &str, key: &str, expires: i64) -> String {
        format!("GET\n\n\n{}\n/{}/{}", expires, bucket, key)
    }

    pub fn signed_read_url(
        &self,
        base_url: &str,
        bucket: &str,
        key: &str,
        expires: i64,
    ) -> Result<String, AppError> {
        let message = Self::string_to_sign(bucket, key, expires);
        let signature = jsonwebtoken::crypto::sign(message.as_bytes(), &self.key, Algorithm::RS256)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to sign URL: {}", e)))?;
        // The signer emits unpadded base64url, V2 URLs carry standard base64
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Invalid signature encoding: {}", e))
        })?;

        Ok(format!(
            "{}/{}/{}?GoogleAccessId={}&Expires={}&Signature={}",
            base_url,
            bucket,
            key,
            urlencoding::encode(&self.client_email),
            expires,
            urlencoding::encode(&STANDARD.encode(signature))
        ))
    }
}

pub struct GcsStorage {
    client: Client,
    base_url: String,
    bucket: String,
    access_token: Secret<String>,
    signer: GcsUrlSigner,
}

impl GcsStorage {
    pub fn new(bucket: String, access_token: Secret<String>, signer: GcsUrlSigner) -> Self {
        Self {
            client: Client::new(),
            base_url: GCS_DEFAULT_BASE_URL.to_string(),
            bucket,
            access_token,
            signer,
        }
    }

    /// Point the client at another endpoint, such as an emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Storage for GcsStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(self.access_token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| ExternalServiceError::Storage(format!("GCS upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::Storage(format!(
                "GCS upload error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(())
    }

    async fn download(&self, key: &str) -> Result<StoredObject, AppError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(key)
        );

        let response = self
            .client
            .get(&url)
            .query(&[("alt", "media")])
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| ExternalServiceError::Storage(format!("GCS download failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(anyhow::anyhow!("Object not found")));
        }
        if !response.status().is_success() {
            return Err(ExternalServiceError::Storage(format!(
                "GCS download error {}",
                response.status()
            ))
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| detect_content_type(key).to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExternalServiceError::Storage(format!("GCS body read failed: {}", e)))?;

        Ok(StoredObject {
            data: bytes.to_vec(),
            content_type,
        })
    }

    fn retrieval_url(&self, key: &str) -> Result<String, AppError> {
        self.signer
            .signed_read_url(&self.base_url, &self.bucket, key, permanent_url_expiry())
    }
}
