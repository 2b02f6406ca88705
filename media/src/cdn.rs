//! # CDN client
//!
//! Thin reqwest client for the two Cloudinary endpoints the system touches:
//! the signed image upload and the admin resource lookup used by the repair
//! pass to verify that a public identifier actually exists.

use anyhow::{Context, Error, bail};
use chrono::Utc;
use reqwest::{Client, StatusCode, multipart};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Credentials plus the fallback placeholder substituted for assets that no
/// longer exist on the CDN.
#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub fallback_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub secure_url: String,
    pub public_id: String,
}

pub struct CdnClient {
    client: Client,
    config: CdnConfig,
}

impl CdnClient {
    pub fn new(config: CdnConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Uploads one image and returns its canonical `secure_url`.
    ///
    /// The public identifier is the file stem, placed under `folder`.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        folder: &str,
        overwrite: bool,
    ) -> Result<UploadResponse, Error> {
        let public_id = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name)
            .to_string();

        let timestamp = Utc::now().timestamp().to_string();
        let overwrite = overwrite.to_string();

        // everything except file/api_key is signed, sorted by name
        let params = [
            ("folder", folder),
            ("overwrite", overwrite.as_str()),
            ("public_id", public_id.as_str()),
            ("signature_algorithm", "sha256"),
            ("timestamp", timestamp.as_str()),
        ];
        let signature = sign(&params, &self.config.api_secret);

        let mut form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            )
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);

        for (name, value) in params {
            form = form.text(name.to_string(), value.to_string());
        }

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("upload of {file_name} rejected with {status}");
        }

        response
            .json::<UploadResponse>()
            .await
            .context("malformed upload response")
    }

    /// Checks whether `public_id` names an existing image asset.
    pub async fn resource_exists(&self, public_id: &str) -> Result<bool, Error> {
        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/resources/image/upload/{public_id}",
            self.config.cloud_name
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .context("resource lookup failed")?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => bail!("resource lookup for {public_id} failed with {status}"),
        }
    }
}

/// API signature: `k=v` pairs joined with `&` in parameter-name order, the
/// secret appended, hex-encoded SHA-256 over the whole string.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::sign;

    #[test]
    fn test_signature_is_stable_hex() {
        let params = [("folder", "productos"), ("timestamp", "1700000000")];
        let signature = sign(&params, "secret");

        assert_eq!(signature.len(), 64);
        assert_eq!(signature, sign(&params, "secret"));
        assert_ne!(signature, sign(&params, "other-secret"));
    }
}
