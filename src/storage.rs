/// Object storage collaborator.
///
/// The pipeline talks to storage through the narrow `ObjectStore` trait;
/// `S3Client` is the production implementation, a single signed HTTP PUT
/// per file against the bucket's virtual-hosted endpoint. No retry logic
/// lives here — a failed upload stays in its pending queue and the next
/// run retries it.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::BucketConfig;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StorageError {
    /// Local file could not be read.
    Io(String),
    /// Request could not be sent.
    Request(String),
    /// Non-2xx response from the storage endpoint.
    Http { status: u16, body: String },
    /// Credential environment variable is absent.
    MissingCredentials(&'static str),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "read failed: {}", msg),
            StorageError::Request(msg) => write!(f, "request failed: {}", msg),
            StorageError::Http { status, body } => {
                write!(f, "HTTP {}: {}", status, body)
            }
            StorageError::MissingCredentials(var) => {
                write!(f, "missing credential environment variable {}", var)
            }
        }
    }
}

impl std::error::Error for StorageError {}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// `put(localPath, key)` — the only storage operation the core needs.
pub trait ObjectStore {
    fn put(&self, local_path: &Path, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// S3 client
// ---------------------------------------------------------------------------

pub struct S3Client {
    client: reqwest::blocking::Client,
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
}

impl S3Client {
    /// Builds a client for `bucket`, reading `AWS_ACCESS_KEY` and
    /// `AWS_SECRET_KEY` from the environment (loaded from `.env` at
    /// startup).
    pub fn from_env(bucket: &BucketConfig) -> Result<Self, StorageError> {
        let access_key = std::env::var("AWS_ACCESS_KEY")
            .map_err(|_| StorageError::MissingCredentials("AWS_ACCESS_KEY"))?;
        let secret_key = std::env::var("AWS_SECRET_KEY")
            .map_err(|_| StorageError::MissingCredentials("AWS_SECRET_KEY"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(Self {
            client,
            bucket: bucket.name.clone(),
            region: bucket.region.clone(),
            access_key,
            secret_key,
        })
    }

    fn host(&self) -> String {
        format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
    }
}

impl ObjectStore for S3Client {
    fn put(&self, local_path: &Path, key: &str) -> Result<(), StorageError> {
        let body = fs::read(local_path).map_err(|e| {
            StorageError::Io(format!("{}: {}", local_path.display(), e))
        })?;

        let host = self.host();
        let canonical_uri = format!("/{}", uri_encode(key, false));
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = sha256_hex(&body);

        let authorization = sign_put_request(
            &host,
            &canonical_uri,
            &amz_date,
            &date_stamp,
            &payload_hash,
            &self.region,
            &self.access_key,
            &self.secret_key,
        );

        let url = format!("https://{}{}", host, canonical_uri);
        let response = self
            .client
            .put(&url)
            .header("Host", host)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .header("Authorization", authorization)
            .body(body)
            .send()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StorageError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AWS Signature Version 4
// ---------------------------------------------------------------------------

/// Builds the `Authorization` header for a PUT with signed host, date and
/// content-hash headers. The canonical request layout follows the SigV4
/// specification; the query string is always empty here.
#[allow(clippy::too_many_arguments)]
fn sign_put_request(
    host: &str,
    canonical_uri: &str,
    amz_date: &str,
    date_stamp: &str,
    payload_hash: &str,
    region: &str,
    access_key: &str,
    secret_key: &str,
) -> String {
    let signed_headers = "host;x-amz-content-sha256;x-amz-date";
    let canonical_headers = format!(
        "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
        host, payload_hash, amz_date
    );
    let canonical_request = format!(
        "PUT\n{}\n\n{}\n{}\n{}",
        canonical_uri, canonical_headers, signed_headers, payload_hash
    );

    let scope = format!("{}/{}/s3/aws4_request", date_stamp, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(secret_key, date_stamp, region);
    let signature = hex(&hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        access_key, scope, signed_headers, signature
    )
}

/// Standard SigV4 key derivation chain: date → region → service → request.
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, b"s3");
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Percent-encodes a storage key for the canonical URI. Unreserved
/// characters pass through; `/` stays literal unless `encode_slash` is set
/// (keys are slash-separated paths).
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
