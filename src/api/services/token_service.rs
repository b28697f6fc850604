//! Preview token service: signed, self-contained preview state.
//!
//! A token carries the entire preview payload, so a preview keeps working
//! after the in-memory store forgets it (restart, other instance).
//! - Format: `base64url(claims JSON) + "." + base64url(HMAC-SHA256)`
//! - v2 (structured controller config) is the only version produced
//! - v1 (legacy `controllerJs` carrier) is still accepted; the script field
//!   is discarded and the default controller config takes its place

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

use crate::models::controller::PreviewControllerConfig;
use crate::models::preview::{PreviewEntry, PreviewPayload};

/// Fallback signing secret for unconfigured deployments. Tokens signed with
/// it are forgeable by anyone who reads this source.
pub const SECRET_FALLBACK: &str = "local-preview-secret-change-in-production";

pub const DEFAULT_TTL_SECONDS: i64 = 3600;

const TOKEN_VERSION: u8 = 2;
const SHA256_BLOCK_LEN: usize = 64;

/// Decoded token claims, normalized across wire versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewClaims {
    /// Wire format version
    pub v: u8,
    /// Expiry (Unix seconds)
    pub exp: i64,
    pub name: String,
    pub view_xml: String,
    pub controller: PreviewControllerConfig,
    pub model_data: Map<String, Value>,
    pub created_at: String,
}

impl From<PreviewClaims> for PreviewPayload {
    fn from(claims: PreviewClaims) -> Self {
        Self {
            name: claims.name,
            view_xml: claims.view_xml,
            controller: claims.controller,
            model_data: claims.model_data,
        }
    }
}

/// v1 wire shape. `controllerJs` must be present (it was required then) but
/// its content is never surfaced again.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPreviewClaims {
    v: u8,
    exp: i64,
    name: String,
    view_xml: String,
    #[serde(rename = "controllerJs")]
    _controller_js: String,
    model_data: Map<String, Value>,
    created_at: String,
}

#[derive(Clone)]
pub struct PreviewTokenService {
    secret: Vec<u8>,
}

impl PreviewTokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Reads `PREVIEW_TOKEN_SECRET`; missing or empty falls back to the
    /// built-in constant with a warning rather than refusing to start.
    pub fn from_env() -> Self {
        let secret = match std::env::var("PREVIEW_TOKEN_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!(
                    "PREVIEW_TOKEN_SECRET not set! Using the built-in fallback secret; preview tokens are forgeable. Set PREVIEW_TOKEN_SECRET in production!"
                );
                SECRET_FALLBACK.to_string()
            }
        };
        Self::new(&secret)
    }

    /// Signs a token for the given entry with the default one-hour TTL.
    pub fn create_token(&self, entry: &PreviewEntry) -> Result<String, serde_json::Error> {
        self.create_token_with_ttl(entry, DEFAULT_TTL_SECONDS)
    }

    pub fn create_token_with_ttl(
        &self,
        entry: &PreviewEntry,
        ttl_seconds: i64,
    ) -> Result<String, serde_json::Error> {
        let claims = PreviewClaims {
            v: TOKEN_VERSION,
            exp: Utc::now().timestamp() + ttl_seconds,
            name: entry.name.clone(),
            view_xml: entry.view_xml.clone(),
            controller: entry.controller.clone(),
            model_data: entry.model_data.clone(),
            created_at: entry.created_at.clone(),
        };
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_string(&claims)?);
        let signature = self.sign(&encoded);
        Ok(format!("{}.{}", encoded, signature))
    }

    /// Verifies and decodes a token. Every failure mode (bad format, bad
    /// signature, unknown version, missing fields, expired) is `None`; a
    /// caller cannot distinguish tampering from expiry.
    pub fn parse_token(&self, token: &str) -> Option<PreviewClaims> {
        let (encoded, signature) = token.split_once('.')?;
        if encoded.is_empty() || signature.is_empty() {
            return None;
        }

        let expected = self.sign(encoded);
        if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let raw: Value = serde_json::from_slice(&bytes).ok()?;
        let claims = match raw.get("v").and_then(Value::as_u64) {
            Some(1) => {
                let legacy: LegacyPreviewClaims = serde_json::from_value(raw).ok()?;
                PreviewClaims {
                    v: legacy.v,
                    exp: legacy.exp,
                    name: legacy.name,
                    view_xml: legacy.view_xml,
                    controller: PreviewControllerConfig::default(),
                    model_data: legacy.model_data,
                    created_at: legacy.created_at,
                }
            }
            Some(2) => serde_json::from_value(raw).ok()?,
            _ => return None,
        };

        if claims.exp < Utc::now().timestamp() {
            return None;
        }
        Some(claims)
    }

    fn sign(&self, data: &str) -> String {
        URL_SAFE_NO_PAD.encode(hmac_sha256(&self.secret, data.as_bytes()))
    }
}

/// Shared token service for use across the application
pub type SharedPreviewTokenService = Arc<PreviewTokenService>;

/// RFC 2104 HMAC over SHA-256. Keys longer than the 64-byte block are
/// digested first; shorter keys are zero-padded.
fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut block = [0u8; SHA256_BLOCK_LEN];
    if key.len() > SHA256_BLOCK_LEN {
        let digest = Sha256::digest(key);
        block[..digest.len()].copy_from_slice(&digest);
    } else {
        block[..key.len()].copy_from_slice(key);
    }

    let mut inner = Sha256::new();
    let ipad: Vec<u8> = block.iter().map(|b| b ^ 0x36).collect();
    inner.update(&ipad);
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    let opad: Vec<u8> = block.iter().map(|b| b ^ 0x5c).collect();
    outer.update(&opad);
    outer.update(inner_hash);
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
