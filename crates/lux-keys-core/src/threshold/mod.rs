//! Client for the external threshold-share service.
//!
//! Every call is a single JSON POST under `/v1/` with a per-operation
//! deadline. Share-moving calls are not idempotent, so nothing here ever
//! retries: a transport failure means the operation is *potentially
//! completed* on the service side and the operator decides what to do.

pub mod transport;

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DEFAULT_THRESHOLD_URL;
use crate::error::{KeyError, Result};
use self::transport::{HttpTransport, Transport};

pub const TIMEOUT_HEALTH: Duration = Duration::from_secs(10);
pub const TIMEOUT_QUERY: Duration = Duration::from_secs(30);
pub const TIMEOUT_SHARE_OP: Duration = Duration::from_secs(60);
pub const TIMEOUT_RESHARE: Duration = Duration::from_secs(120);

/// Threshold-key lifecycle as observed from the client. The client never
/// mutates this by local action; it reads it back from `list`/`gather`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyState {
    Created,
    Distributed,
    Ready,
    Degraded,
    Reconstructed,
    Destroyed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributeOutcome {
    pub share_ids: Vec<String>,
    pub group_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatherOutcome {
    pub available: u32,
    pub required: u32,
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignOutcome {
    pub signature: String,
    pub participant_ids: Vec<String>,
    pub group_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptOutcome {
    pub ciphertext: String,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReshareOutcome {
    pub share_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteKeyInfo {
    pub key_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub state: Option<KeyState>,
    #[serde(default)]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub shares: Option<u32>,
}

pub struct ThresholdClient {
    transport: Box<dyn Transport>,
}

impl ThresholdClient {
    /// HTTP client against the configured base URL
    /// (default `http://localhost:9630`).
    pub fn connect(base_url: Option<&str>) -> Result<Self> {
        let transport = HttpTransport::new(base_url.unwrap_or(DEFAULT_THRESHOLD_URL))?;
        Ok(ThresholdClient {
            transport: Box::new(transport),
        })
    }

    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        ThresholdClient { transport }
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        timeout: Duration,
    ) -> Result<T> {
        let raw = self.transport.post(path, &body, timeout)?;
        let envelope: Envelope = serde_json::from_value(raw)
            .map_err(|e| KeyError::ServiceUnreachable(format!("malformed response: {e}")))?;
        if !envelope.success {
            let msg = envelope
                .error
                .unwrap_or_else(|| "unspecified service error".to_string());
            if msg.to_lowercase().contains("not found") {
                return Err(KeyError::NotFound(msg));
            }
            return Err(KeyError::BadUsage(format!("threshold service: {msg}")));
        }
        let data = envelope.data.unwrap_or(Value::Null);
        serde_json::from_value(data)
            .map_err(|e| KeyError::ServiceUnreachable(format!("malformed payload: {e}")))
    }

    pub fn health(&self) -> Result<()> {
        let _: Value = self.call("/v1/health", json!({}), TIMEOUT_HEALTH)?;
        Ok(())
    }

    /// Split an existing key into `n` shares, `t` of which reconstruct.
    pub fn distribute(
        &self,
        key_id: &str,
        t: u32,
        n: u32,
        validators: &[String],
    ) -> Result<DistributeOutcome> {
        if t == 0 || t > n {
            return Err(KeyError::BadUsage(format!(
                "threshold {t} of {n} is not satisfiable"
            )));
        }
        if validators.len() != n as usize {
            return Err(KeyError::BadUsage(format!(
                "{n} shares requested but {} validators named",
                validators.len()
            )));
        }
        tracing::debug!(key_id, t, n, "distributing key shares");
        self.call(
            "/v1/distribute",
            json!({
                "key_id": key_id,
                "threshold": t,
                "shares": n,
                "validators": validators,
            }),
            TIMEOUT_SHARE_OP,
        )
    }

    /// Poll shareholders for liveness.
    pub fn gather(&self, key_id: &str) -> Result<GatherOutcome> {
        self.call("/v1/gather", json!({ "key_id": key_id }), TIMEOUT_SHARE_OP)
    }

    pub fn threshold_sign(&self, key_id: &str, msg: &[u8], algo: &str) -> Result<SignOutcome> {
        self.call(
            "/v1/sign",
            json!({
                "key_id": key_id,
                "message": general_purpose::STANDARD.encode(msg),
                "algorithm": algo,
            }),
            TIMEOUT_SHARE_OP,
        )
    }

    pub fn verify(&self, key_id: &str, msg: &[u8], sig: &[u8], algo: &str) -> Result<VerifyOutcome> {
        self.call(
            "/v1/verify",
            json!({
                "key_id": key_id,
                "message": general_purpose::STANDARD.encode(msg),
                "signature": general_purpose::STANDARD.encode(sig),
                "algorithm": algo,
            }),
            TIMEOUT_QUERY,
        )
    }

    /// Encrypt against the key's ML-KEM public half.
    pub fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<EncryptOutcome> {
        self.call(
            "/v1/encrypt",
            json!({
                "key_id": key_id,
                "plaintext": general_purpose::STANDARD.encode(plaintext),
            }),
            TIMEOUT_QUERY,
        )
    }

    /// Threshold decryption. The service zeroizes the reconstructed key
    /// immediately after use; that is a service-side contract this client
    /// relies on but cannot verify.
    pub fn decrypt(&self, key_id: &str, ciphertext: &str) -> Result<Vec<u8>> {
        #[derive(Deserialize)]
        struct DecryptOutcome {
            plaintext_b64: String,
        }
        let out: DecryptOutcome = self.call(
            "/v1/decrypt",
            json!({ "key_id": key_id, "ciphertext": ciphertext }),
            TIMEOUT_SHARE_OP,
        )?;
        general_purpose::STANDARD
            .decode(out.plaintext_b64)
            .map_err(|_| KeyError::ServiceUnreachable("malformed plaintext".to_string()))
    }

    /// Proactive share rotation without changing the underlying key.
    pub fn reshare(
        &self,
        key_id: &str,
        new_t: Option<u32>,
        new_n: Option<u32>,
        new_validators: Option<&[String]>,
    ) -> Result<ReshareOutcome> {
        tracing::debug!(key_id, "resharing key");
        self.call(
            "/v1/reshare",
            json!({
                "key_id": key_id,
                "threshold": new_t,
                "shares": new_n,
                "validators": new_validators,
            }),
            TIMEOUT_RESHARE,
        )
    }

    pub fn list_algorithms(&self) -> Result<Vec<String>> {
        self.call("/v1/algorithms", json!({}), TIMEOUT_QUERY)
    }

    pub fn list_keys(&self, filter: Option<&str>) -> Result<Vec<RemoteKeyInfo>> {
        self.call("/v1/keys", json!({ "filter": filter }), TIMEOUT_QUERY)
    }

    pub fn get_key_by_name(&self, name: &str) -> Result<RemoteKeyInfo> {
        self.call("/v1/keys/get", json!({ "name": name }), TIMEOUT_QUERY)
    }

    pub fn get_public_key(&self, key_id: &str, format: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct PublicKeyOutcome {
            public_key: String,
        }
        let out: PublicKeyOutcome = self.call(
            "/v1/keys/public",
            json!({ "key_id": key_id, "format": format }),
            TIMEOUT_QUERY,
        )?;
        Ok(out.public_key)
    }

    pub fn create_key(&self, name: &str, algorithm: &str) -> Result<RemoteKeyInfo> {
        self.call(
            "/v1/keys/create",
            json!({ "name": name, "algorithm": algorithm }),
            TIMEOUT_QUERY,
        )
    }

    pub fn delete_key(&self, key_id: &str) -> Result<()> {
        let _: Value = self.call(
            "/v1/keys/delete",
            json!({ "key_id": key_id }),
            TIMEOUT_QUERY,
        )?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}
