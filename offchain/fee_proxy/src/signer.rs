//! OKX v5 request signing.
//!
//! The prehash is `timestamp + method + requestPath` (plus body, always empty
//! for the GET requests made here), signed with HMAC-SHA256 and base64
//! encoded.

use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;

use crate::error::ProxyError;

type HmacSha256 = Hmac<Sha256>;

pub const TRADE_FEE_PATH: &str = "/api/v5/account/trade-fee";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub timestamp: String,
    pub method: String,
    pub request_path: String,
    pub signature: String,
}

#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
}

impl RequestSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn prehash(timestamp: &str, method: &str, request_path: &str) -> String {
        format!("{timestamp}{method}{request_path}")
    }

    /// Base64 HMAC-SHA256 of `message` under the secret.
    pub fn sign_message(&self, message: &str) -> Result<String, ProxyError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ProxyError::Signing(format!("failed to create HMAC: {e}")))?;
        mac.update(message.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn sign(&self, timestamp: String, method: &str, request_path: String) -> Result<SignedRequest, ProxyError> {
        let signature = self.sign_message(&Self::prehash(&timestamp, method, &request_path))?;
        Ok(SignedRequest { timestamp, method: method.to_string(), request_path, signature })
    }
}

/// Current UTC time with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn timestamp_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Path and form-encoded query for the trade-fee endpoint. `instId` is only
/// included when given, so the default path is `...?instType=SWAP`.
pub fn trade_fee_path(inst_type: &str, inst_id: Option<&str>) -> Result<String, ProxyError> {
    // origin is discarded; Url only does the encoding
    let mut url = Url::parse(&format!("http://localhost{TRADE_FEE_PATH}"))
        .map_err(|e| ProxyError::Signing(format!("bad request path: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("instType", inst_type);
        if let Some(id) = inst_id {
            pairs.append_pair("instId", id);
        }
    }
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_base64_vector() {
        let signer = RequestSigner::new("secret");
        assert_eq!(signer.sign_message("message").unwrap(), "i19IcCmVwVmMVz2x4hhmqbgl1KeU0WnXBgoDYFeWNgs=");
    }

    #[test]
    fn test_prehash_order() {
        assert_eq!(
            RequestSigner::prehash("2024-01-01T00:00:00.000Z", "GET", "/api/v5/account/trade-fee?instType=SWAP"),
            "2024-01-01T00:00:00.000ZGET/api/v5/account/trade-fee?instType=SWAP"
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = RequestSigner::new("test_secret");
        let path = trade_fee_path("SWAP", None).unwrap();
        let a = signer.sign("2024-01-01T00:00:00.000Z".into(), "GET", path.clone()).unwrap();
        let b = signer.sign("2024-01-01T00:00:00.000Z".into(), "GET", path).unwrap();
        assert_eq!(a, b);
        let direct = signer
            .sign_message("2024-01-01T00:00:00.000ZGET/api/v5/account/trade-fee?instType=SWAP")
            .unwrap();
        assert_eq!(a.signature, direct);
        assert!(base64::engine::general_purpose::STANDARD.decode(&a.signature).is_ok());
    }

    #[test]
    fn test_trade_fee_path() {
        assert_eq!(trade_fee_path("SWAP", None).unwrap(), "/api/v5/account/trade-fee?instType=SWAP");
        assert_eq!(
            trade_fee_path("FUTURES", Some("BTC-USD-240628")).unwrap(),
            "/api/v5/account/trade-fee?instType=FUTURES&instId=BTC-USD-240628"
        );
        // form encoding, as URLSearchParams does it
        assert_eq!(trade_fee_path("A B&C", None).unwrap(), "/api/v5/account/trade-fee?instType=A+B%26C");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp_iso();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
    }
}
