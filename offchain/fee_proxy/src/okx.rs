use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::ProxyError;
use crate::quote::{extract, first_row, FeeQuote, FeeSource};
use crate::signer::{timestamp_iso, trade_fee_path, RequestSigner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuery {
    pub inst_type: String,
    pub group_id: Option<String>,
    pub inst_id: Option<String>,
}

impl Default for FeeQuery {
    fn default() -> Self {
        Self { inst_type: "SWAP".to_string(), group_id: None, inst_id: None }
    }
}

/// Thin signed client for the one private endpoint we need.
#[derive(Clone)]
pub struct OkxClient {
    http: reqwest::Client,
    base_url: String,
}

impl OkxClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { http, base_url: base_url.into() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn trade_fee(&self, creds: &Credentials, query: &FeeQuery) -> Result<FeeQuote, ProxyError> {
        let path = trade_fee_path(&query.inst_type, query.inst_id.as_deref())?;
        let signed = RequestSigner::new(creds.api_secret.as_str()).sign(timestamp_iso(), "GET", path)?;

        let mut req = self
            .http
            .get(format!("{}{}", self.base_url, signed.request_path))
            .header("OK-ACCESS-KEY", &creds.api_key)
            .header("OK-ACCESS-SIGN", &signed.signature)
            .header("OK-ACCESS-TIMESTAMP", &signed.timestamp)
            .header("OK-ACCESS-PASSPHRASE", &creds.passphrase)
            .header("Content-Type", "application/json");
        if let Some(project) = &creds.project {
            req = req.header("OK-ACCESS-PROJECT", project);
        }

        debug!(path = %signed.request_path, "requesting trade fee");
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(path = %signed.request_path, status = status.as_u16(), "okx http error");
            return Err(ProxyError::UpstreamHttp { status: status.as_u16(), body: text });
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|_| ProxyError::UpstreamParse { raw: Value::String(text.clone()) })?;
        let (quote, source) = parse_trade_fee(&body, query.group_id.as_deref())?;
        info!(path = %signed.request_path, ?source, maker = quote.maker, taker = quote.taker, "trade fee resolved");
        Ok(quote)
    }
}

/// Applies the envelope checks then the rate fallback chain to a decoded body.
pub fn parse_trade_fee(body: &Value, group_id: Option<&str>) -> Result<(FeeQuote, FeeSource), ProxyError> {
    if body.get("code").and_then(Value::as_str) != Some("0") {
        warn!(code = ?body.get("code"), "okx api error");
        return Err(ProxyError::UpstreamApi { data: body.clone() });
    }
    let row = first_row(body);
    extract(&row, group_id).ok_or(ProxyError::UpstreamParse { raw: row })
}
