//! Extraction of maker/taker rates from a trade-fee response.
//!
//! OKX has shipped several layouts for this endpoint; they are tried in a
//! fixed order and the first one that yields two finite numbers wins.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeeQuote {
    pub maker: f64,
    pub taker: f64,
}

/// Which layout the rates were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    FeeGroup,
    Legacy,
    Unified,
    FeeRateList,
}

/// `data[0]` of the response, or an empty object.
pub fn first_row(body: &Value) -> Value {
    body.get("data")
        .and_then(|d| d.get(0))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

/// Numbers and numeric strings; blanks and everything else are not numbers.
///
/// A blank or null rate makes its pair unusable and the chain moves on to the
/// next source. Neither is read as zero.
fn as_number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn pair(maker: Option<&Value>, taker: Option<&Value>) -> Option<FeeQuote> {
    Some(FeeQuote { maker: as_number(maker)?, taker: as_number(taker)? })
}

fn group_id_matches(entry: &Value, wanted: &str) -> bool {
    match entry.get("groupId") {
        Some(Value::String(s)) => s == wanted,
        Some(Value::Number(n)) => n.to_string() == wanted,
        _ => false,
    }
}

fn from_fee_group(row: &Value, group_id: Option<&str>) -> Option<FeeQuote> {
    let groups = row.get("feeGroup")?.as_array()?;
    let entry = group_id
        .filter(|g| !g.is_empty())
        .and_then(|g| groups.iter().find(|e| group_id_matches(e, g)))
        .or_else(|| groups.first())?;
    pair(entry.get("maker"), entry.get("taker"))
}

fn from_fee_rate_list(row: &Value) -> Option<FeeQuote> {
    let list = row.get("feeRate")?.as_str()?;
    let mut parts = list.split(',').map(|p| Value::String(p.to_string()));
    let maker = parts.next();
    let taker = parts.next();
    pair(maker.as_ref(), taker.as_ref())
}

/// Resolves maker/taker from one data row.
pub fn extract(row: &Value, group_id: Option<&str>) -> Option<(FeeQuote, FeeSource)> {
    from_fee_group(row, group_id)
        .map(|q| (q, FeeSource::FeeGroup))
        .or_else(|| pair(row.get("maker"), row.get("taker")).map(|q| (q, FeeSource::Legacy)))
        .or_else(|| pair(row.get("makerU"), row.get("takerU")).map(|q| (q, FeeSource::Unified)))
        .or_else(|| from_fee_rate_list(row).map(|q| (q, FeeSource::FeeRateList)))
}
