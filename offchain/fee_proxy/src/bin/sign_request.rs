use anyhow::{Context, Result};
use clap::Parser;
use fee_proxy::okx::{FeeQuery, OkxClient};
use fee_proxy::signer::{timestamp_iso, trade_fee_path, RequestSigner};
use fee_proxy::ProxyConfig;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "sign-request", about = "Sign an OKX trade-fee request with the credentials from the environment")]
struct Args {
    #[arg(long, default_value = "SWAP")]
    inst_type: String,
    #[arg(long)]
    inst_id: Option<String>,
    /// only used with --fetch, to pick a feeGroup entry
    #[arg(long)]
    group_id: Option<String>,
    /// fixed timestamp instead of now, for reproducing a signature
    #[arg(long)]
    timestamp: Option<String>,
    /// send the request and print the resolved maker/taker instead
    #[arg(long, default_value_t = false)]
    fetch: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedOutput {
    timestamp: String,
    method: String,
    request_path: String,
    prehash: String,
    signature: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ProxyConfig::from_env().context("failed to load configuration")?;
    let creds = config.credentials()?;

    if args.fetch {
        let client = OkxClient::new(config.base_url.clone(), config.timeout)?;
        let query = FeeQuery { inst_type: args.inst_type, group_id: args.group_id, inst_id: args.inst_id };
        let quote = client.trade_fee(&creds, &query).await?;
        println!("{}", serde_json::to_string_pretty(&quote)?);
        return Ok(());
    }

    let path = trade_fee_path(&args.inst_type, args.inst_id.as_deref())?;
    let timestamp = args.timestamp.unwrap_or_else(timestamp_iso);
    let prehash = RequestSigner::prehash(&timestamp, "GET", &path);
    let signed = RequestSigner::new(creds.api_secret).sign(timestamp, "GET", path)?;
    let out = SignedOutput {
        timestamp: signed.timestamp,
        method: signed.method,
        request_path: signed.request_path,
        prehash,
        signature: signed.signature,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
