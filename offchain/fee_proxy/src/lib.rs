//! Signed OKX trade-fee proxy and HTTP front for the `engine` calculators.

pub mod config;
pub mod error;
pub mod okx;
pub mod quote;
pub mod routes;
pub mod signer;

pub use config::{Credentials, ProxyConfig};
pub use error::ProxyError;
pub use okx::{FeeQuery, OkxClient};
pub use quote::{FeeQuote, FeeSource};
pub use routes::{router, AppState};
pub use signer::{RequestSigner, SignedRequest};
