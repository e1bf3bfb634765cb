//! Closed-form calculators for perpetual futures positions.
//!
//! Every formula has a linear (USDT-margined) and an inverse (coin-margined)
//! form, selected by [`Denomination`]. Rates are decimal fractions inside the
//! library; [`RateUnit`] converts percentages and basis points at the edge.

pub mod calc;
pub mod error;
pub mod format;
pub mod formula;
pub mod input;
pub mod risk;
pub mod types;

pub use calc::{evaluate, CalcOutcome, CalcRequest, SideSelection};
pub use error::DomainError;
pub use input::Field;
pub use formula::{
    avg_entry_price, fee, funding_fee, funding_fee_on_value, pnl, position_roi, position_value, roi, round_trip_fees,
    RoundTripFees,
};
pub use risk::{
    initial_margin, liquidation_price, liquidation_prices, maintenance_margin, margin_ratio_cross, margin_ratio_single,
    margin_ratio_single_at_prices, LiquidationEstimates,
};
pub use types::*;
