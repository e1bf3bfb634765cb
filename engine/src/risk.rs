use crate::format::num;
use crate::formula::{pnl, position_value};
use crate::input::{ensure_all_finite, ensure_all_positive, non_zero};
use crate::{Calculation, ContractSpec, Denomination, DomainError, FeeRole, MarginState, PriceSet, Precision, RateSet, Side};

pub fn initial_margin(
    mode: Denomination,
    spec: &ContractSpec,
    entry_price: f64,
    leverage: f64,
) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[
        ("face value", spec.face_value),
        ("contracts", spec.contracts),
        ("open price", entry_price),
        ("leverage", leverage),
    ])?;
    ensure_all_positive(&[("face value", spec.face_value), ("open price", entry_price)])?;
    non_zero("leverage", leverage)?;
    let (v, n, pe, l) = (num(spec.face_value), num(spec.contracts), num(entry_price), num(leverage));
    match mode {
        // initial margin = notional / leverage
        Denomination::Linear => Ok(Calculation::new(
            spec.face_value * entry_price * spec.contracts / leverage,
            Precision::Amount,
            "initial margin = face value × open price × contracts / leverage",
            format!("= {v} × {pe} × {n} / {l}"),
        )),
        Denomination::Inverse => Ok(Calculation::new(
            spec.face_value / entry_price * spec.contracts / leverage,
            Precision::Amount,
            "initial margin = face value / open price × contracts / leverage",
            format!("= {v} / {pe} × {n} / {l}"),
        )),
    }
}

pub fn maintenance_margin(
    mode: Denomination,
    spec: &ContractSpec,
    mark_price: f64,
    maintenance_margin_rate: f64,
) -> Result<Calculation, DomainError> {
    let value = position_value(mode, spec, mark_price)?;
    ensure_all_finite(&[("maintenance margin rate", maintenance_margin_rate)])?;
    let (v, n, pm, mmr) = (num(spec.face_value), num(spec.contracts), num(mark_price), num(maintenance_margin_rate));
    let (formula, substituted) = match mode {
        Denomination::Linear => (
            "maintenance margin = face value × contracts × mark price × maintenance margin rate",
            format!("= {v} × {n} × {pm} × {mmr}"),
        ),
        Denomination::Inverse => (
            "maintenance margin = face value × contracts / mark price × maintenance margin rate",
            format!("= {v} × {n} / {pm} × {mmr}"),
        ),
    };
    Ok(Calculation::new(value.value * maintenance_margin_rate, Precision::Amount, formula, substituted))
}

/// Single-asset cross margin ratio, in percent:
/// `(margin balance + pnl) / (position value × (mmr + fee rate))`.
/// `fee_role` picks which of the maker/taker rates stands in for the
/// reduce-only fee.
pub fn margin_ratio_single(
    mode: Denomination,
    spec: &ContractSpec,
    mark_price: f64,
    margin: &MarginState,
    unrealized_pnl: f64,
    rates: &RateSet,
    fee_role: FeeRole,
) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[
        ("margin balance", margin.margin_balance),
        ("unrealized pnl", unrealized_pnl),
        ("maintenance margin rate", rates.maintenance_margin_rate),
        ("fee rate", rates.fee_rate(fee_role)),
    ])?;
    let value = position_value(mode, spec, mark_price)?;
    let mmr = rates.maintenance_margin_rate;
    let fr = rates.fee_rate(fee_role);
    let denom = non_zero(
        "position value × (maintenance margin rate + fee rate)",
        value.value * (mmr + fr),
    )?;
    let equity = margin.margin_balance + unrealized_pnl;
    let op = match mode {
        Denomination::Linear => "×",
        Denomination::Inverse => "/",
    };
    Ok(Calculation::new(
        equity / denom * 100.0,
        Precision::Percent,
        format!("margin ratio = (margin balance + pnl) / (face value × contracts {op} mark price × (maintenance margin rate + fee rate)) × 100%"),
        format!(
            "= ({} + {}) / ({} × {} {op} {} × ({} + {})) × 100%",
            num(margin.margin_balance),
            num(unrealized_pnl),
            num(spec.face_value),
            num(spec.contracts),
            num(mark_price),
            num(mmr),
            num(fr),
        ),
    ))
}

/// Same as [`margin_ratio_single`], with the pnl taken from the position's
/// open and close prices.
pub fn margin_ratio_single_at_prices(
    mode: Denomination,
    spec: &ContractSpec,
    prices: &PriceSet,
    margin: &MarginState,
    rates: &RateSet,
    fee_role: FeeRole,
) -> Result<Calculation, DomainError> {
    let mut missing = Vec::new();
    if prices.exit_price.is_none() {
        missing.push("close price");
    }
    if prices.mark_price.is_none() {
        missing.push("mark price");
    }
    match (prices.exit_price, prices.mark_price) {
        (Some(close), Some(mark)) => {
            let unrealized = pnl(mode, spec, prices.entry_price, close)?;
            margin_ratio_single(mode, spec, mark, margin, unrealized.value, rates, fee_role)
        }
        _ => Err(DomainError::MissingFields(missing)),
    }
}

/// Multi-asset cross margin ratio, in percent:
/// `effective margin / (maintenance margin + reduce-only fee)`.
/// A missing reduce-only fee counts as zero.
pub fn margin_ratio_cross(margin: &MarginState, maintenance_margin: f64) -> Result<Calculation, DomainError> {
    let effective = margin
        .effective_margin
        .ok_or_else(|| DomainError::MissingFields(vec!["effective margin"]))?;
    let reduce_fee = margin.reduce_only_fee.unwrap_or(0.0);
    ensure_all_finite(&[
        ("effective margin", effective),
        ("maintenance margin", maintenance_margin),
        ("reduce-only fee", reduce_fee),
    ])?;
    let denom = non_zero("maintenance margin + reduce-only fee", maintenance_margin + reduce_fee)?;
    Ok(Calculation::new(
        effective / denom * 100.0,
        Precision::Percent,
        "margin ratio = effective margin / (maintenance margin + reduce-only fee) × 100%",
        format!("= {} / ({} + {}) × 100%", num(effective), num(maintenance_margin), num(reduce_fee)),
    ))
}

/// Estimated liquidation price: the mark price at which
/// `margin balance + pnl` falls to `position value × (mmr + liquidation fee rate)`.
///
/// Linear, with `S = face × contracts`:
/// - long:  `(balance - S × entry) / (S × (mmr + lfr - 1))`
/// - short: `(balance + S × entry) / (S × (mmr + lfr + 1))`
///
/// Inverse:
/// - long:  `S × (mmr + lfr + 1) / (balance + S / entry)`
/// - short: `S × (mmr + lfr - 1) / (balance - S / entry)`
///
/// The result is not clamped; a non-positive price means the balance covers
/// any adverse move.
pub fn liquidation_price(
    mode: Denomination,
    spec: &ContractSpec,
    entry_price: f64,
    margin: &MarginState,
    rates: &RateSet,
) -> Result<Calculation, DomainError> {
    let mb = margin.margin_balance;
    let mmr = rates.maintenance_margin_rate;
    let lfr = rates.liquidation_fee_rate;
    ensure_all_finite(&[
        ("face value", spec.face_value),
        ("contracts", spec.contracts),
        ("open price", entry_price),
        ("margin balance", mb),
        ("maintenance margin rate", mmr),
        ("liquidation fee rate", lfr),
    ])?;
    ensure_all_positive(&[("face value", spec.face_value), ("open price", entry_price)])?;
    non_zero("contracts", spec.contracts)?;
    let size = spec.size();
    let (b, v, n, pe, m, l) = (num(mb), num(spec.face_value), num(spec.contracts), num(entry_price), num(mmr), num(lfr));

    let calc = match (mode, spec.side) {
        (Denomination::Linear, Side::Long) => {
            let denom = non_zero(
                "face value × contracts × (maintenance margin rate + liquidation fee rate - 1)",
                size * (mmr + lfr - 1.0),
            )?;
            Calculation::new(
                (mb - size * entry_price) / denom,
                Precision::Price,
                "long liquidation price = (margin balance - face value × contracts × open price) / (face value × contracts × (maintenance margin rate + liquidation fee rate - 1))",
                format!("= ({b} - {v} × {n} × {pe}) / ({v} × {n} × ({m} + {l} - 1))"),
            )
        }
        (Denomination::Linear, Side::Short) => {
            let denom = non_zero(
                "face value × contracts × (maintenance margin rate + liquidation fee rate + 1)",
                size * (mmr + lfr + 1.0),
            )?;
            Calculation::new(
                (mb + size * entry_price) / denom,
                Precision::Price,
                "short liquidation price = (margin balance + face value × contracts × open price) / (face value × contracts × (maintenance margin rate + liquidation fee rate + 1))",
                format!("= ({b} + {v} × {n} × {pe}) / ({v} × {n} × ({m} + {l} + 1))"),
            )
        }
        (Denomination::Inverse, Side::Long) => {
            let denom = non_zero("margin balance + face value × contracts / open price", mb + size / entry_price)?;
            Calculation::new(
                size * (mmr + lfr + 1.0) / denom,
                Precision::Price,
                "long liquidation price = face value × contracts × (maintenance margin rate + liquidation fee rate + 1) / (margin balance + face value × contracts / open price)",
                format!("= {v} × {n} × ({m} + {l} + 1) / ({b} + {v} × {n} / {pe})"),
            )
        }
        (Denomination::Inverse, Side::Short) => {
            let denom = non_zero("margin balance - face value × contracts / open price", mb - size / entry_price)?;
            Calculation::new(
                size * (mmr + lfr - 1.0) / denom,
                Precision::Price,
                "short liquidation price = face value × contracts × (maintenance margin rate + liquidation fee rate - 1) / (margin balance - face value × contracts / open price)",
                format!("= {v} × {n} × ({m} + {l} - 1) / ({b} - {v} × {n} / {pe})"),
            )
        }
    };
    Ok(calc)
}

/// Both sides' estimates for one set of inputs. Each side fails on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationEstimates {
    pub long: Result<Calculation, DomainError>,
    pub short: Result<Calculation, DomainError>,
}

pub fn liquidation_prices(
    mode: Denomination,
    face_value: f64,
    contracts: f64,
    entry_price: f64,
    margin: &MarginState,
    rates: &RateSet,
) -> LiquidationEstimates {
    let long = ContractSpec::new(face_value, contracts, Side::Long);
    let short = ContractSpec::new(face_value, contracts, Side::Short);
    LiquidationEstimates {
        long: liquidation_price(mode, &long, entry_price, margin, rates),
        short: liquidation_price(mode, &short, entry_price, margin, rates),
    }
}
