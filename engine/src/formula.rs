//! Trade-level formulas: entry price averaging, fees, PnL, ROI, position value, funding.
//!
//! Every function takes the denomination explicitly and never mixes the linear
//! and inverse forms inside one calculation.

use crate::format::num;
use crate::input::{ensure_all_finite, ensure_all_positive, ensure_finite, ensure_positive, non_zero};
use crate::risk::initial_margin;
use crate::{Calculation, ContractSpec, Denomination, DomainError, PriceSet, Precision, Side};

/// Average entry after adding `new_qty` contracts at `new_price` to an
/// existing `old_qty` at `old_price`. Linear averages prices by contracts,
/// inverse averages them harmonically (by coin value).
pub fn avg_entry_price(
    mode: Denomination,
    face_value: f64,
    old_qty: f64,
    old_price: f64,
    new_qty: f64,
    new_price: f64,
) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[
        ("face value", face_value),
        ("old quantity", old_qty),
        ("old price", old_price),
        ("new quantity", new_qty),
        ("new price", new_price),
    ])?;
    ensure_positive("face value", face_value)?;
    // an empty leg's price is never used
    if old_qty != 0.0 {
        ensure_positive("old price", old_price)?;
    }
    if new_qty != 0.0 {
        ensure_positive("new price", new_price)?;
    }
    non_zero("old quantity + new quantity", old_qty + new_qty)?;
    let (v, oq, op, nq, np) = (num(face_value), num(old_qty), num(old_price), num(new_qty), num(new_price));

    match mode {
        Denomination::Linear => {
            let value = if old_qty == 0.0 {
                new_price
            } else if new_qty == 0.0 {
                old_price
            } else {
                // face value cancels out
                (old_qty * old_price + new_qty * new_price) / (old_qty + new_qty)
            };
            Ok(Calculation::new(
                value,
                Precision::Price,
                "avg price = (face × old qty × old price + face × new qty × new price) / (face × (old qty + new qty))",
                format!("= ({v} × {oq} × {op} + {v} × {nq} × {np}) / ({v} × ({oq} + {nq}))"),
            ))
        }
        Denomination::Inverse => {
            let value = if old_qty == 0.0 {
                new_price
            } else if new_qty == 0.0 {
                old_price
            } else {
                let coin = non_zero(
                    "face × old qty / old price + face × new qty / new price",
                    face_value * old_qty / old_price + face_value * new_qty / new_price,
                )?;
                face_value * (old_qty + new_qty) / coin
            };
            Ok(Calculation::new(
                value,
                Precision::Price,
                "avg price = face × (old qty + new qty) / (face × old qty / old price + face × new qty / new price)",
                format!("= {v} × ({oq} + {nq}) / ({v} × {oq} / {op} + {v} × {nq} / {np})"),
            ))
        }
    }
}

/// Fee for one fill. `rate` is a decimal fraction; a negative rate is a
/// maker rebate and gives a negative fee.
pub fn fee(mode: Denomination, spec: &ContractSpec, price: f64, rate: f64) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[
        ("face value", spec.face_value),
        ("contracts", spec.contracts),
        ("price", price),
        ("fee rate", rate),
    ])?;
    ensure_all_positive(&[("face value", spec.face_value), ("price", price)])?;
    let (v, n, p, r) = (num(spec.face_value), num(spec.contracts), num(price), num(rate));
    match mode {
        Denomination::Linear => Ok(Calculation::new(
            spec.size() * price * rate,
            Precision::Amount,
            "fee = face value × contracts × price × fee rate",
            format!("= {v} × {n} × {p} × {r}"),
        )),
        Denomination::Inverse => Ok(Calculation::new(
            spec.size() / price * rate,
            Precision::Amount,
            "fee = face value × contracts / price × fee rate",
            format!("= {v} × {n} / {p} × {r}"),
        )),
    }
}

/// Opening and closing fees of one position; either leg may be unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripFees {
    pub open: Option<Calculation>,
    pub close: Option<Calculation>,
    pub total: f64,
}

impl RoundTripFees {
    pub fn to_calculation(&self) -> Calculation {
        let legs: Vec<&Calculation> = self.open.iter().chain(self.close.iter()).collect();
        let formula = legs.iter().map(|c| c.explanation.formula.trim_start_matches("fee = ")).collect::<Vec<_>>();
        let substituted = legs
            .iter()
            .map(|c| format!("({})", c.explanation.substituted.trim_start_matches("= ")))
            .collect::<Vec<_>>();
        Calculation::new(
            self.total,
            Precision::Amount,
            format!("total fee = {}", formula.join(" + ")),
            format!("= {}", substituted.join(" + ")),
        )
    }
}

pub fn round_trip_fees(
    mode: Denomination,
    spec: &ContractSpec,
    entry_price: Option<f64>,
    close_price: Option<f64>,
    open_rate: f64,
    close_rate: f64,
) -> Result<RoundTripFees, DomainError> {
    if entry_price.is_none() && close_price.is_none() {
        return Err(DomainError::MissingFields(vec!["open price", "close price"]));
    }
    let open = entry_price.map(|p| fee(mode, spec, p, open_rate)).transpose()?;
    let close = close_price.map(|p| fee(mode, spec, p, close_rate)).transpose()?;
    let total = open.as_ref().map_or(0.0, |c| c.value) + close.as_ref().map_or(0.0, |c| c.value);
    Ok(RoundTripFees { open, close, total })
}

/// Realised PnL of closing the whole position, before fees.
pub fn pnl(mode: Denomination, spec: &ContractSpec, entry_price: f64, close_price: f64) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[
        ("face value", spec.face_value),
        ("contracts", spec.contracts),
        ("open price", entry_price),
        ("close price", close_price),
    ])?;
    ensure_all_positive(&[("face value", spec.face_value), ("open price", entry_price), ("close price", close_price)])?;
    let (v, n, pe, pc) = (num(spec.face_value), num(spec.contracts), num(entry_price), num(close_price));
    let size = spec.size();
    let calc = match (mode, spec.side) {
        (Denomination::Linear, Side::Long) => Calculation::new(
            size * (close_price - entry_price),
            Precision::Amount,
            "long pnl = face value × contracts × (close price - open price)",
            format!("= {v} × {n} × ({pc} - {pe})"),
        ),
        (Denomination::Linear, Side::Short) => Calculation::new(
            size * (entry_price - close_price),
            Precision::Amount,
            "short pnl = face value × contracts × (open price - close price)",
            format!("= {v} × {n} × ({pe} - {pc})"),
        ),
        (Denomination::Inverse, Side::Long) => Calculation::new(
            size * (1.0 / entry_price - 1.0 / close_price),
            Precision::Amount,
            "long pnl = face value × contracts × (1 / open price - 1 / close price)",
            format!("= {v} × {n} × (1 / {pe} - 1 / {pc})"),
        ),
        (Denomination::Inverse, Side::Short) => Calculation::new(
            size * (1.0 / close_price - 1.0 / entry_price),
            Precision::Amount,
            "short pnl = face value × contracts × (1 / close price - 1 / open price)",
            format!("= {v} × {n} × (1 / {pc} - 1 / {pe})"),
        ),
    };
    Ok(calc)
}

/// Return on the initial margin, in percent.
pub fn roi(pnl: f64, initial_margin: f64) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[("pnl", pnl), ("initial margin", initial_margin)])?;
    non_zero("initial margin", initial_margin)?;
    Ok(Calculation::new(
        pnl / initial_margin * 100.0,
        Precision::Percent,
        "roi = pnl / initial margin × 100%",
        format!("= {} / {} × 100%", num(pnl), num(initial_margin)),
    ))
}

/// ROI of a whole position: PnL over the margin posted at entry. Trading
/// `fees` and a `funding_fee` paid while holding are deducted when given; a
/// funding fee received is passed as a negative amount.
pub fn position_roi(
    mode: Denomination,
    spec: &ContractSpec,
    prices: &PriceSet,
    leverage: f64,
    fees: Option<f64>,
    funding_fee: Option<f64>,
) -> Result<Calculation, DomainError> {
    let close_price = prices.exit_price.ok_or_else(|| DomainError::MissingFields(vec!["close price"]))?;
    let gross = pnl(mode, spec, prices.entry_price, close_price)?;
    let margin = initial_margin(mode, spec, prices.entry_price, leverage)?;
    let mut net = gross.value;
    let mut deductions = String::new();
    if let Some(f) = fees {
        net -= ensure_finite("fees", f)?;
        deductions.push_str(" - fees");
    }
    if let Some(f) = funding_fee {
        net -= ensure_finite("funding fee", f)?;
        deductions.push_str(" - funding fee");
    }
    let mut calc = roi(net, margin.value)?;
    if !deductions.is_empty() {
        calc.explanation.formula = format!("roi = (pnl{deductions}) / initial margin × 100%");
    }
    Ok(calc)
}

pub fn position_value(mode: Denomination, spec: &ContractSpec, mark_price: f64) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[
        ("face value", spec.face_value),
        ("contracts", spec.contracts),
        ("mark price", mark_price),
    ])?;
    ensure_all_positive(&[("face value", spec.face_value), ("mark price", mark_price)])?;
    let (v, n, pm) = (num(spec.face_value), num(spec.contracts), num(mark_price));
    match mode {
        Denomination::Linear => Ok(Calculation::new(
            spec.size() * mark_price,
            Precision::Amount,
            "position value = face value × contracts × mark price",
            format!("= {v} × {n} × {pm}"),
        )),
        Denomination::Inverse => Ok(Calculation::new(
            spec.size() / mark_price,
            Precision::Amount,
            "position value = face value × contracts / mark price",
            format!("= {v} × {n} / {pm}"),
        )),
    }
}

pub fn funding_fee(
    mode: Denomination,
    spec: &ContractSpec,
    mark_price: f64,
    funding_rate: f64,
) -> Result<Calculation, DomainError> {
    let value = position_value(mode, spec, mark_price)?;
    funding_fee_on_value(value.value, funding_rate)
}

/// Funding for a caller-supplied position value.
pub fn funding_fee_on_value(position_value: f64, funding_rate: f64) -> Result<Calculation, DomainError> {
    ensure_all_finite(&[("position value", position_value), ("funding rate", funding_rate)])?;
    Ok(Calculation::new(
        position_value * funding_rate,
        Precision::Amount,
        "funding fee = position value × funding rate",
        format!("= {} × {}", num(position_value), num(funding_rate)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn spec(n: f64, side: Side) -> ContractSpec {
        ContractSpec::new(0.01, n, side)
    }

    #[test]
    fn test_avg_entry_linear() {
        let c = avg_entry_price(Denomination::Linear, 0.01, 100.0, 1000.0, 50.0, 2000.0).unwrap();
        assert!(approx(c.value, 200_000.0 / 150.0));
        assert_eq!(crate::format::format_fixed(c.value, 4), "1333.3333");
        assert_eq!(c.explanation.substituted, "= (0.01 × 100 × 1000 + 0.01 × 50 × 2000) / (0.01 × (100 + 50))");
    }

    #[test]
    fn test_avg_entry_inverse_is_harmonic() {
        let c = avg_entry_price(Denomination::Inverse, 100.0, 1.0, 40_000.0, 1.0, 60_000.0).unwrap();
        // 2 / (1/40000 + 1/60000) = 48000
        assert!(approx(c.value, 48_000.0));
    }

    #[test]
    fn test_avg_entry_boundaries_are_exact() {
        for mode in [Denomination::Linear, Denomination::Inverse] {
            assert_eq!(avg_entry_price(mode, 0.01, 0.0, 1000.0, 3.0, 0.1).unwrap().value, 0.1);
            assert_eq!(avg_entry_price(mode, 0.01, 7.0, 0.3, 0.0, 2000.0).unwrap().value, 0.3);
        }
    }

    #[test]
    fn test_avg_entry_zero_total_rejected() {
        let err = avg_entry_price(Denomination::Linear, 0.01, 10.0, 1000.0, -10.0, 2000.0).unwrap_err();
        assert_eq!(err, DomainError::ZeroDenominator { condition: "old quantity + new quantity" });
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_fee_usdt_margined() {
        let rate = crate::RateUnit::Percent.to_fraction(0.006);
        let c = fee(Denomination::Linear, &spec(100.0, Side::Long), 1000.0, rate).unwrap();
        assert!(approx(c.value, 0.06));
    }

    #[test]
    fn test_fee_monotonic_and_rebate() {
        let s = spec(10.0, Side::Long);
        let mut last = f64::MIN;
        for r in [0.0, 0.0001, 0.0002, 0.0005, 0.001] {
            let v = fee(Denomination::Inverse, &s, 30_000.0, r).unwrap().value;
            assert!(v >= last);
            last = v;
        }
        assert!(fee(Denomination::Linear, &s, 1000.0, -0.0001).unwrap().value < 0.0);
    }

    #[test]
    fn test_fee_rejects_non_finite() {
        let err = fee(Denomination::Linear, &spec(1.0, Side::Long), f64::NAN, 0.0005).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { field: "price", .. }));
    }

    #[test]
    fn test_round_trip_fees() {
        let s = spec(100.0, Side::Long);
        let fees = round_trip_fees(Denomination::Linear, &s, Some(1000.0), Some(1200.0), 0.0002, 0.0005).unwrap();
        assert!(approx(fees.total, 0.2 + 0.6));
        let one_leg = round_trip_fees(Denomination::Linear, &s, None, Some(1200.0), 0.0002, 0.0005).unwrap();
        assert!(one_leg.open.is_none());
        assert!(approx(one_leg.total, 0.6));
        assert!(round_trip_fees(Denomination::Linear, &s, None, None, 0.0, 0.0).is_err());
        assert!(fees.to_calculation().explanation.formula.starts_with("total fee = face value"));
    }

    #[test]
    fn test_pnl_long_short_symmetry() {
        for mode in [Denomination::Linear, Denomination::Inverse] {
            let long = pnl(mode, &spec(100.0, Side::Long), 1000.0, 1234.5).unwrap().value;
            let short = pnl(mode, &spec(100.0, Side::Short), 1000.0, 1234.5).unwrap().value;
            assert_eq!(long, -short);
        }
        let long = pnl(Denomination::Linear, &spec(100.0, Side::Long), 1000.0, 1200.0).unwrap();
        assert!(approx(long.value, 200.0));
    }

    #[test]
    fn test_pnl_inverse() {
        let s = ContractSpec::new(100.0, 10.0, Side::Long);
        let c = pnl(Denomination::Inverse, &s, 40_000.0, 50_000.0).unwrap();
        assert!(approx(c.value, 1000.0 * (1.0 / 40_000.0 - 1.0 / 50_000.0)));
        assert!(pnl(Denomination::Inverse, &s, 0.0, 50_000.0).is_err());
    }

    #[test]
    fn test_pnl_is_deterministic() {
        let s = spec(3.0, Side::Short);
        let a = pnl(Denomination::Inverse, &s, 0.3, 0.7).unwrap();
        let b = pnl(Denomination::Inverse, &s, 0.3, 0.7).unwrap();
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }

    #[test]
    fn test_roi() {
        let c = roi(-50.0, 200.0).unwrap();
        assert!(approx(c.value, -25.0));
        assert_eq!(c.display(), "-25.0000 %");
        assert!(roi(10.0, 0.0).is_err());
    }

    #[test]
    fn test_position_roi_net_of_fees() {
        let prices = PriceSet { entry_price: 1000.0, exit_price: Some(1100.0), mark_price: None };
        let s = spec(100.0, Side::Long);
        // pnl 100, margin 1000 / 10 = 100
        let gross = position_roi(Denomination::Linear, &s, &prices, 10.0, None, None).unwrap();
        assert!(approx(gross.value, 100.0));
        let net = position_roi(Denomination::Linear, &s, &prices, 10.0, Some(10.0), None).unwrap();
        assert!(approx(net.value, 90.0));
        let no_exit = PriceSet { exit_price: None, ..prices };
        assert!(position_roi(Denomination::Linear, &s, &no_exit, 10.0, None, None).is_err());
    }

    #[test]
    fn test_position_value_and_funding() {
        let s = spec(100.0, Side::Long);
        assert!(approx(position_value(Denomination::Linear, &s, 1000.0).unwrap().value, 1000.0));
        let inv = ContractSpec::new(100.0, 5.0, Side::Short);
        assert!(approx(position_value(Denomination::Inverse, &inv, 50_000.0).unwrap().value, 0.01));
        assert!(position_value(Denomination::Inverse, &inv, 0.0).is_err());
        let f = funding_fee(Denomination::Linear, &s, 1000.0, 0.0001).unwrap();
        assert!(approx(f.value, 0.1));
        assert!(approx(funding_fee_on_value(1000.0, 0.0001).unwrap().value, 0.1));
    }

    #[test]
    fn test_position_roi_deducts_funding() {
        let prices = PriceSet { entry_price: 1000.0, exit_price: Some(1100.0), mark_price: None };
        let s = spec(100.0, Side::Long);
        let c = position_roi(Denomination::Linear, &s, &prices, 10.0, Some(10.0), Some(5.0)).unwrap();
        assert!(approx(c.value, 85.0));
        assert_eq!(c.explanation.formula, "roi = (pnl - fees - funding fee) / initial margin × 100%");
        let received = position_roi(Denomination::Linear, &s, &prices, 10.0, None, Some(-5.0)).unwrap();
        assert!(approx(received.value, 105.0));
    }

    #[test]
    fn test_non_positive_face_value_and_prices_rejected() {
        let bad_face = ContractSpec::new(-0.01, 100.0, Side::Long);
        let err = fee(Denomination::Linear, &bad_face, 1000.0, 0.00006).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { field: "face value", .. }));
        let zero_face = ContractSpec::new(0.0, 100.0, Side::Long);
        assert!(position_value(Denomination::Linear, &zero_face, 1000.0).is_err());

        let s = spec(100.0, Side::Long);
        let err = pnl(Denomination::Linear, &s, -1000.0, 1200.0).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { field: "open price", .. }));
        let err = position_value(Denomination::Inverse, &s, 0.0).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { field: "mark price", .. }));
        assert!(avg_entry_price(Denomination::Inverse, 100.0, 1.0, 0.0, 1.0, 60_000.0).is_err());
        assert_eq!(avg_entry_price(Denomination::Inverse, 100.0, 0.0, 0.0, 1.0, 60_000.0).unwrap().value, 60_000.0);
        assert!(fee(Denomination::Linear, &s, -1000.0, 0.0005).is_err());
    }
}
