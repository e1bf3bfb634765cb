use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side { Long, Short }

impl Side {
    /// Splits a signed contract count into side and magnitude.
    /// Zero is treated as long.
    pub fn from_signed_contracts(contracts: f64) -> (Side, f64) {
        if contracts < 0.0 { (Side::Short, -contracts) } else { (Side::Long, contracts) }
    }
}

/// Which way position value scales with price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Denomination {
    /// USDT-margined: value = face × contracts × price
    #[serde(alias = "usdt")]
    Linear,
    /// coin-margined: value = face × contracts / price
    #[serde(alias = "coin")]
    Inverse,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeeRole { Maker, Taker }

/// Unit a caller-supplied rate is expressed in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    Fraction,
    #[default]
    Percent,
    BasisPoints,
}

impl RateUnit {
    pub fn to_fraction(self, v: f64) -> f64 {
        match self {
            RateUnit::Fraction => v,
            RateUnit::Percent => v / 100.0,
            RateUnit::BasisPoints => v / 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ContractSpec {
    pub face_value: f64,
    /// unsigned magnitude; direction lives in `side`
    pub contracts: f64,
    pub side: Side,
}

impl ContractSpec {
    pub fn new(face_value: f64, contracts: f64, side: Side) -> Self {
        Self { face_value, contracts: contracts.abs(), side }
    }

    /// Builds a spec from a signed count, taking the side from its sign.
    pub fn from_signed(face_value: f64, contracts: f64) -> Self {
        let (side, contracts) = Side::from_signed_contracts(contracts);
        Self { face_value, contracts, side }
    }

    /// face × contracts, the coin or USD size the price is applied to
    pub fn size(&self) -> f64 {
        self.face_value * self.contracts
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceSet {
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub mark_price: Option<f64>,
}

/// Rates as decimal fractions. Convert with [`RateUnit::to_fraction`] at the boundary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RateSet {
    pub maker_fee_rate: f64,
    pub taker_fee_rate: f64,
    pub maintenance_margin_rate: f64,
    pub funding_rate: f64,
    pub liquidation_fee_rate: f64,
}

impl RateSet {
    pub fn fee_rate(&self, role: FeeRole) -> f64 {
        match role {
            FeeRole::Maker => self.maker_fee_rate,
            FeeRole::Taker => self.taker_fee_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MarginState {
    pub margin_balance: f64,
    pub effective_margin: Option<f64>,
    pub reduce_only_fee: Option<f64>,
}

/// How many fractional digits a result is shown with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Amount,
    Price,
    Percent,
    Ratio,
}

impl Precision {
    pub fn digits(self) -> usize {
        match self {
            Precision::Amount | Precision::Price => 8,
            Precision::Percent => 4,
            Precision::Ratio => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    pub formula: String,
    pub substituted: String,
}

/// Result of one formula: the unrounded value plus its derivation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Calculation {
    pub value: f64,
    pub precision: Precision,
    pub explanation: Explanation,
}

impl Calculation {
    pub fn new(value: f64, precision: Precision, formula: impl Into<String>, substituted: impl Into<String>) -> Self {
        Self {
            value,
            precision,
            explanation: Explanation { formula: formula.into(), substituted: substituted.into() },
        }
    }

    pub fn display(&self) -> String {
        let text = crate::format::format_fixed(self.value, self.precision.digits());
        match self.precision {
            Precision::Percent | Precision::Ratio => format!("{text} %"),
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_contracts_split_into_side_and_magnitude() {
        assert_eq!(Side::from_signed_contracts(-100.0), (Side::Short, 100.0));
        assert_eq!(Side::from_signed_contracts(5.0), (Side::Long, 5.0));
        let spec = ContractSpec::from_signed(0.01, -3.0);
        assert_eq!(spec.side, Side::Short);
        assert_eq!(spec.contracts, 3.0);
    }

    #[test]
    fn test_rate_units_convert_to_fraction() {
        assert_eq!(RateUnit::Percent.to_fraction(0.5), 0.005);
        assert_eq!(RateUnit::BasisPoints.to_fraction(5.0), 0.0005);
        assert_eq!(RateUnit::Fraction.to_fraction(0.02), 0.02);
    }

    #[test]
    fn test_denomination_accepts_aliases() {
        let d: Denomination = serde_json::from_str("\"coin\"").unwrap();
        assert_eq!(d, Denomination::Inverse);
        let d: Denomination = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(d, Denomination::Linear);
    }

    #[test]
    fn test_fee_rate_by_role() {
        let rates = RateSet { maker_fee_rate: 0.0002, taker_fee_rate: 0.0005, ..Default::default() };
        assert_eq!(rates.fee_rate(FeeRole::Maker), 0.0002);
        assert_eq!(rates.fee_rate(FeeRole::Taker), 0.0005);
    }
}
