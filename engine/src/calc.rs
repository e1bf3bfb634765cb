//! Operation-keyed entry point for callers that hold raw form data
//! (JSON from a browser form, CLI flags) rather than typed inputs.
//!
//! Numeric fields accept JSON numbers or user-typed strings. Blank text counts
//! as missing; text that is not a number is rejected with the field's name.
//! Rate fields are percentages unless `rate_unit` says otherwise.

use serde::Deserialize;

use crate::input::{Field, Required};
use crate::{formula, risk};
use crate::risk::LiquidationEstimates;
use crate::{Calculation, ContractSpec, Denomination, DomainError, FeeRole, MarginState, PriceSet, RateSet, RateUnit, Side};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CalcRequest {
    AvgEntryPrice(AvgEntryInput),
    Fee(FeeInput),
    RoundTripFees(RoundTripFeeInput),
    Pnl(PnlInput),
    Roi(RoiInput),
    PositionRoi(PositionRoiInput),
    InitialMargin(InitialMarginInput),
    PositionValue(PositionValueInput),
    MaintenanceMargin(MaintenanceMarginInput),
    MarginRatioSingle(MarginRatioSingleInput),
    MarginRatioCross(MarginRatioCrossInput),
    FundingFee(FundingFeeInput),
    LiquidationPrice(LiquidationInput),
}

impl CalcRequest {
    pub fn op_name(&self) -> &'static str {
        match self {
            CalcRequest::AvgEntryPrice(_) => "avg_entry_price",
            CalcRequest::Fee(_) => "fee",
            CalcRequest::RoundTripFees(_) => "round_trip_fees",
            CalcRequest::Pnl(_) => "pnl",
            CalcRequest::Roi(_) => "roi",
            CalcRequest::PositionRoi(_) => "position_roi",
            CalcRequest::InitialMargin(_) => "initial_margin",
            CalcRequest::PositionValue(_) => "position_value",
            CalcRequest::MaintenanceMargin(_) => "maintenance_margin",
            CalcRequest::MarginRatioSingle(_) => "margin_ratio_single",
            CalcRequest::MarginRatioCross(_) => "margin_ratio_cross",
            CalcRequest::FundingFee(_) => "funding_fee",
            CalcRequest::LiquidationPrice(_) => "liquidation_price",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvgEntryInput {
    pub mode: Denomination,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub old_qty: Field,
    #[serde(default)]
    pub old_price: Field,
    #[serde(default)]
    pub new_qty: Field,
    #[serde(default)]
    pub new_price: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeeInput {
    pub mode: Denomination,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub price: Field,
    #[serde(default)]
    pub fee_rate: Field,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundTripFeeInput {
    pub mode: Denomination,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub open_price: Field,
    #[serde(default)]
    pub close_price: Field,
    #[serde(default)]
    pub maker_fee_rate: Field,
    #[serde(default)]
    pub taker_fee_rate: Field,
    #[serde(default = "taker")]
    pub open_role: FeeRole,
    #[serde(default = "taker")]
    pub close_role: FeeRole,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

fn taker() -> FeeRole {
    FeeRole::Taker
}

#[derive(Debug, Clone, Deserialize)]
pub struct PnlInput {
    pub mode: Denomination,
    /// when absent the sign of `contracts` decides
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub open_price: Field,
    #[serde(default)]
    pub close_price: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoiInput {
    #[serde(default)]
    pub pnl: Field,
    #[serde(default)]
    pub initial_margin: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRoiInput {
    pub mode: Denomination,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub open_price: Field,
    #[serde(default)]
    pub close_price: Field,
    #[serde(default)]
    pub leverage: Field,
    #[serde(default)]
    pub fees: Field,
    #[serde(default)]
    pub funding_fee: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitialMarginInput {
    pub mode: Denomination,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub open_price: Field,
    #[serde(default)]
    pub leverage: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionValueInput {
    pub mode: Denomination,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub mark_price: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceMarginInput {
    pub mode: Denomination,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub mark_price: Field,
    #[serde(default)]
    pub maintenance_margin_rate: Field,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarginRatioSingleInput {
    pub mode: Denomination,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub mark_price: Field,
    #[serde(default)]
    pub margin_balance: Field,
    /// takes precedence over open/close prices
    #[serde(default)]
    pub unrealized_pnl: Field,
    #[serde(default)]
    pub open_price: Field,
    #[serde(default)]
    pub close_price: Field,
    #[serde(default)]
    pub maintenance_margin_rate: Field,
    #[serde(default)]
    pub maker_fee_rate: Field,
    #[serde(default)]
    pub taker_fee_rate: Field,
    #[serde(default = "taker")]
    pub close_role: FeeRole,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarginRatioCrossInput {
    pub mode: Denomination,
    #[serde(default)]
    pub effective_margin: Field,
    #[serde(default)]
    pub reduce_only_fee: Field,
    /// when absent it is derived from the position fields below
    #[serde(default)]
    pub maintenance_margin: Field,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub mark_price: Field,
    #[serde(default)]
    pub maintenance_margin_rate: Field,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundingFeeInput {
    pub mode: Denomination,
    /// when absent it is derived from the position fields below
    #[serde(default)]
    pub position_value: Field,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub mark_price: Field,
    #[serde(default)]
    pub funding_rate: Field,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiquidationInput {
    pub mode: Denomination,
    /// `both` estimates long and short together; when absent the sign of
    /// `contracts` decides
    #[serde(default)]
    pub side: Option<SideSelection>,
    #[serde(default)]
    pub face_value: Field,
    #[serde(default)]
    pub contracts: Field,
    #[serde(default)]
    pub open_price: Field,
    #[serde(default)]
    pub margin_balance: Field,
    #[serde(default)]
    pub maintenance_margin_rate: Field,
    #[serde(default)]
    pub liquidation_fee_rate: Field,
    #[serde(default)]
    pub rate_unit: RateUnit,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SideSelection {
    Long,
    Short,
    Both,
}

/// What one request produced. Only a two-sided liquidation request yields
/// more than one figure.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcOutcome {
    Single(Calculation),
    BothSides(LiquidationEstimates),
}

impl CalcOutcome {
    pub fn single(self) -> Option<Calculation> {
        match self {
            CalcOutcome::Single(c) => Some(c),
            CalcOutcome::BothSides(_) => None,
        }
    }
}

fn contract(face_value: f64, contracts: f64, side: Option<Side>) -> ContractSpec {
    match side {
        Some(side) => ContractSpec::new(face_value, contracts, side),
        None => ContractSpec::from_signed(face_value, contracts),
    }
}

/// Runs one operation. Missing and malformed fields are all checked before
/// any arithmetic happens.
pub fn evaluate(req: &CalcRequest) -> Result<CalcOutcome, DomainError> {
    let mut r = Required::new();
    let single = match req {
        CalcRequest::AvgEntryPrice(i) => {
            let face = r.take("face value", &i.face_value);
            let oq = r.take("old quantity", &i.old_qty);
            let op = r.take("old price", &i.old_price);
            let nq = r.take("new quantity", &i.new_qty);
            let np = r.take("new price", &i.new_price);
            r.finish()?;
            formula::avg_entry_price(i.mode, face, oq, op, nq, np)
        }
        CalcRequest::Fee(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let price = r.take("price", &i.price);
            let rate = r.take("fee rate", &i.fee_rate);
            r.finish()?;
            formula::fee(i.mode, &ContractSpec::from_signed(face, n), price, i.rate_unit.to_fraction(rate))
        }
        CalcRequest::RoundTripFees(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let maker = r.take("maker fee rate", &i.maker_fee_rate);
            let taker = r.take("taker fee rate", &i.taker_fee_rate);
            let open_price = r.optional("open price", &i.open_price);
            let close_price = r.optional("close price", &i.close_price);
            r.finish()?;
            let rates = RateSet {
                maker_fee_rate: i.rate_unit.to_fraction(maker),
                taker_fee_rate: i.rate_unit.to_fraction(taker),
                ..Default::default()
            };
            formula::round_trip_fees(
                i.mode,
                &ContractSpec::from_signed(face, n),
                open_price,
                close_price,
                rates.fee_rate(i.open_role),
                rates.fee_rate(i.close_role),
            )
            .map(|fees| fees.to_calculation())
        }
        CalcRequest::Pnl(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let pe = r.take("open price", &i.open_price);
            let pc = r.take("close price", &i.close_price);
            r.finish()?;
            formula::pnl(i.mode, &contract(face, n, i.side), pe, pc)
        }
        CalcRequest::Roi(i) => {
            let pnl = r.take("pnl", &i.pnl);
            let margin = r.take("initial margin", &i.initial_margin);
            r.finish()?;
            formula::roi(pnl, margin)
        }
        CalcRequest::PositionRoi(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let pe = r.take("open price", &i.open_price);
            let pc = r.take("close price", &i.close_price);
            let lev = r.take("leverage", &i.leverage);
            let fees = r.optional("fees", &i.fees);
            let funding = r.optional("funding fee", &i.funding_fee);
            r.finish()?;
            let prices = PriceSet { entry_price: pe, exit_price: Some(pc), mark_price: None };
            formula::position_roi(i.mode, &contract(face, n, i.side), &prices, lev, fees, funding)
        }
        CalcRequest::InitialMargin(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let pe = r.take("open price", &i.open_price);
            let lev = r.take("leverage", &i.leverage);
            r.finish()?;
            risk::initial_margin(i.mode, &ContractSpec::from_signed(face, n), pe, lev)
        }
        CalcRequest::PositionValue(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let pm = r.take("mark price", &i.mark_price);
            r.finish()?;
            formula::position_value(i.mode, &ContractSpec::from_signed(face, n), pm)
        }
        CalcRequest::MaintenanceMargin(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let pm = r.take("mark price", &i.mark_price);
            let mmr = r.take("maintenance margin rate", &i.maintenance_margin_rate);
            r.finish()?;
            risk::maintenance_margin(i.mode, &ContractSpec::from_signed(face, n), pm, i.rate_unit.to_fraction(mmr))
        }
        CalcRequest::MarginRatioSingle(i) => {
            let face = r.take("face value", &i.face_value);
            let n = r.take("contracts", &i.contracts);
            let pm = r.take("mark price", &i.mark_price);
            let mb = r.take("margin balance", &i.margin_balance);
            let mmr = r.take("maintenance margin rate", &i.maintenance_margin_rate);
            let fee_rate = match i.close_role {
                FeeRole::Maker => r.take("maker fee rate", &i.maker_fee_rate),
                FeeRole::Taker => r.take("taker fee rate", &i.taker_fee_rate),
            };
            let unrealized = r.optional("unrealized pnl", &i.unrealized_pnl);
            let open_close = match unrealized {
                Some(_) => None,
                None => Some((r.take("open price", &i.open_price), r.take("close price", &i.close_price))),
            };
            r.finish()?;
            let spec = contract(face, n, i.side);
            let pnl = match (unrealized, open_close) {
                (Some(pnl), _) => pnl,
                (None, Some((pe, pc))) => formula::pnl(i.mode, &spec, pe, pc)?.value,
                (None, None) => return Err(DomainError::MissingFields(vec!["open price", "close price"])),
            };
            let mut rates = RateSet { maintenance_margin_rate: i.rate_unit.to_fraction(mmr), ..Default::default() };
            match i.close_role {
                FeeRole::Maker => rates.maker_fee_rate = i.rate_unit.to_fraction(fee_rate),
                FeeRole::Taker => rates.taker_fee_rate = i.rate_unit.to_fraction(fee_rate),
            }
            let margin = MarginState { margin_balance: mb, ..Default::default() };
            risk::margin_ratio_single(i.mode, &spec, pm, &margin, pnl, &rates, i.close_role)
        }
        CalcRequest::MarginRatioCross(i) => {
            let effective = r.take("effective margin", &i.effective_margin);
            let reduce_only_fee = r.optional("reduce-only fee", &i.reduce_only_fee);
            let supplied_mm = r.optional("maintenance margin", &i.maintenance_margin);
            let position = match supplied_mm {
                Some(_) => None,
                None => Some((
                    r.take("face value", &i.face_value),
                    r.take("contracts", &i.contracts),
                    r.take("mark price", &i.mark_price),
                    r.take("maintenance margin rate", &i.maintenance_margin_rate),
                )),
            };
            r.finish()?;
            let mm = match (supplied_mm, position) {
                (Some(mm), _) => mm,
                (None, Some((face, n, pm, mmr))) => {
                    risk::maintenance_margin(i.mode, &ContractSpec::from_signed(face, n), pm, i.rate_unit.to_fraction(mmr))?
                        .value
                }
                (None, None) => return Err(DomainError::MissingFields(vec!["maintenance margin"])),
            };
            let margin = MarginState { margin_balance: 0.0, effective_margin: Some(effective), reduce_only_fee };
            risk::margin_ratio_cross(&margin, mm)
        }
        CalcRequest::FundingFee(i) => {
            let rate = r.take("funding rate", &i.funding_rate);
            match r.optional("position value", &i.position_value) {
                Some(pv) => {
                    r.finish()?;
                    formula::funding_fee_on_value(pv, i.rate_unit.to_fraction(rate))
                }
                None => {
                    let face = r.take("face value", &i.face_value);
                    let n = r.take("contracts", &i.contracts);
                    let pm = r.take("mark price", &i.mark_price);
                    r.finish()?;
                    formula::funding_fee(i.mode, &ContractSpec::from_signed(face, n), pm, i.rate_unit.to_fraction(rate))
                }
            }
        }
        CalcRequest::LiquidationPrice(i) => return liquidation(i, r),
    };
    single.map(CalcOutcome::Single)
}

fn liquidation(i: &LiquidationInput, mut r: Required) -> Result<CalcOutcome, DomainError> {
    let face = r.take("face value", &i.face_value);
    let n = r.take("contracts", &i.contracts);
    let pe = r.take("open price", &i.open_price);
    let mb = r.take("margin balance", &i.margin_balance);
    let mmr = r.take("maintenance margin rate", &i.maintenance_margin_rate);
    let lfr = r.take("liquidation fee rate", &i.liquidation_fee_rate);
    r.finish()?;
    let rates = RateSet {
        maintenance_margin_rate: i.rate_unit.to_fraction(mmr),
        liquidation_fee_rate: i.rate_unit.to_fraction(lfr),
        ..Default::default()
    };
    let margin = MarginState { margin_balance: mb, ..Default::default() };
    let side = match i.side {
        Some(SideSelection::Both) => {
            return Ok(CalcOutcome::BothSides(risk::liquidation_prices(i.mode, face, n, pe, &margin, &rates)));
        }
        Some(SideSelection::Long) => Some(Side::Long),
        Some(SideSelection::Short) => Some(Side::Short),
        None => None,
    };
    risk::liquidation_price(i.mode, &contract(face, n, side), pe, &margin, &rates).map(CalcOutcome::Single)
}
