//! Auto-buy planner: spends cash on the configured targets in priority order.

use super::logic;
use super::state::{AutoBuyTarget, BuyMode, ConversionKind, GameState};

/// What one planner pass bought.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AutoBuyReport {
    pub levels_bought: u32,
    pub chip_units: u32,
    pub heat_units: u32,
    pub cash_spent: f64,
}

impl AutoBuyReport {
    pub fn is_empty(&self) -> bool {
        self.levels_bought == 0 && self.chip_units == 0 && self.heat_units == 0
    }
}

/// Evaluate every configured target once.
///
/// Targets run in `AutoBuyTarget` order and each one sees the cash left by
/// the previous ones, so the pass never spends more than it started with.
pub fn run_auto_buy(state: &mut GameState) -> AutoBuyReport {
    let mut report = AutoBuyReport::default();
    if state.auto_buy.is_empty() {
        return report;
    }
    let start_cash = state.resources.cash;
    let targets: Vec<AutoBuyTarget> = state.auto_buy.iter().copied().collect();

    for target in targets {
        match target {
            AutoBuyTarget::Upgrade { key, mode: BuyMode::Single } => {
                if logic::purchase_single(state, key) {
                    report.levels_bought += 1;
                }
            }
            AutoBuyTarget::Upgrade { key, mode: BuyMode::Bulk } => {
                report.levels_bought += logic::purchase_bulk(state, key);
            }
            AutoBuyTarget::Conversion(kind) => {
                let units = logic::convert(state, kind, u32::MAX);
                match kind {
                    ConversionKind::CashToChips => report.chip_units += units,
                    ConversionKind::CashToHeat => report.heat_units += units,
                }
            }
        }
    }

    report.cash_spent = (start_cash - state.resources.cash).max(0.0);
    report
}

/// Flip a target on or off. Returns the new enabled state.
pub fn toggle_target(state: &mut GameState, target: AutoBuyTarget) -> bool {
    if state.auto_buy.remove(&target) {
        false
    } else {
        state.auto_buy.insert(target);
        true
    }
}
