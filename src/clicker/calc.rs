//! Income and cost formulas. Pure functions over the resource model.
//!
//! Everything here is a function of upgrade levels, resources and the
//! current buff multiplier. Nothing mutates state.

use super::config::{
    BASE_CHIP_RATE, BASE_HEAT_RATE, BASE_INCOME, CONVERSION_COST_EXPONENT,
    PRESTIGE_CHIP_VALUE, PRESTIGE_EXPONENT, PRESTIGE_INSIGHT_VALUE, PRESTIGE_LOG_OFFSET,
};
use super::state::{Buff, ConversionKind, GameState, Resources, Upgrade, UpgradeLevels};

pub fn printer_factor(levels: &UpgradeLevels) -> f64 {
    1.0 + 0.10 * levels.printer as f64
}

pub fn vault_factor(levels: &UpgradeLevels) -> f64 {
    1.0 + 0.05 * levels.vault as f64
}

pub fn insight_bonus(insight: f64) -> f64 {
    1.0 + (1.0 + insight).log10()
}

pub fn prestige_bonus(prestige: f64) -> f64 {
    1.0 + 0.05 * (1.0 + prestige).log10()
}

/// Product of all buff multipliers. 1.0 with no buffs.
pub fn buff_multiplier(buffs: &[Buff]) -> f64 {
    buffs.iter().map(|b| b.multiplier).product()
}

pub fn income_multiplier(levels: &UpgradeLevels, resources: &Resources, buff_mult: f64) -> f64 {
    printer_factor(levels)
        * vault_factor(levels)
        * buff_mult
        * insight_bonus(resources.insight)
        * prestige_bonus(resources.prestige)
}

/// Cash per second.
pub fn income_rate(levels: &UpgradeLevels, resources: &Resources, buff_mult: f64) -> f64 {
    BASE_INCOME * income_multiplier(levels, resources, buff_mult)
}

/// Scales conversion prices with both the active buffs and the upgrade boost,
/// so conversions stay relevant as income grows. Never below 1.
pub fn conversion_cost_multiplier(levels: &UpgradeLevels, buff_mult: f64) -> f64 {
    let boost = (printer_factor(levels) * vault_factor(levels)).max(1.0);
    let scaled = buff_mult.powf(CONVERSION_COST_EXPONENT) * boost.powf(CONVERSION_COST_EXPONENT);
    scaled.max(1.0)
}

/// Cash price of one conversion unit.
pub fn conversion_cost(kind: ConversionKind, levels: &UpgradeLevels, buff_mult: f64) -> f64 {
    kind.base_cost() * conversion_cost_multiplier(levels, buff_mult)
}

/// Price of buying level `level` (i.e. going from `level` to `level + 1`).
pub fn upgrade_cost(upgrade: &Upgrade, level: u32) -> f64 {
    upgrade.base_cost * upgrade.growth.powf(level as f64)
}

fn is_flat(growth: f64) -> bool {
    (growth - 1.0).abs() < f64::EPSILON
}

/// Total price of `count` consecutive levels starting at `start_level`.
pub fn bulk_cost(upgrade: &Upgrade, start_level: u32, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let growth = upgrade.growth;
    if is_flat(growth) {
        return upgrade.base_cost * count as f64;
    }
    let start = upgrade_cost(upgrade, start_level);
    start * (growth.powf(count as f64) - 1.0) / (growth - 1.0)
}

/// Largest `count <= max_count` whose `bulk_cost` fits in `cash`.
///
/// Solved by inverting the geometric sum,
/// `floor(log_growth(1 + cash * (growth - 1) / first_cost))`, so the cost is
/// constant no matter how many levels are affordable. The result is then
/// nudged by at most one unit to absorb float rounding at the boundary.
pub fn max_affordable_bulk(upgrade: &Upgrade, start_level: u32, cash: f64, max_count: u32) -> u32 {
    if max_count == 0 || !(cash > 0.0) {
        return 0;
    }
    let first = upgrade_cost(upgrade, start_level);
    if !first.is_finite() || first <= 0.0 || cash < first {
        return 0;
    }

    let growth = upgrade.growth;
    let raw = if is_flat(growth) {
        (cash / first).floor()
    } else {
        let arg = 1.0 + cash * (growth - 1.0) / first;
        if arg <= 0.0 {
            f64::INFINITY
        } else {
            (arg.ln() / growth.ln()).floor()
        }
    };

    let mut count = if raw.is_nan() {
        0
    } else {
        raw.clamp(0.0, max_count as f64) as u32
    };

    while count > 0 && bulk_cost(upgrade, start_level, count) > cash {
        count -= 1;
    }
    if count < max_count && bulk_cost(upgrade, start_level, count + 1) <= cash {
        count += 1;
    }
    count
}

/// Cash-equivalent value used for prestige.
pub fn prestige_total_value(resources: &Resources) -> f64 {
    resources.cash + resources.chips * PRESTIGE_CHIP_VALUE + resources.insight * PRESTIGE_INSIGHT_VALUE
}

/// Prestige points a reset would grant right now. 0 means prestige is unavailable.
pub fn prestige_gain(resources: &Resources) -> f64 {
    let total = prestige_total_value(resources);
    let excess = (1.0 + total).log10() - PRESTIGE_LOG_OFFSET;
    if !(excess > 0.0) {
        return 0.0;
    }
    excess.powf(PRESTIGE_EXPONENT).floor()
}

/// Chips per second.
pub fn chips_rate(levels: &UpgradeLevels, prestige: f64) -> f64 {
    BASE_CHIP_RATE * (1.0 + 0.10 * levels.refinery as f64) * (1.0 + 0.02 * prestige)
}

/// Heat per second.
pub fn heat_rate(levels: &UpgradeLevels, prestige: f64) -> f64 {
    BASE_HEAT_RATE * (1.0 + 0.03 * levels.battery as f64) * (1.0 + 0.02 * prestige)
}

/// Every derived rate and price for one moment of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rates {
    pub buff_multiplier: f64,
    pub income_multiplier: f64,
    pub income_per_sec: f64,
    pub chips_per_sec: f64,
    pub heat_per_sec: f64,
    pub chips_conversion_cost: f64,
    pub heat_conversion_cost: f64,
}

impl Rates {
    /// Derive from the current state. Expired buffs must already be removed.
    pub fn compute(state: &GameState) -> Self {
        let levels = &state.levels;
        let res = &state.resources;
        let buff_mult = buff_multiplier(&state.buffs);
        let income_mult = income_multiplier(levels, res, buff_mult);
        Self {
            buff_multiplier: buff_mult,
            income_multiplier: income_mult,
            income_per_sec: BASE_INCOME * income_mult,
            chips_per_sec: chips_rate(levels, res.prestige),
            heat_per_sec: heat_rate(levels, res.prestige),
            chips_conversion_cost: conversion_cost(ConversionKind::CashToChips, levels, buff_mult),
            heat_conversion_cost: conversion_cost(ConversionKind::CashToHeat, levels, buff_mult),
        }
    }

    pub fn conversion_cost(&self, kind: ConversionKind) -> f64 {
        match kind {
            ConversionKind::CashToChips => self.chips_conversion_cost,
            ConversionKind::CashToHeat => self.heat_conversion_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clicker::state::UpgradeKey;

    fn printer() -> Upgrade {
        Upgrade { base_cost: 60.0, growth: 1.12, max_level: None }
    }

    #[test]
    fn base_income_is_ten_per_second() {
        let levels = UpgradeLevels::default();
        let res = Resources::default();
        assert!((income_rate(&levels, &res, 1.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn income_multiplier_stacks_every_factor() {
        let levels = UpgradeLevels { printer: 5, vault: 4, ..Default::default() };
        let res = Resources { insight: 9.0, prestige: 9.0, ..Default::default() };
        // 1.5 * 1.2 * 2.0 * (1 + 1) * (1 + 0.05)
        let expected = 1.5 * 1.2 * 2.0 * 2.0 * 1.05;
        assert!((income_multiplier(&levels, &res, 2.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn buffs_compose_multiplicatively() {
        let buffs = vec![
            Buff { id: 1, multiplier: 2.0, expires_at: 10.0 },
            Buff { id: 2, multiplier: 3.0, expires_at: 10.0 },
        ];
        assert!((buff_multiplier(&buffs) - 6.0).abs() < 1e-12);
        assert!((buff_multiplier(&[]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn conversion_cost_floors_at_base() {
        let levels = UpgradeLevels::default();
        assert!((conversion_cost(ConversionKind::CashToChips, &levels, 1.0) - 120.0).abs() < 1e-9);
        assert!((conversion_cost(ConversionKind::CashToHeat, &levels, 1.0) - 90.0).abs() < 1e-9);
        // A sub-1 buff product never discounts below base.
        assert!((conversion_cost_multiplier(&levels, 0.5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn conversion_cost_tracks_buff_and_boost() {
        let levels = UpgradeLevels { printer: 10, ..Default::default() };
        let expected = 4.0_f64.powf(0.98) * 2.0_f64.powf(0.98);
        assert!((conversion_cost_multiplier(&levels, 4.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn printer_single_purchase_scenario() {
        let up = printer();
        assert!((upgrade_cost(&up, 0) - 60.0).abs() < 1e-9);
        assert!((upgrade_cost(&up, 1) - 67.2).abs() < 1e-9);
    }

    #[test]
    fn cost_keeps_growing_past_i32_levels() {
        let up = printer();
        assert!(upgrade_cost(&up, 3_000_000_000) > upgrade_cost(&up, 2_000));
        assert_eq!(upgrade_cost(&up, u32::MAX), f64::INFINITY);
    }

    #[test]
    fn bulk_cost_matches_sum_of_singles() {
        let up = printer();
        let summed: f64 = (3..8).map(|l| upgrade_cost(&up, l)).sum();
        assert!((bulk_cost(&up, 3, 5) - summed).abs() < 1e-6);
        assert_eq!(bulk_cost(&up, 3, 0), 0.0);
    }

    #[test]
    fn bulk_cost_flat_growth() {
        let up = Upgrade { base_cost: 25.0, growth: 1.0, max_level: None };
        assert!((bulk_cost(&up, 7, 4) - 100.0).abs() < 1e-9);
        assert_eq!(max_affordable_bulk(&up, 7, 99.0, 10), 3);
    }

    #[test]
    fn max_affordable_zero_when_first_unaffordable() {
        let up = printer();
        assert_eq!(max_affordable_bulk(&up, 0, 59.99, 10), 0);
        assert_eq!(max_affordable_bulk(&up, 0, 0.0, 10), 0);
        assert_eq!(max_affordable_bulk(&up, 0, 1e9, 0), 0);
    }

    #[test]
    fn max_affordable_clamps_to_max_count() {
        let up = printer();
        assert_eq!(max_affordable_bulk(&up, 0, 1e30, 10), 10);
    }

    #[test]
    fn max_affordable_exact_boundary() {
        let up = printer();
        let exact = bulk_cost(&up, 2, 4);
        assert_eq!(max_affordable_bulk(&up, 2, exact, 10), 4);
        assert_eq!(max_affordable_bulk(&up, 2, exact - 0.01, 10), 3);
    }

    #[test]
    fn max_affordable_handles_huge_levels() {
        let up = printer();
        let level = 2_000;
        let first = upgrade_cost(&up, level);
        assert!(first.is_finite());
        assert_eq!(max_affordable_bulk(&up, level, first * 2.5, 10), 2);
    }

    #[test]
    fn prestige_gain_scenario_one_billion() {
        let res = Resources { cash: 1e9, ..Default::default() };
        assert!((prestige_total_value(&res) - 1e9).abs() < 1e-3);
        assert_eq!(prestige_gain(&res), 1.0);
    }

    #[test]
    fn prestige_gain_zero_below_threshold() {
        let res = Resources { cash: 1e8 - 1.0, ..Default::default() };
        assert_eq!(prestige_gain(&res), 0.0);
        assert_eq!(prestige_gain(&Resources::default()), 0.0);
    }

    #[test]
    fn prestige_counts_chips_and_insight() {
        let res = Resources { chips: 1e6, insight: 1e5, ..Default::default() };
        // 1e9 + 1e9 = 2e9 → log10 ≈ 9.301 → 1.301^1.4 ≈ 1.445
        assert_eq!(prestige_gain(&res), 1.0);
        let res = Resources { insight: 1e8, ..Default::default() };
        // 1e12 → 4^1.4 ≈ 6.96
        assert_eq!(prestige_gain(&res), 6.0);
    }

    #[test]
    fn chip_and_heat_rates() {
        let levels = UpgradeLevels { refinery: 10, battery: 10, ..Default::default() };
        assert!((chips_rate(&levels, 0.0) - 2.0 / 30.0).abs() < 1e-12);
        assert!((heat_rate(&levels, 50.0) - 100.0 / 180.0 * 1.3 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn rates_from_state() {
        let mut state = GameState::new(0.0);
        *state.levels.get_mut(UpgradeKey::Printer) = 10;
        state.push_buff(2.0, 60_000.0, 0.0);
        let rates = Rates::compute(&state);
        assert!((rates.buff_multiplier - 2.0).abs() < 1e-12);
        assert!((rates.income_per_sec - 10.0 * 2.0 * 2.0).abs() < 1e-9);
        assert!(rates.chips_conversion_cost > 120.0);
        assert_eq!(rates.conversion_cost(ConversionKind::CashToHeat), rates.heat_conversion_cost);
    }
}
