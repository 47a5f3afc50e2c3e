//! Fixed tuning values: caps, base rates, cadences, and the upgrade and
//! risk tier tables.

use super::state::{InsightFactors, OutcomeProbs, RiskKey, RiskReward, RiskTier, Upgrade};

// ── Resource bounds ─────────────────────────────────────────────
pub const HEAT_MAX: f64 = 100.0;
pub const LUCK_MAX: f64 = 100.0;
pub const CASH_MAX: f64 = 1e250;
/// Cash level that qualifies a run for the leaderboard.
pub const CASH_RANK_TARGET: f64 = 1e100;
pub const PERM_LUCK_MAX: u32 = 50;

// ── Base rates (per second) ─────────────────────────────────────
pub const BASE_INCOME: f64 = 10.0;
pub const BASE_CHIP_RATE: f64 = 1.0 / 30.0;
pub const BASE_HEAT_RATE: f64 = 100.0 / 180.0;

// ── Conversions ─────────────────────────────────────────────────
pub const CHIPS_CONVERSION_BASE: f64 = 120.0;
pub const HEAT_CONVERSION_BASE: f64 = 90.0;
/// Units of chips or heat granted per conversion.
pub const CONVERSION_UNIT: f64 = 10.0;
pub const CONVERSION_COST_EXPONENT: f64 = 0.98;

// ── Purchases ───────────────────────────────────────────────────
pub const BULK_MAX: u32 = 10;
/// Level ceiling for upgrades without a max. Prices are past `f64` range
/// well before this.
pub const UNCAPPED_LEVEL_MAX: u32 = 10_000;

// ── Gamble luck shifts ──────────────────────────────────────────
pub const LUCK_PER_POINT: f64 = 0.002;
pub const LUCK_SHIFT_GOOD: f64 = -35.0;
pub const LUCK_SHIFT_FAIL: f64 = 22.0;
pub const LUCK_SHIFT_CRASH: f64 = 40.0;

// ── Prestige ────────────────────────────────────────────────────
pub const PRESTIGE_CHIP_VALUE: f64 = 1_000.0;
pub const PRESTIGE_INSIGHT_VALUE: f64 = 10_000.0;
pub const PRESTIGE_LOG_OFFSET: f64 = 8.0;
pub const PRESTIGE_EXPONENT: f64 = 1.4;

// ── Cadences (ms) ───────────────────────────────────────────────
pub const TICK_MS: f64 = 200.0;
pub const AUTO_BUY_TICK_MS: f64 = 100.0;
pub const AUTO_RISK_TICK_MS: f64 = 100.0;
pub const SNAPSHOT_MS: f64 = 200.0;
pub const AUTO_SAVE_MS: f64 = 600_000.0;
pub const HISTORY_SAMPLE_MS: f64 = 1_000.0;
/// Longest stretch a single tick will simulate.
pub const MAX_TICK_DELTA_SEC: f64 = 3_600.0;

// ── Bookkeeping ─────────────────────────────────────────────────
pub const HISTORY_LEN: usize = 120;
pub const LOG_CAPACITY: usize = 50;
/// Saved buff ids at or above this are renumbered on load.
pub const BUFF_ID_LIMIT: u64 = u32::MAX as u64;
/// Scores faster than this are treated as bogus.
pub const MIN_SCORE_SECONDS: f64 = 1.0;

/// Indexed by `UpgradeKey::index()`.
pub const UPGRADES: [Upgrade; 4] = [
    // printer
    Upgrade { base_cost: 60.0, growth: 1.12, max_level: None },
    // vault
    Upgrade { base_cost: 250.0, growth: 1.15, max_level: None },
    // battery
    Upgrade { base_cost: 180.0, growth: 1.18, max_level: Some(60) },
    // refinery
    Upgrade { base_cost: 400.0, growth: 1.20, max_level: Some(40) },
];

/// Indexed by `RiskKey::index()`. Each tier is strictly riskier than the last.
pub const RISK_TIERS: [RiskTier; 4] = [
    RiskTier {
        key: RiskKey::Low,
        cost: 10.0,
        base_probs: OutcomeProbs { jackpot: 0.25, success: 0.60, fail: 0.10, crash: 0.05 },
        reward: RiskReward {
            jackpot_buff: 2.0,
            success_buff: 1.5,
            buff_minutes: 2.0,
            insight: InsightFactors { jackpot: 0.50, success: 0.30, fail: 0.10, crash: 0.05 },
        },
    },
    RiskTier {
        key: RiskKey::Mid,
        cost: 40.0,
        base_probs: OutcomeProbs { jackpot: 0.15, success: 0.50, fail: 0.20, crash: 0.15 },
        reward: RiskReward {
            jackpot_buff: 3.0,
            success_buff: 1.8,
            buff_minutes: 3.0,
            insight: InsightFactors { jackpot: 0.60, success: 0.35, fail: 0.12, crash: 0.06 },
        },
    },
    RiskTier {
        key: RiskKey::High,
        cost: 150.0,
        base_probs: OutcomeProbs { jackpot: 0.08, success: 0.40, fail: 0.27, crash: 0.25 },
        reward: RiskReward {
            jackpot_buff: 5.0,
            success_buff: 2.5,
            buff_minutes: 4.0,
            insight: InsightFactors { jackpot: 0.75, success: 0.40, fail: 0.15, crash: 0.08 },
        },
    },
    RiskTier {
        key: RiskKey::Ultra,
        cost: 600.0,
        base_probs: OutcomeProbs { jackpot: 0.03, success: 0.27, fail: 0.35, crash: 0.35 },
        reward: RiskReward {
            jackpot_buff: 10.0,
            success_buff: 4.0,
            buff_minutes: 5.0,
            insight: InsightFactors { jackpot: 1.00, success: 0.50, fail: 0.20, crash: 0.10 },
        },
    },
];

/// Prestige price of the next permanent luck point.
pub fn perm_luck_cost(current: u32) -> f64 {
    (1 + current / 5) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clicker::state::UpgradeKey;

    #[test]
    fn tier_probabilities_sum_to_one() {
        for tier in &RISK_TIERS {
            assert!((tier.base_probs.total() - 1.0).abs() < 1e-9, "{:?}", tier.key);
        }
    }

    #[test]
    fn tiers_get_riskier() {
        for pair in RISK_TIERS.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(b.cost > a.cost);
            assert!(b.base_probs.good() < a.base_probs.good());
            assert!(b.reward.jackpot_buff > a.reward.jackpot_buff);
        }
    }

    #[test]
    fn tables_are_indexed_by_key() {
        for key in RiskKey::all() {
            assert_eq!(key.tier().key, *key);
        }
        assert!((UpgradeKey::Printer.upgrade().base_cost - 60.0).abs() < 1e-9);
        for u in &UPGRADES {
            assert!(u.growth > 1.0);
        }
    }

    #[test]
    fn perm_luck_cost_steps_every_five() {
        assert_eq!(perm_luck_cost(0), 1.0);
        assert_eq!(perm_luck_cost(4), 1.0);
        assert_eq!(perm_luck_cost(5), 2.0);
        assert_eq!(perm_luck_cost(49), 10.0);
    }
}
