//! Gamble resolution: luck-adjusted odds, a single weighted draw, and the
//! outcome's side effects on chips, heat, insight, luck and buffs.

use rand::Rng;

use super::config::{
    HEAT_MAX, LUCK_MAX, LUCK_PER_POINT, LUCK_SHIFT_CRASH, LUCK_SHIFT_FAIL, LUCK_SHIFT_GOOD,
};
use super::logic::format_number;
use super::state::{Buff, GameState, OutcomeProbs, RiskKey, RiskTier, Tone};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Jackpot,
    Success,
    Fail,
    Crash,
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Jackpot => "JACKPOT",
            Outcome::Success => "Success",
            Outcome::Fail => "Fail",
            Outcome::Crash => "CRASH",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Outcome::Jackpot | Outcome::Success => Tone::Good,
            Outcome::Fail | Outcome::Crash => Tone::Bad,
        }
    }
}

/// What a resolved gamble did.
#[derive(Clone, Debug, PartialEq)]
pub struct GambleReport {
    pub tier: RiskKey,
    pub outcome: Outcome,
    pub roll: f64,
    pub probs: OutcomeProbs,
    pub buff: Option<Buff>,
    pub insight_gained: f64,
    pub luck_after: f64,
}

/// Shift odds toward jackpot/success by 0.2 percentage points per luck point.
///
/// Jackpot and success keep their ratio; fail and crash split what is left
/// in their original ratio (evenly if both were zero).
pub fn adjust_probabilities(tier: &RiskTier, total_luck: f64) -> OutcomeProbs {
    let luck = if total_luck.is_nan() {
        0.0
    } else {
        total_luck.clamp(0.0, LUCK_MAX)
    };
    let base = tier.base_probs;
    let base_good = base.good();
    let target_good = (base_good + LUCK_PER_POINT * luck).clamp(0.0, 1.0);
    let scale = if base_good > 0.0 { target_good / base_good } else { 0.0 };

    let jackpot = base.jackpot * scale;
    let success = base.success * scale;
    let remainder = (1.0 - (jackpot + success)).max(0.0);

    let base_bad = base.fail + base.crash;
    let fail_share = if base_bad > 0.0 { base.fail / base_bad } else { 0.5 };
    let fail = remainder * fail_share;

    OutcomeProbs {
        jackpot,
        success,
        fail,
        crash: remainder - fail,
    }
}

/// Map a uniform `roll` in `[0, 1)` onto an outcome.
///
/// Thresholds are cumulative in the order jackpot, success, fail; a roll on a
/// boundary picks the earlier outcome. Outcomes with no probability mass are
/// skipped and anything left over is a crash.
pub fn pick_outcome(probs: &OutcomeProbs, roll: f64) -> Outcome {
    let mut cumulative = 0.0;
    for (outcome, p) in [
        (Outcome::Jackpot, probs.jackpot),
        (Outcome::Success, probs.success),
        (Outcome::Fail, probs.fail),
    ] {
        cumulative += p;
        if p > 0.0 && roll <= cumulative {
            return outcome;
        }
    }
    Outcome::Crash
}

/// Heat is full and there are enough chips to pay the tier.
pub fn is_ready(state: &GameState, key: RiskKey) -> bool {
    state.resources.heat >= HEAT_MAX && state.resources.chips >= key.tier().cost
}

/// Resolve one gamble with the given roll. `None` (and no change) when not ready.
pub fn resolve_gamble(
    state: &mut GameState,
    key: RiskKey,
    roll: f64,
    now_ms: f64,
) -> Option<GambleReport> {
    if !is_ready(state, key) {
        return None;
    }
    let tier = key.tier();
    let probs = adjust_probabilities(tier, state.total_luck());
    let outcome = pick_outcome(&probs, roll);

    state.resources.chips -= tier.cost;
    state.resources.heat = 0.0;

    let reward = &tier.reward;
    let (buff_mult, insight_factor, luck_shift) = match outcome {
        Outcome::Jackpot => (Some(reward.jackpot_buff), reward.insight.jackpot, LUCK_SHIFT_GOOD),
        Outcome::Success => (Some(reward.success_buff), reward.insight.success, LUCK_SHIFT_GOOD),
        Outcome::Fail => (None, reward.insight.fail, LUCK_SHIFT_FAIL),
        Outcome::Crash => (None, reward.insight.crash, LUCK_SHIFT_CRASH),
    };

    let buff = buff_mult.map(|m| state.push_buff(m, reward.buff_minutes * 60_000.0, now_ms));
    let insight_gained = tier.cost * insight_factor;
    state.resources.insight += insight_gained;
    state.resources.luck = (state.resources.luck + luck_shift).clamp(0.0, LUCK_MAX);

    let text = match &buff {
        Some(b) => format!(
            "🎲 {} {}: ×{} for {}m, +{} insight",
            key.name(),
            outcome.name(),
            b.multiplier,
            reward.buff_minutes,
            format_number(insight_gained)
        ),
        None => format!(
            "🎲 {} {}: luck +{}, +{} insight",
            key.name(),
            outcome.name(),
            luck_shift,
            format_number(insight_gained)
        ),
    };
    state.add_log(&text, outcome.tone());

    let report = GambleReport {
        tier: key,
        outcome,
        roll,
        probs,
        buff,
        insight_gained,
        luck_after: state.resources.luck,
    };
    state.last_gamble = Some(report.clone());
    Some(report)
}

/// Resolve one gamble, drawing the roll from `rng`.
pub fn gamble<R: Rng>(
    state: &mut GameState,
    key: RiskKey,
    rng: &mut R,
    now_ms: f64,
) -> Option<GambleReport> {
    if !is_ready(state, key) {
        return None;
    }
    let roll: f64 = rng.gen();
    resolve_gamble(state, key, roll, now_ms)
}
