//! Heat & Chips game logic: player actions and the per-tick advance.
//!
//! Discrete player actions (purchase, convert, prestige, perm luck, reset)
//! and the continuous part of a tick live here. Scheduling lives in
//! `scheduler`, gambling in `risk`.

use super::calc::{self, Rates};
use super::config::{
    BULK_MAX, CASH_MAX, CASH_RANK_TARGET, CONVERSION_UNIT, HEAT_MAX, HISTORY_LEN,
    HISTORY_SAMPLE_MS, MAX_TICK_DELTA_SEC, PERM_LUCK_MAX,
};
use super::state::{ConversionKind, GameState, Resources, Tone, UpgradeKey, UpgradeLevels};

/// What one call to [`advance`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub delta_sec: f64,
    pub expired_buffs: usize,
    pub rates: Rates,
    /// Cash crossed the rank target during this tick.
    pub reached_rank: bool,
}

/// Advance resources by the real time elapsed since the previous call.
///
/// Order matters: buffs expire before rates are derived, rates are derived
/// before resources move.
pub fn advance(state: &mut GameState, now_ms: f64) -> TickReport {
    let delta_sec = match state.last_tick_ms {
        Some(prev) => {
            let d = (now_ms - prev) / 1000.0;
            if d.is_finite() {
                d.clamp(0.0, MAX_TICK_DELTA_SEC)
            } else {
                0.0
            }
        }
        None => 0.0,
    };
    state.last_tick_ms = Some(now_ms);

    let expired_buffs = expire_buffs(state, now_ms);
    let rates = Rates::compute(state);

    let res = &mut state.resources;
    res.cash = (res.cash + rates.income_per_sec * delta_sec).min(CASH_MAX);
    res.chips += rates.chips_per_sec * delta_sec;
    res.heat = (res.heat + rates.heat_per_sec * delta_sec).clamp(0.0, HEAT_MAX);

    let cash = res.cash;
    state.max_cash = state.max_cash.max(cash);
    state.run_max_cash = state.run_max_cash.max(cash);

    sample_history(state, now_ms);

    state.session_elapsed_seconds = ((now_ms - state.run_start_ms) / 1000.0).max(0.0);

    let reached_rank = cash >= CASH_RANK_TARGET && state.rank_prompt_seconds.is_none();
    if reached_rank {
        let secs = state.session_elapsed_seconds;
        state.rank_prompt_seconds = Some(secs);
        if state.best_time_to_rank.map_or(true, |best| secs < best) {
            state.best_time_to_rank = Some(secs);
        }
        state.add_log(
            &format!("🏁 Rank target reached in {}", format_duration(secs)),
            Tone::Good,
        );
    }

    TickReport {
        delta_sec,
        expired_buffs,
        rates,
        reached_rank,
    }
}

/// Drop buffs whose expiry is at or before `now_ms`. Returns how many expired.
pub fn expire_buffs(state: &mut GameState, now_ms: f64) -> usize {
    let before = state.buffs.len();
    let expired: Vec<f64> = state
        .buffs
        .iter()
        .filter(|b| !b.is_live(now_ms))
        .map(|b| b.multiplier)
        .collect();
    state.buffs.retain(|b| b.is_live(now_ms));
    for multiplier in expired {
        state.add_log(&format!("  ×{} buff ended", multiplier), Tone::Neutral);
    }
    before - state.buffs.len()
}

/// Record cash once per second, keeping the last `HISTORY_LEN` samples.
fn sample_history(state: &mut GameState, now_ms: f64) {
    let due = state
        .last_history_ms
        .map_or(true, |prev| now_ms - prev >= HISTORY_SAMPLE_MS || now_ms < prev);
    if !due {
        return;
    }
    state.last_history_ms = Some(now_ms);
    state.cash_history.push(state.resources.cash);
    if state.cash_history.len() > HISTORY_LEN {
        let excess = state.cash_history.len() - HISTORY_LEN;
        state.cash_history.drain(..excess);
    }
}

/// Cash price of the next level, or `None` at max level.
pub fn next_upgrade_cost(levels: &UpgradeLevels, key: UpgradeKey) -> Option<f64> {
    if levels.is_maxed(key) {
        return None;
    }
    Some(calc::upgrade_cost(key.upgrade(), levels.get(key)))
}

/// How many levels a bulk buy would purchase right now, and their total price.
pub fn bulk_quote(state: &GameState, key: UpgradeKey) -> (u32, f64) {
    let level = state.levels.get(key);
    let max_count = state
        .levels
        .remaining(key)
        .map_or(BULK_MAX, |r| r.min(BULK_MAX));
    let upgrade = key.upgrade();
    let count = calc::max_affordable_bulk(upgrade, level, state.resources.cash, max_count);
    (count, calc::bulk_cost(upgrade, level, count))
}

/// Buy one level without logging. Returns true if successful.
pub fn purchase_single(state: &mut GameState, key: UpgradeKey) -> bool {
    let cost = match next_upgrade_cost(&state.levels, key) {
        Some(c) => c,
        None => return false,
    };
    let next = match state.levels.get(key).checked_add(1) {
        Some(n) => n,
        None => return false,
    };
    if state.resources.cash < cost {
        return false;
    }
    state.resources.cash -= cost;
    *state.levels.get_mut(key) = next;
    true
}

/// Buy as many levels as affordable, up to `BULK_MAX` and the level cap,
/// without logging. Returns the number bought.
pub fn purchase_bulk(state: &mut GameState, key: UpgradeKey) -> u32 {
    let (count, cost) = bulk_quote(state, key);
    let next = match state.levels.get(key).checked_add(count) {
        Some(n) if count > 0 => n,
        _ => return 0,
    };
    state.resources.cash = (state.resources.cash - cost).max(0.0);
    *state.levels.get_mut(key) = next;
    count
}

/// Buy one level. Returns true if successful.
pub fn buy_upgrade(state: &mut GameState, key: UpgradeKey) -> bool {
    if !purchase_single(state, key) {
        return false;
    }
    state.add_log(
        &format!("{} → Lv {}", key.name(), state.levels.get(key)),
        Tone::Neutral,
    );
    true
}

/// Bulk buy with a log line. Returns the number bought.
pub fn buy_upgrade_bulk(state: &mut GameState, key: UpgradeKey) -> u32 {
    let count = purchase_bulk(state, key);
    if count > 0 {
        state.add_log(
            &format!("{} +{} → Lv {}", key.name(), count, state.levels.get(key)),
            Tone::Neutral,
        );
    }
    count
}

/// Most whole conversion units that cash (and for heat, headroom) allow.
pub fn conversion_capacity(state: &GameState, kind: ConversionKind) -> u32 {
    let buff_mult = calc::buff_multiplier(&state.buffs);
    let cost = calc::conversion_cost(kind, &state.levels, buff_mult);
    let by_cash = (state.resources.cash / cost).floor();
    let by_cash = if by_cash.is_finite() && by_cash > 0.0 {
        by_cash as u32
    } else {
        0
    };
    match kind {
        ConversionKind::CashToChips => by_cash,
        ConversionKind::CashToHeat => {
            let headroom = HEAT_MAX - state.resources.heat;
            if headroom <= 0.0 {
                return 0;
            }
            by_cash.min((headroom / CONVERSION_UNIT).ceil() as u32)
        }
    }
}

/// Convert up to `units` whole units. Returns the number converted.
pub fn convert(state: &mut GameState, kind: ConversionKind, units: u32) -> u32 {
    let n = units.min(conversion_capacity(state, kind));
    if n == 0 {
        return 0;
    }
    let buff_mult = calc::buff_multiplier(&state.buffs);
    let cost = calc::conversion_cost(kind, &state.levels, buff_mult) * n as f64;
    let gained = CONVERSION_UNIT * n as f64;
    let res = &mut state.resources;
    res.cash = (res.cash - cost).max(0.0);
    match kind {
        ConversionKind::CashToChips => res.chips += gained,
        ConversionKind::CashToHeat => res.heat = (res.heat + gained).min(HEAT_MAX),
    }
    n
}

/// Reset the run for prestige points. Returns the points gained (0 = rejected).
///
/// Keeps prestige, permanent luck, all-time max cash, best rank time and the
/// automation settings. Everything else goes back to defaults.
pub fn prestige(state: &mut GameState, now_ms: f64) -> f64 {
    let gain = calc::prestige_gain(&state.resources);
    if gain <= 0.0 {
        return 0.0;
    }
    let total = state.resources.prestige + gain;

    state.resources = Resources {
        prestige: total,
        ..Resources::default()
    };
    state.levels = UpgradeLevels::default();
    state.buffs.clear();
    state.run_max_cash = 0.0;
    state.cash_history.clear();
    state.last_history_ms = None;
    state.run_start_ms = now_ms;
    state.rank_prompt_seconds = None;
    state.session_elapsed_seconds = 0.0;
    state.last_gamble = None;
    state.prestige_count += 1;

    log::info!("prestige: +{} (total {})", gain, total);
    state.add_log(
        &format!("🌟 Prestige +{} (total {})", format_number(gain), format_number(total)),
        Tone::Good,
    );
    gain
}

/// Spend prestige on one permanent luck point. Returns true if successful.
pub fn buy_perm_luck(state: &mut GameState) -> bool {
    if state.perm_luck >= PERM_LUCK_MAX {
        return false;
    }
    let cost = super::config::perm_luck_cost(state.perm_luck);
    if state.resources.prestige < cost {
        return false;
    }
    state.resources.prestige -= cost;
    state.perm_luck += 1;
    state.add_log(&format!("🍀 Permanent luck {}", state.perm_luck), Tone::Good);
    true
}

/// Wipe everything, permanent progress included.
pub fn full_reset(state: &mut GameState, now_ms: f64) {
    log::info!("full reset");
    *state = GameState::new(now_ms);
    state.add_log("Everything was reset.", Tone::Bad);
}

/// Format a number with commas (e.g. 1234567 → "1,234,567"), switching to
/// scientific notation once digits stop being readable.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }
    if n >= 1e15 {
        return format!("{:.3e}", n);
    }
    let int_part = n.floor() as u64;
    let frac = n - int_part as f64;

    let s = int_part.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    let result: String = result.chars().rev().collect();

    if frac > 0.05 && n < 1_000.0 {
        let tenth = (frac * 10.0).round() as u8;
        if tenth >= 10 {
            format_number(n.ceil())
        } else {
            format!("{}.{}", result, tenth)
        }
    } else {
        result
    }
}

/// Format seconds as `1h 02m 03s` / `2m 03s` / `3.4s`.
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{:.1}s", secs.max(0.0));
    }
    let total = secs as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else {
        format!("{}m {:02}s", m, s)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_upgrade_key() -> impl Strategy<Value = UpgradeKey> {
        prop_oneof![
            Just(UpgradeKey::Printer),
            Just(UpgradeKey::Vault),
            Just(UpgradeKey::Battery),
            Just(UpgradeKey::Refinery),
        ]
    }

    fn arb_conversion() -> impl Strategy<Value = ConversionKind> {
        prop_oneof![Just(ConversionKind::CashToChips), Just(ConversionKind::CashToHeat)]
    }

    proptest! {
        #[test]
        fn prop_format_number_no_panic(n in -1e300f64..1e300) {
            let _ = format_number(n);
        }

        #[test]
        fn prop_format_number_commas_at_correct_positions(int_val in 0u64..1_000_000_000) {
            let s = format_number(int_val as f64);
            let stripped: String = s.chars().filter(|c| *c != ',').collect();
            prop_assert_eq!(stripped, int_val.to_string());
        }

        #[test]
        fn prop_bulk_never_overspends(
            key in arb_upgrade_key(),
            level in 0u32..30,
            cash in 0.0f64..1e9,
        ) {
            let mut state = GameState::new(0.0);
            *state.levels.get_mut(key) = level;
            state.resources.cash = cash;
            buy_upgrade_bulk(&mut state, key);
            prop_assert!(state.resources.cash >= 0.0);
            prop_assert!(state.resources.cash <= cash);
        }

        #[test]
        fn prop_convert_keeps_heat_and_cash_in_range(
            kind in arb_conversion(),
            cash in 0.0f64..1e7,
            heat in 0.0f64..=100.0,
            units in 0u32..1000,
        ) {
            let mut state = GameState::new(0.0);
            state.resources.cash = cash;
            state.resources.heat = heat;
            convert(&mut state, kind, units);
            prop_assert!(state.resources.cash >= 0.0);
            prop_assert!((0.0..=HEAT_MAX).contains(&state.resources.heat));
        }

        #[test]
        fn prop_tick_never_reduces_cash(
            start in 0.0f64..1e12,
            delta_ms in 0.0f64..10_000.0,
        ) {
            let mut state = GameState::new(0.0);
            state.resources.cash = start;
            state.last_tick_ms = Some(0.0);
            advance(&mut state, delta_ms);
            prop_assert!(state.resources.cash >= start);
        }
    }
}
