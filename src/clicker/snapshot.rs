//! Observer-facing views of a session.
//!
//! `Snapshot` is the throttled, read-only copy the UI draws from.
//! `SavedGameState` is the persisted wire format, wrapped in a versioned
//! `SaveData` envelope.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION`: bump when fields are added.
//! - `MIN_COMPATIBLE_VERSION`: bump only on breaking changes (a field removed
//!   or its meaning changed). Saves at or above it load with missing fields
//!   defaulted.

use serde::{Deserialize, Serialize};

use super::calc::{self, Rates};
use super::config::{
    self, BUFF_ID_LIMIT, CASH_MAX, HEAT_MAX, HISTORY_LEN, LUCK_MAX, PERM_LUCK_MAX, UNCAPPED_LEVEL_MAX,
};
use super::logic;
use super::persist::PersistError;
use super::risk::{self, GambleReport};
use super::state::{
    AutoBuyTarget, Buff, BuyMode, ConversionKind, GameState, LogEntry, OutcomeProbs, Resources,
    RiskKey, UpgradeKey, UpgradeLevels,
};

pub const SAVE_VERSION: u32 = 1;
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

// ── Persisted form ──────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SavedGameState {
    pub resources: Resources,
    pub levels: UpgradeLevels,
    pub buffs: Vec<Buff>,
    pub perm_luck: u32,
    pub max_cash: f64,
    pub cash_history: Vec<f64>,
    pub run_start_ms: f64,
    pub run_max_cash: f64,
    pub rank_prompt_seconds: Option<f64>,
    pub session_elapsed_seconds: f64,
    #[serde(rename = "bestTimeTo1e100Seconds")]
    pub best_time_to_rank: Option<f64>,
    pub prestige_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub game: SavedGameState,
}

/// Copy the persistent part of a session.
pub fn capture_save(state: &GameState) -> SavedGameState {
    SavedGameState {
        resources: state.resources,
        levels: state.levels,
        buffs: state.buffs.clone(),
        perm_luck: state.perm_luck,
        max_cash: state.max_cash,
        cash_history: state.cash_history.clone(),
        run_start_ms: state.run_start_ms,
        run_max_cash: state.run_max_cash,
        rank_prompt_seconds: state.rank_prompt_seconds,
        session_elapsed_seconds: state.session_elapsed_seconds,
        best_time_to_rank: state.best_time_to_rank,
        prestige_count: state.prestige_count,
    }
}

fn clean(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn clean_opt(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Repair anything a corrupted or tampered save could carry. Returns the
/// number of fields changed.
pub fn sanitize(save: &mut SavedGameState, now_ms: f64) -> usize {
    fn repair(slot: &mut f64, rule: impl Fn(f64) -> f64) -> usize {
        let fixed = rule(*slot);
        if slot.to_bits() == fixed.to_bits() {
            return 0;
        }
        *slot = fixed;
        1
    }

    let mut repairs = 0;
    let r = &mut save.resources;
    repairs += repair(&mut r.cash, |v| clean(v).min(CASH_MAX));
    repairs += repair(&mut r.chips, clean);
    repairs += repair(&mut r.heat, |v| clean(v).min(HEAT_MAX));
    repairs += repair(&mut r.luck, |v| clean(v).min(LUCK_MAX));
    repairs += repair(&mut r.insight, clean);
    repairs += repair(&mut r.prestige, clean);
    repairs += repair(&mut save.max_cash, |v| clean(v).min(CASH_MAX));
    repairs += repair(&mut save.run_max_cash, |v| clean(v).min(CASH_MAX));
    repairs += repair(&mut save.session_elapsed_seconds, clean);
    repairs += repair(&mut save.run_start_ms, |v| {
        if v.is_finite() && v <= now_ms {
            v
        } else {
            now_ms
        }
    });

    if save.perm_luck > PERM_LUCK_MAX {
        save.perm_luck = PERM_LUCK_MAX;
        repairs += 1;
    }
    for key in UpgradeKey::all() {
        let max = key.upgrade().max_level.unwrap_or(UNCAPPED_LEVEL_MAX);
        let level = save.levels.get_mut(*key);
        if *level > max {
            *level = max;
            repairs += 1;
        }
    }

    let before = save.buffs.len();
    save.buffs.retain(|b| {
        b.multiplier.is_finite() && b.multiplier > 0.0 && b.expires_at.is_finite() && b.is_live(now_ms)
    });
    repairs += before - save.buffs.len();
    if save.buffs.iter().any(|b| b.id >= BUFF_ID_LIMIT) {
        for (id, buff) in (1..).zip(save.buffs.iter_mut()) {
            buff.id = id;
        }
        repairs += 1;
    }

    let before = save.cash_history.len();
    save.cash_history.retain(|c| c.is_finite() && *c >= 0.0);
    if save.cash_history.len() > HISTORY_LEN {
        let excess = save.cash_history.len() - HISTORY_LEN;
        save.cash_history.drain(..excess);
    }
    repairs += before - save.cash_history.len();

    for slot in [&mut save.rank_prompt_seconds, &mut save.best_time_to_rank] {
        let cleaned = clean_opt(*slot);
        if cleaned != *slot {
            *slot = cleaned;
            repairs += 1;
        }
    }

    repairs
}

/// Build a fresh session from a save. The save is sanitized first and the
/// result replaces the live state wholesale.
pub fn restore(mut save: SavedGameState, now_ms: f64) -> GameState {
    let repairs = sanitize(&mut save, now_ms);
    if repairs > 0 {
        log::warn!("save: repaired {} invalid field(s) on load", repairs);
    }

    let mut state = GameState::new(now_ms);
    state.next_buff_id = save
        .buffs
        .iter()
        .map(|b| b.id)
        .max()
        .unwrap_or(0)
        .saturating_add(1);
    state.resources = save.resources;
    state.levels = save.levels;
    state.buffs = save.buffs;
    state.perm_luck = save.perm_luck;
    state.max_cash = save.max_cash.max(save.run_max_cash);
    state.run_max_cash = save.run_max_cash;
    state.cash_history = save.cash_history;
    state.run_start_ms = save.run_start_ms;
    state.rank_prompt_seconds = save.rank_prompt_seconds;
    state.best_time_to_rank = save.best_time_to_rank;
    state.prestige_count = save.prestige_count;
    state.session_elapsed_seconds = ((now_ms - state.run_start_ms) / 1000.0).max(0.0);
    state.add_log("Save loaded.", super::state::Tone::Neutral);
    state
}

pub fn encode_save(save: &SavedGameState) -> Result<String, PersistError> {
    let data = SaveData {
        version: SAVE_VERSION,
        game: save.clone(),
    };
    Ok(serde_json::to_string(&data)?)
}

/// Parse a stored payload. Too-old versions are rejected, older compatible
/// ones are migrated by defaulting missing fields.
pub fn decode_save(json: &str) -> Result<SavedGameState, PersistError> {
    let data: SaveData = serde_json::from_str(json)?;
    if data.version < MIN_COMPATIBLE_VERSION {
        return Err(PersistError::IncompatibleVersion {
            found: data.version,
            min: MIN_COMPATIBLE_VERSION,
        });
    }
    if data.version < SAVE_VERSION {
        log::info!(
            "save: migrating from version {} to {}",
            data.version,
            SAVE_VERSION
        );
    }
    Ok(data.game)
}

// ── UI snapshot ─────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeRow {
    pub key: UpgradeKey,
    pub level: u32,
    pub max_level: Option<u32>,
    /// `None` at max level.
    pub next_cost: Option<f64>,
    pub bulk_count: u32,
    pub bulk_cost: f64,
    pub auto_single: bool,
    pub auto_bulk: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversionRow {
    pub kind: ConversionKind,
    pub unit_cost: f64,
    pub affordable_units: u32,
    pub auto: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TierRow {
    pub key: RiskKey,
    pub cost: f64,
    pub probs: OutcomeProbs,
    pub ready: bool,
    pub auto: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuffView {
    pub multiplier: f64,
    pub remaining_secs: f64,
}

/// Immutable copy of everything the UI shows.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub taken_at_ms: f64,
    pub resources: Resources,
    pub total_luck: f64,
    pub perm_luck: u32,
    /// `None` at the cap.
    pub perm_luck_cost: Option<f64>,
    pub rates: Rates,
    pub upgrades: Vec<UpgradeRow>,
    pub conversions: Vec<ConversionRow>,
    pub tiers: Vec<TierRow>,
    pub buffs: Vec<BuffView>,
    pub prestige_gain: f64,
    pub prestige_count: u32,
    pub max_cash: f64,
    pub run_max_cash: f64,
    pub cash_history: Vec<f64>,
    pub elapsed_seconds: f64,
    pub rank_prompt_seconds: Option<f64>,
    pub best_time_to_rank: Option<f64>,
    pub log: Vec<LogEntry>,
    pub last_gamble: Option<GambleReport>,
}

impl Snapshot {
    pub fn capture(state: &GameState, now_ms: f64) -> Self {
        let rates = Rates::compute(state);

        let upgrades = UpgradeKey::all()
            .iter()
            .map(|&key| {
                let (bulk_count, bulk_cost) = logic::bulk_quote(state, key);
                UpgradeRow {
                    key,
                    level: state.levels.get(key),
                    max_level: key.upgrade().max_level,
                    next_cost: logic::next_upgrade_cost(&state.levels, key),
                    bulk_count,
                    bulk_cost,
                    auto_single: state
                        .auto_buy
                        .contains(&AutoBuyTarget::Upgrade { key, mode: BuyMode::Single }),
                    auto_bulk: state
                        .auto_buy
                        .contains(&AutoBuyTarget::Upgrade { key, mode: BuyMode::Bulk }),
                }
            })
            .collect();

        let conversions = ConversionKind::all()
            .iter()
            .map(|&kind| ConversionRow {
                kind,
                unit_cost: rates.conversion_cost(kind),
                affordable_units: logic::conversion_capacity(state, kind),
                auto: state.auto_buy.contains(&AutoBuyTarget::Conversion(kind)),
            })
            .collect();

        let total_luck = state.total_luck();
        let tiers = RiskKey::all()
            .iter()
            .map(|&key| {
                let tier = key.tier();
                TierRow {
                    key,
                    cost: tier.cost,
                    probs: risk::adjust_probabilities(tier, total_luck),
                    ready: risk::is_ready(state, key),
                    auto: state.auto_risk == Some(key),
                }
            })
            .collect();

        let buffs = state
            .buffs
            .iter()
            .filter(|b| b.is_live(now_ms))
            .map(|b| BuffView {
                multiplier: b.multiplier,
                remaining_secs: b.remaining_secs(now_ms),
            })
            .collect();

        Self {
            taken_at_ms: now_ms,
            resources: state.resources,
            total_luck,
            perm_luck: state.perm_luck,
            perm_luck_cost: (state.perm_luck < PERM_LUCK_MAX)
                .then(|| config::perm_luck_cost(state.perm_luck)),
            rates,
            upgrades,
            conversions,
            tiers,
            buffs,
            prestige_gain: calc::prestige_gain(&state.resources),
            prestige_count: state.prestige_count,
            max_cash: state.max_cash,
            run_max_cash: state.run_max_cash,
            cash_history: state.cash_history.clone(),
            elapsed_seconds: state.session_elapsed_seconds,
            rank_prompt_seconds: state.rank_prompt_seconds,
            best_time_to_rank: state.best_time_to_rank,
            log: state.log.clone(),
            last_gamble: state.last_gamble.clone(),
        }
    }

    pub fn can_prestige(&self) -> bool {
        self.prestige_gain > 0.0
    }

    pub fn buff_multiplier(&self) -> f64 {
        self.rates.buff_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> GameState {
        let mut state = GameState::new(1_000.0);
        state.resources = Resources {
            cash: 12_345.6,
            chips: 77.0,
            heat: 42.0,
            luck: 13.0,
            insight: 5.5,
            prestige: 2.0,
        };
        state.levels = UpgradeLevels { printer: 4, vault: 2, battery: 7, refinery: 1 };
        state.push_buff(2.0, 60_000.0, 1_000.0);
        state.push_buff(1.5, 500.0, 1_000.0);
        state.perm_luck = 3;
        state.max_cash = 99_999.0;
        state.run_max_cash = 20_000.0;
        state.cash_history = vec![1.0, 2.0, 3.0];
        state.best_time_to_rank = Some(3_600.0);
        state
    }

    #[test]
    fn capture_restore_roundtrip_drops_expired_buffs() {
        let original = sample_state();
        let save = capture_save(&original);
        let restored = restore(save, 2_000.0);
        assert_eq!(restored.resources, original.resources);
        assert_eq!(restored.levels, original.levels);
        assert_eq!(restored.buffs.len(), 1);
        assert_eq!(restored.buffs[0], original.buffs[0]);
        assert_eq!(restored.perm_luck, 3);
        assert_eq!(restored.cash_history, vec![1.0, 2.0, 3.0]);
        assert_eq!(restored.best_time_to_rank, Some(3_600.0));

        let again = capture_save(&restored);
        assert_eq!(again.resources, original.resources);
        assert_eq!(again.levels, original.levels);
    }

    #[test]
    fn restored_buff_ids_keep_increasing() {
        let save = capture_save(&sample_state());
        let mut restored = restore(save, 2_000.0);
        let max_id = restored.buffs.iter().map(|b| b.id).max().unwrap();
        let fresh = restored.push_buff(3.0, 1_000.0, 2_000.0);
        assert!(fresh.id > max_id);
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = encode_save(&capture_save(&sample_state())).unwrap();
        for field in [
            "\"permLuck\"",
            "\"maxCash\"",
            "\"cashHistory\"",
            "\"runStartMs\"",
            "\"runMaxCash\"",
            "\"rankPromptSeconds\"",
            "\"sessionElapsedSeconds\"",
            "\"bestTimeTo1e100Seconds\"",
            "\"expiresAt\"",
        ] {
            assert!(json.contains(field), "missing {} in {}", field, json);
        }
        let decoded = decode_save(&json).unwrap();
        assert_eq!(decoded, capture_save(&sample_state()));
    }

    #[test]
    fn missing_fields_default() {
        let json = r#"{"version":1,"game":{"resources":{"cash":5.0}}}"#;
        let save = decode_save(json).unwrap();
        assert_eq!(save.resources.cash, 5.0);
        assert_eq!(save.resources.heat, 0.0);
        assert_eq!(save.levels, UpgradeLevels::default());
        assert!(save.buffs.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"version":1,"game":{"permLuck":4,"futureField":[1,2]}}"#;
        assert_eq!(decode_save(json).unwrap().perm_luck, 4);
    }

    #[test]
    fn version_below_min_compatible_is_rejected() {
        let json = r#"{"version":0,"game":{}}"#;
        assert!(matches!(
            decode_save(json),
            Err(PersistError::IncompatibleVersion { found: 0, min: MIN_COMPATIBLE_VERSION })
        ));
    }

    #[test]
    fn garbage_is_a_serialize_error() {
        assert!(matches!(decode_save("{not json"), Err(PersistError::Serialize(_))));
    }

    #[test]
    fn sanitize_clamps_corrupted_values() {
        let mut save = SavedGameState {
            resources: Resources {
                cash: f64::INFINITY,
                chips: -5.0,
                heat: 250.0,
                luck: f64::NAN,
                insight: 3.0,
                prestige: -1.0,
            },
            perm_luck: 999,
            levels: UpgradeLevels { refinery: 1_000, ..Default::default() },
            buffs: vec![
                Buff { id: 1, multiplier: -2.0, expires_at: 1e12 },
                Buff { id: 2, multiplier: f64::NAN, expires_at: 1e12 },
                Buff { id: 3, multiplier: 2.0, expires_at: 1e12 },
            ],
            cash_history: (0..200).map(|i| i as f64).collect(),
            run_start_ms: f64::NAN,
            rank_prompt_seconds: Some(-3.0),
            ..Default::default()
        };
        let repairs = sanitize(&mut save, 5_000.0);
        assert!(repairs > 0);
        let r = save.resources;
        assert_eq!(r.cash, 0.0);
        assert_eq!(r.chips, 0.0);
        assert_eq!(r.heat, HEAT_MAX);
        assert_eq!(r.luck, 0.0);
        assert_eq!(r.insight, 3.0);
        assert_eq!(r.prestige, 0.0);
        assert_eq!(save.perm_luck, PERM_LUCK_MAX);
        assert_eq!(save.levels.refinery, UpgradeKey::Refinery.upgrade().max_level.unwrap());
        assert_eq!(save.buffs.len(), 1);
        assert_eq!(save.cash_history.len(), HISTORY_LEN);
        assert_eq!(*save.cash_history.last().unwrap(), 199.0);
        assert_eq!(save.run_start_ms, 5_000.0);
        assert_eq!(save.rank_prompt_seconds, None);
    }

    #[test]
    fn sanitize_leaves_valid_save_alone() {
        let mut save = capture_save(&sample_state());
        save.buffs.retain(|b| b.expires_at > 2_000.0);
        assert_eq!(sanitize(&mut save, 2_000.0), 0);
    }

    #[test]
    fn oversized_buff_id_is_renumbered() {
        let json = r#"{"version":1,"game":{"buffs":[{"id":18446744073709551615,"multiplier":2.0,"expiresAt":1e15}]}}"#;
        let save = decode_save(json).unwrap();
        assert_eq!(sanitize(&mut save.clone(), 1_000.0), 1);

        let mut state = restore(save, 1_000.0);
        assert_eq!(state.buffs.len(), 1);
        assert_eq!(state.buffs[0].id, 1);
        assert_eq!(state.next_buff_id, 2);
        assert_eq!(state.push_buff(2.0, 1_000.0, 1_000.0).id, 2);
    }

    #[test]
    fn uncapped_levels_are_bounded_on_load() {
        let json = r#"{"version":1,"game":{"levels":{"printer":4294967295,"vault":3000000000},"resources":{"cash":1000}}}"#;
        let mut state = restore(decode_save(json).unwrap(), 0.0);
        assert_eq!(state.levels.printer, UNCAPPED_LEVEL_MAX);
        assert_eq!(state.levels.vault, UNCAPPED_LEVEL_MAX);
        for key in [UpgradeKey::Printer, UpgradeKey::Vault] {
            let cost = logic::next_upgrade_cost(&state.levels, key).unwrap();
            assert!(cost > CASH_MAX, "{:?} priced at {}", key, cost);
        }
        assert!(!logic::buy_upgrade(&mut state, UpgradeKey::Printer));
        assert_eq!(logic::buy_upgrade_bulk(&mut state, UpgradeKey::Vault), 0);
        assert_eq!(state.resources.cash, 1_000.0);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut state = sample_state();
        state.resources.heat = HEAT_MAX;
        state.resources.chips = 50.0;
        state.auto_risk = Some(RiskKey::Mid);
        state
            .auto_buy
            .insert(AutoBuyTarget::Upgrade { key: UpgradeKey::Vault, mode: BuyMode::Bulk });

        logic::expire_buffs(&mut state, 2_000.0);
        let snap = Snapshot::capture(&state, 2_000.0);
        assert_eq!(snap.upgrades.len(), 4);
        assert_eq!(snap.tiers.len(), 4);
        assert!(snap.upgrades[1].auto_bulk);
        assert!(!snap.upgrades[1].auto_single);
        assert!(snap.tiers[0].ready);
        assert!(snap.tiers[1].ready);
        assert!(!snap.tiers[2].ready);
        assert!(snap.tiers[1].auto);
        // Only the 60 s buff is still live at t = 2000.
        assert_eq!(snap.buffs.len(), 1);
        assert!((snap.buff_multiplier() - 2.0).abs() < 1e-12);
        assert!(!snap.can_prestige());
        assert_eq!(snap.perm_luck_cost, Some(1.0));
    }

    #[test]
    fn snapshot_is_detached_from_state() {
        let mut state = sample_state();
        let snap = Snapshot::capture(&state, 2_000.0);
        state.resources.cash = 0.0;
        state.add_log("later", crate::clicker::state::Tone::Neutral);
        assert_eq!(snap.resources.cash, 12_345.6);
        assert_ne!(snap.log.len(), state.log.len());
    }
}
