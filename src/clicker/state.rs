//! Heat & Chips game state definitions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::config;
use super::risk::GambleReport;

/// Upgrades bought with cash. The set is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKey {
    Printer,
    Vault,
    Battery,
    Refinery,
}

impl UpgradeKey {
    /// All upgrade keys in display order.
    pub fn all() -> &'static [UpgradeKey] {
        &[
            UpgradeKey::Printer,
            UpgradeKey::Vault,
            UpgradeKey::Battery,
            UpgradeKey::Refinery,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            UpgradeKey::Printer => 0,
            UpgradeKey::Vault => 1,
            UpgradeKey::Battery => 2,
            UpgradeKey::Refinery => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpgradeKey::Printer => "Printer",
            UpgradeKey::Vault => "Vault",
            UpgradeKey::Battery => "Battery",
            UpgradeKey::Refinery => "Refinery",
        }
    }

    /// What one level does, for the shop list.
    pub fn effect_text(&self) -> &'static str {
        match self {
            UpgradeKey::Printer => "+10% income",
            UpgradeKey::Vault => "+5% income",
            UpgradeKey::Battery => "+3% heat rate",
            UpgradeKey::Refinery => "+10% chip rate",
        }
    }

    /// Static pricing descriptor.
    pub fn upgrade(&self) -> &'static Upgrade {
        &config::UPGRADES[self.index()]
    }
}

/// Pricing of an upgrade: level `L` costs `base_cost * growth^L`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Upgrade {
    pub base_cost: f64,
    pub growth: f64,
    pub max_level: Option<u32>,
}

/// Current level of every upgrade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeLevels {
    pub printer: u32,
    pub vault: u32,
    pub battery: u32,
    pub refinery: u32,
}

impl UpgradeLevels {
    pub fn get(&self, key: UpgradeKey) -> u32 {
        match key {
            UpgradeKey::Printer => self.printer,
            UpgradeKey::Vault => self.vault,
            UpgradeKey::Battery => self.battery,
            UpgradeKey::Refinery => self.refinery,
        }
    }

    pub fn get_mut(&mut self, key: UpgradeKey) -> &mut u32 {
        match key {
            UpgradeKey::Printer => &mut self.printer,
            UpgradeKey::Vault => &mut self.vault,
            UpgradeKey::Battery => &mut self.battery,
            UpgradeKey::Refinery => &mut self.refinery,
        }
    }

    /// Levels left before `max_level`, or `None` when the upgrade is uncapped.
    pub fn remaining(&self, key: UpgradeKey) -> Option<u32> {
        key.upgrade()
            .max_level
            .map(|max| max.saturating_sub(self.get(key)))
    }

    pub fn is_maxed(&self, key: UpgradeKey) -> bool {
        self.remaining(key) == Some(0)
    }
}

/// The six scalar resources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub cash: f64,
    /// Shown as "gold" in some places.
    pub chips: f64,
    pub heat: f64,
    pub luck: f64,
    pub insight: f64,
    pub prestige: f64,
}

/// A temporary income multiplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buff {
    pub id: u64,
    pub multiplier: f64,
    /// Epoch milliseconds.
    pub expires_at: f64,
}

impl Buff {
    pub fn is_live(&self, now_ms: f64) -> bool {
        self.expires_at > now_ms
    }

    pub fn remaining_secs(&self, now_ms: f64) -> f64 {
        ((self.expires_at - now_ms) / 1000.0).max(0.0)
    }
}

/// Cash conversions. Each unit grants a fixed amount of the target resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionKind {
    CashToChips,
    CashToHeat,
}

impl ConversionKind {
    pub fn all() -> &'static [ConversionKind] {
        &[ConversionKind::CashToChips, ConversionKind::CashToHeat]
    }

    pub fn index(&self) -> usize {
        match self {
            ConversionKind::CashToChips => 0,
            ConversionKind::CashToHeat => 1,
        }
    }

    /// Unscaled cash price of one unit.
    pub fn base_cost(&self) -> f64 {
        match self {
            ConversionKind::CashToChips => config::CHIPS_CONVERSION_BASE,
            ConversionKind::CashToHeat => config::HEAT_CONVERSION_BASE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConversionKind::CashToChips => "Cash → Chips",
            ConversionKind::CashToHeat => "Cash → Heat",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuyMode {
    Single,
    Bulk,
}

/// One automation rule. The derived ordering is the funding priority:
/// upgrades (by key, single before bulk) come before conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AutoBuyTarget {
    Upgrade { key: UpgradeKey, mode: BuyMode },
    Conversion(ConversionKind),
}

/// Gamble tiers, from safest to wildest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskKey {
    Low,
    Mid,
    High,
    Ultra,
}

impl RiskKey {
    pub fn all() -> &'static [RiskKey] {
        &[RiskKey::Low, RiskKey::Mid, RiskKey::High, RiskKey::Ultra]
    }

    pub fn index(&self) -> usize {
        match self {
            RiskKey::Low => 0,
            RiskKey::Mid => 1,
            RiskKey::High => 2,
            RiskKey::Ultra => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RiskKey::Low => "Low",
            RiskKey::Mid => "Mid",
            RiskKey::High => "High",
            RiskKey::Ultra => "Ultra",
        }
    }

    pub fn tier(&self) -> &'static RiskTier {
        &config::RISK_TIERS[self.index()]
    }
}

/// Probability of each gamble outcome. Sums to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutcomeProbs {
    pub jackpot: f64,
    pub success: f64,
    pub fail: f64,
    pub crash: f64,
}

impl OutcomeProbs {
    pub fn total(&self) -> f64 {
        self.jackpot + self.success + self.fail + self.crash
    }

    pub fn good(&self) -> f64 {
        self.jackpot + self.success
    }
}

/// Insight granted per chip spent, for each outcome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsightFactors {
    pub jackpot: f64,
    pub success: f64,
    pub fail: f64,
    pub crash: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskReward {
    pub jackpot_buff: f64,
    pub success_buff: f64,
    pub buff_minutes: f64,
    pub insight: InsightFactors,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskTier {
    pub key: RiskKey,
    /// Price in chips.
    pub cost: f64,
    pub base_probs: OutcomeProbs,
    pub reward: RiskReward,
}

/// Colour hint for a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Good,
    Bad,
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub text: String,
    pub tone: Tone,
}

/// Full state of a running session. Owned by the scheduler.
#[derive(Clone, Debug)]
pub struct GameState {
    pub resources: Resources,
    pub levels: UpgradeLevels,
    pub buffs: Vec<Buff>,
    /// Permanent luck bought with prestige. Survives prestige.
    pub perm_luck: u32,
    /// Highest cash ever held. Survives prestige.
    pub max_cash: f64,
    /// Highest cash held in the current run.
    pub run_max_cash: f64,
    /// Cash sampled once per second, newest last.
    pub cash_history: Vec<f64>,
    /// Epoch ms at which the current run started.
    pub run_start_ms: f64,
    /// Run seconds at which cash first reached the rank target.
    pub rank_prompt_seconds: Option<f64>,
    /// Fastest run to the rank target.
    pub best_time_to_rank: Option<f64>,
    pub session_elapsed_seconds: f64,
    pub prestige_count: u32,
    pub auto_buy: BTreeSet<AutoBuyTarget>,
    pub auto_risk: Option<RiskKey>,
    pub last_tick_ms: Option<f64>,
    pub last_history_ms: Option<f64>,
    pub next_buff_id: u64,
    pub last_gamble: Option<GambleReport>,
    pub log: Vec<LogEntry>,
}

impl GameState {
    pub fn new(now_ms: f64) -> Self {
        Self {
            resources: Resources::default(),
            levels: UpgradeLevels::default(),
            buffs: Vec::new(),
            perm_luck: 0,
            max_cash: 0.0,
            run_max_cash: 0.0,
            cash_history: Vec::new(),
            run_start_ms: now_ms,
            rank_prompt_seconds: None,
            best_time_to_rank: None,
            session_elapsed_seconds: 0.0,
            prestige_count: 0,
            auto_buy: BTreeSet::new(),
            auto_risk: None,
            last_tick_ms: None,
            last_history_ms: None,
            next_buff_id: 1,
            last_gamble: None,
            log: vec![LogEntry {
                text: "Welcome. Print cash, heat up, roll the chips.".into(),
                tone: Tone::Good,
            }],
        }
    }

    /// Session luck plus permanent luck, clamped to the luck range.
    pub fn total_luck(&self) -> f64 {
        (self.resources.luck + self.perm_luck as f64).clamp(0.0, config::LUCK_MAX)
    }

    /// Add a buff lasting `duration_ms` from `now_ms`.
    pub fn push_buff(&mut self, multiplier: f64, duration_ms: f64, now_ms: f64) -> Buff {
        let buff = Buff {
            id: self.next_buff_id,
            multiplier,
            expires_at: now_ms + duration_ms,
        };
        self.next_buff_id = self.next_buff_id.saturating_add(1);
        self.buffs.push(buff.clone());
        buff
    }

    pub fn add_log(&mut self, text: &str, tone: Tone) {
        self.log.push(LogEntry {
            text: text.to_string(),
            tone,
        });
        if self.log.len() > config::LOG_CAPACITY {
            self.log.remove(0);
        }
    }
}
