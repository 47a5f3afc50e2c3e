//! Semantic action IDs for Heat & Chips click targets.
//!
//! Registered during render and dispatched via `InputEvent::Click`. Keyboard
//! input is translated to the same IDs, so both paths share one table.

// ── Upgrades (base + UpgradeKey::index) ─────────────────────────
pub const BUY_UPGRADE_BASE: u16 = 100;
pub const BUY_BULK_BASE: u16 = 110;
pub const AUTO_SINGLE_BASE: u16 = 120;
pub const AUTO_BULK_BASE: u16 = 130;

// ── Conversions (base + 0 chips / 1 heat) ───────────────────────
pub const CONVERT_BASE: u16 = 200;
pub const CONVERT_MAX_BASE: u16 = 210;
pub const AUTO_CONVERT_BASE: u16 = 220;

// ── Gambles (base + RiskKey::index) ─────────────────────────────
pub const GAMBLE_BASE: u16 = 300;
pub const AUTO_RISK_BASE: u16 = 310;

// ── Prestige ────────────────────────────────────────────────────
pub const PRESTIGE: u16 = 400;
pub const BUY_PERM_LUCK: u16 = 401;

// ── Session ─────────────────────────────────────────────────────
pub const SAVE_NOW: u16 = 500;
pub const SUBMIT_SCORE: u16 = 501;
/// Arms the reset; a second press confirms.
pub const FULL_RESET: u16 = 502;
