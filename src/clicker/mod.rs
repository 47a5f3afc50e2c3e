//! Heat & Chips: an idle clicker about printing cash, heating up and
//! rolling chips for income buffs.

pub mod actions;
pub mod autobuy;
pub mod calc;
pub mod config;
pub mod logic;
pub mod persist;
pub mod render;
pub mod risk;
pub mod scheduler;
pub mod snapshot;
pub mod state;

#[cfg(test)]
mod simulator;

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::Rng;
use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;

use crate::input::{ClickState, InputEvent};

use actions::*;
use scheduler::{Command, Scheduler};
use state::{AutoBuyTarget, BuyMode, ConversionKind, RiskKey, UpgradeKey};

/// View-only state that never reaches the simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UiState {
    /// The reset button was pressed once and waits for confirmation.
    pub confirm_reset: bool,
}

pub struct ClickerGame<R: Rng = SmallRng> {
    pub scheduler: Scheduler<R>,
    pub ui: UiState,
}

impl<R: Rng> ClickerGame<R> {
    pub fn new(scheduler: Scheduler<R>) -> Self {
        Self {
            scheduler,
            ui: UiState::default(),
        }
    }

    /// Handle a key press or click. Returns true if the event was consumed.
    pub fn handle_input(&mut self, event: &InputEvent, now_ms: f64) -> bool {
        let action = match event {
            InputEvent::Key(c) => match action_for_key(*c) {
                Some(id) => id,
                None => return false,
            },
            InputEvent::Click(id) => *id,
        };

        if action == FULL_RESET {
            if self.ui.confirm_reset {
                self.ui.confirm_reset = false;
                self.scheduler.dispatch(Command::FullReset, now_ms);
            } else {
                self.ui.confirm_reset = true;
            }
            return true;
        }
        self.ui.confirm_reset = false;

        match command_for_action(action) {
            Some(command) => {
                self.scheduler.dispatch(command, now_ms);
                true
            }
            None => false,
        }
    }

    pub fn tick(&mut self, now_ms: f64) {
        self.scheduler.step(now_ms);
    }

    pub fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(self.scheduler.snapshot(), &self.ui, f, area, click_state);
    }
}

const UPGRADE_KEYS: [char; 4] = ['1', '2', '3', '4'];
const BULK_KEYS: [char; 4] = ['q', 'w', 'e', 'r'];
const AUTO_SINGLE_KEYS: [char; 4] = ['5', '6', '7', '8'];
const AUTO_BULK_KEYS: [char; 4] = ['t', 'y', 'u', 'i'];
const GAMBLE_KEYS: [char; 4] = ['a', 's', 'd', 'f'];
const AUTO_RISK_KEYS: [char; 4] = ['A', 'S', 'D', 'F'];

fn slot(keys: &[char; 4], c: char) -> Option<u16> {
    keys.iter().position(|&k| k == c).map(|i| i as u16)
}

/// Keyboard shortcut → action ID.
pub fn action_for_key(c: char) -> Option<u16> {
    if let Some(i) = slot(&UPGRADE_KEYS, c) {
        return Some(BUY_UPGRADE_BASE + i);
    }
    if let Some(i) = slot(&BULK_KEYS, c) {
        return Some(BUY_BULK_BASE + i);
    }
    if let Some(i) = slot(&AUTO_SINGLE_KEYS, c) {
        return Some(AUTO_SINGLE_BASE + i);
    }
    if let Some(i) = slot(&AUTO_BULK_KEYS, c) {
        return Some(AUTO_BULK_BASE + i);
    }
    if let Some(i) = slot(&GAMBLE_KEYS, c) {
        return Some(GAMBLE_BASE + i);
    }
    if let Some(i) = slot(&AUTO_RISK_KEYS, c) {
        return Some(AUTO_RISK_BASE + i);
    }
    let id = match c {
        'c' => CONVERT_BASE,
        'h' => CONVERT_BASE + 1,
        'C' => CONVERT_MAX_BASE,
        'H' => CONVERT_MAX_BASE + 1,
        'n' => AUTO_CONVERT_BASE,
        'm' => AUTO_CONVERT_BASE + 1,
        'p' => PRESTIGE,
        'l' => BUY_PERM_LUCK,
        'k' => SAVE_NOW,
        'o' => SUBMIT_SCORE,
        'X' => FULL_RESET,
        _ => return None,
    };
    Some(id)
}

/// The key shown next to an action in the UI.
pub fn key_for_action(id: u16) -> Option<char> {
    ('!'..='~').find(|&c| action_for_key(c) == Some(id))
}

fn indexed<T: Copy>(all: &[T], id: u16, base: u16) -> Option<T> {
    id.checked_sub(base)
        .filter(|i| *i < 10)
        .and_then(|i| all.get(i as usize).copied())
}

/// Action ID → command. `FULL_RESET` is handled by the caller.
pub fn command_for_action(id: u16) -> Option<Command> {
    let upgrades = UpgradeKey::all();
    let conversions = ConversionKind::all();
    let tiers = RiskKey::all();
    match id {
        BUY_UPGRADE_BASE..=109 => indexed(upgrades, id, BUY_UPGRADE_BASE).map(Command::BuyUpgrade),
        BUY_BULK_BASE..=119 => indexed(upgrades, id, BUY_BULK_BASE).map(Command::BuyBulk),
        AUTO_SINGLE_BASE..=129 => indexed(upgrades, id, AUTO_SINGLE_BASE).map(|key| {
            Command::ToggleAutoBuy(AutoBuyTarget::Upgrade { key, mode: BuyMode::Single })
        }),
        AUTO_BULK_BASE..=139 => indexed(upgrades, id, AUTO_BULK_BASE).map(|key| {
            Command::ToggleAutoBuy(AutoBuyTarget::Upgrade { key, mode: BuyMode::Bulk })
        }),
        CONVERT_BASE..=209 => indexed(conversions, id, CONVERT_BASE).map(Command::Convert),
        CONVERT_MAX_BASE..=219 => indexed(conversions, id, CONVERT_MAX_BASE).map(Command::ConvertMax),
        AUTO_CONVERT_BASE..=229 => indexed(conversions, id, AUTO_CONVERT_BASE)
            .map(|kind| Command::ToggleAutoBuy(AutoBuyTarget::Conversion(kind))),
        GAMBLE_BASE..=309 => indexed(tiers, id, GAMBLE_BASE).map(Command::Gamble),
        AUTO_RISK_BASE..=319 => indexed(tiers, id, AUTO_RISK_BASE).map(Command::ToggleAutoRisk),
        PRESTIGE => Some(Command::Prestige),
        BUY_PERM_LUCK => Some(Command::BuyPermLuck),
        SAVE_NOW => Some(Command::SaveNow),
        SUBMIT_SCORE => Some(Command::SubmitScore),
        _ => None,
    }
}
