//! The session driver.
//!
//! `Scheduler` owns the live `GameState` and is fed timestamps by the render
//! loop. Each job runs on its own `Cadence`; within one `step` the order is
//! always tick → auto-buy → auto-gamble → autosave → publish. Player
//! commands are applied between steps.

use rand::rngs::SmallRng;
use rand::Rng;

use super::autobuy::{self, AutoBuyReport};
use super::config::{
    AUTO_BUY_TICK_MS, AUTO_RISK_TICK_MS, AUTO_SAVE_MS, CASH_RANK_TARGET, MIN_SCORE_SECONDS,
    SNAPSHOT_MS, TICK_MS,
};
use super::logic::{self, format_duration, format_number};
use super::persist::{Outbox, PersistEvent, PersistRequest, ScoreMeta, StatsUpdate};
use super::risk::{self, GambleReport};
use super::snapshot::{capture_save, Snapshot};
use super::state::{AutoBuyTarget, ConversionKind, GameState, RiskKey, Tone, UpgradeKey};
use crate::time::Cadence;

/// Everything a player can ask the session to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    BuyUpgrade(UpgradeKey),
    BuyBulk(UpgradeKey),
    /// One unit.
    Convert(ConversionKind),
    /// As many units as affordable.
    ConvertMax(ConversionKind),
    Gamble(RiskKey),
    Prestige,
    BuyPermLuck,
    ToggleAutoBuy(AutoBuyTarget),
    /// Select the auto-gamble tier, or clear it if it is already selected.
    ToggleAutoRisk(RiskKey),
    SaveNow,
    SubmitScore,
    FullReset,
}

/// What one `step` ran.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub ticked: bool,
    pub auto_buy: Option<AutoBuyReport>,
    pub auto_gamble: Option<GambleReport>,
    pub autosaved: bool,
    pub published: bool,
}

pub struct Scheduler<R: Rng = SmallRng> {
    state: GameState,
    rng: R,
    outbox: Outbox,
    tick: Cadence,
    auto_buy: Cadence,
    auto_risk: Cadence,
    publish: Cadence,
    autosave: Cadence,
    latest: Snapshot,
    running: bool,
}

impl<R: Rng> Scheduler<R> {
    pub fn new(state: GameState, rng: R, outbox: Outbox, now_ms: f64) -> Self {
        let latest = Snapshot::capture(&state, now_ms);
        Self {
            state,
            rng,
            outbox,
            tick: Cadence::immediate(TICK_MS),
            auto_buy: Cadence::immediate(AUTO_BUY_TICK_MS),
            auto_risk: Cadence::immediate(AUTO_RISK_TICK_MS),
            publish: Cadence::immediate(SNAPSHOT_MS),
            autosave: Cadence::new(AUTO_SAVE_MS),
            latest,
            running: true,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.latest
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run every job that is due at `now_ms`.
    pub fn step(&mut self, now_ms: f64) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.running {
            return report;
        }

        if self.tick.poll(now_ms) {
            let tick = logic::advance(&mut self.state, now_ms);
            if tick.reached_rank {
                log::info!(
                    "rank target reached after {:.1}s",
                    self.state.session_elapsed_seconds
                );
            }
            report.ticked = true;
        }

        if self.auto_buy.poll(now_ms) {
            let bought = autobuy::run_auto_buy(&mut self.state);
            if !bought.is_empty() {
                report.auto_buy = Some(bought);
            }
        }

        if self.auto_risk.poll(now_ms) {
            if let Some(key) = self.state.auto_risk {
                report.auto_gamble = risk::gamble(&mut self.state, key, &mut self.rng, now_ms);
            }
        }

        if self.autosave.poll(now_ms) {
            self.enqueue_save();
            report.autosaved = true;
        }

        if self.publish.poll(now_ms) {
            self.latest = Snapshot::capture(&self.state, now_ms);
            report.published = true;
        }

        report
    }

    /// Apply a player command. Returns true if it changed anything.
    ///
    /// A successful command republishes the snapshot right away.
    pub fn dispatch(&mut self, command: Command, now_ms: f64) -> bool {
        if !self.running {
            return false;
        }
        let state = &mut self.state;
        let applied = match command {
            Command::BuyUpgrade(key) => logic::buy_upgrade(state, key),
            Command::BuyBulk(key) => logic::buy_upgrade_bulk(state, key) > 0,
            Command::Convert(kind) => logic::convert(state, kind, 1) > 0,
            Command::ConvertMax(kind) => logic::convert(state, kind, u32::MAX) > 0,
            Command::Gamble(key) => risk::gamble(state, key, &mut self.rng, now_ms).is_some(),
            Command::Prestige => {
                let gain = logic::prestige(state, now_ms);
                if gain > 0.0 {
                    self.enqueue_save();
                }
                gain > 0.0
            }
            Command::BuyPermLuck => logic::buy_perm_luck(state),
            Command::ToggleAutoBuy(target) => {
                autobuy::toggle_target(state, target);
                true
            }
            Command::ToggleAutoRisk(key) => {
                state.auto_risk = if state.auto_risk == Some(key) {
                    None
                } else {
                    Some(key)
                };
                true
            }
            Command::SaveNow => {
                self.enqueue_save();
                self.autosave.reset(now_ms);
                self.state.add_log("Saving...", Tone::Neutral);
                true
            }
            Command::SubmitScore => self.submit_score(),
            Command::FullReset => {
                logic::full_reset(state, now_ms);
                self.outbox.send(PersistRequest::ResetProfile);
                true
            }
        };
        if applied {
            self.latest = Snapshot::capture(&self.state, now_ms);
        }
        applied
    }

    fn submit_score(&mut self) -> bool {
        let seconds = match self.state.rank_prompt_seconds {
            Some(s) => s,
            None => {
                self.state.add_log(
                    &format!("Reach {} cash to rank.", format_number(CASH_RANK_TARGET)),
                    Tone::Bad,
                );
                return false;
            }
        };
        if seconds < MIN_SCORE_SECONDS {
            log::warn!("score of {:.3}s is below the minimum, not submitted", seconds);
            return false;
        }
        self.outbox.send(PersistRequest::SubmitScore {
            seconds,
            meta: ScoreMeta::from_state(&self.state),
        });
        self.state
            .add_log(&format!("Submitting {}...", format_duration(seconds)), Tone::Neutral);
        true
    }

    fn enqueue_save(&self) {
        self.outbox
            .send(PersistRequest::SaveGame(capture_save(&self.state)));
        self.outbox
            .send(PersistRequest::SaveStats(StatsUpdate::from_state(&self.state)));
    }

    /// Surface persistence results in the player log.
    pub fn apply_events(&mut self, events: &[PersistEvent]) {
        for event in events {
            match event {
                PersistEvent::Saved => {}
                PersistEvent::ScoreAccepted(receipt) => self.state.add_log(
                    &format!("🏆 Best time {}", format_duration(receipt.best_score_seconds)),
                    Tone::Good,
                ),
                PersistEvent::Failed(what) => {
                    self.state
                        .add_log(&format!("Could not reach storage ({}).", what), Tone::Bad)
                }
            }
        }
    }

    /// Stop every job. The session is inert afterwards.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        for cadence in [
            &mut self.tick,
            &mut self.auto_buy,
            &mut self.auto_risk,
            &mut self.publish,
            &mut self.autosave,
        ] {
            cadence.stop();
        }
        log::info!("scheduler stopped");
    }
}
