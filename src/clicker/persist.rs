//! Persistence collaborator: the `ProfileStore` contract, the request queue
//! the scheduler writes to, and the worker that drains it.
//!
//! The simulation never waits on storage. The scheduler pushes
//! `PersistRequest`s through an `Outbox`; the `PersistWorker` applies them
//! later and only ever reports back through `PersistEvent`s. Failures end
//! at the worker as a warning.

use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::MIN_SCORE_SECONDS;
use super::snapshot::{self, SavedGameState};
use super::state::GameState;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("failed to encode or decode save data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage is not available")]
    Unavailable,
    #[error("save version {found} is older than the minimum compatible version {min}")]
    IncompatibleVersion { found: u32, min: u32 },
    #[error("score of {0} seconds rejected")]
    ScoreRejected(f64),
}

/// Partial stats update. `None` fields leave the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_gamble_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_prestige: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_perm_luck: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cash: Option<f64>,
    #[serde(
        rename = "bestTimeTo1e100Seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub best_time_to_rank: Option<f64>,
}

impl StatsUpdate {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            last_active_gamble_multiplier: Some(super::calc::buff_multiplier(&state.buffs)),
            last_prestige: Some(state.resources.prestige),
            last_perm_luck: Some(state.perm_luck),
            last_cash: Some(state.resources.cash),
            best_time_to_rank: state.best_time_to_rank,
        }
    }

    /// Overlay the fields set in `other`.
    pub fn merge(&mut self, other: &StatsUpdate) {
        if other.last_active_gamble_multiplier.is_some() {
            self.last_active_gamble_multiplier = other.last_active_gamble_multiplier;
        }
        if other.last_prestige.is_some() {
            self.last_prestige = other.last_prestige;
        }
        if other.last_perm_luck.is_some() {
            self.last_perm_luck = other.last_perm_luck;
        }
        if other.last_cash.is_some() {
            self.last_cash = other.last_cash;
        }
        if other.best_time_to_rank.is_some() {
            self.best_time_to_rank = other.best_time_to_rank;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMeta {
    pub cash: f64,
    pub prestige: f64,
    pub prestige_count: u32,
    pub perm_luck: u32,
}

impl ScoreMeta {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            cash: state.resources.cash,
            prestige: state.resources.prestige,
            prestige_count: state.prestige_count,
            perm_luck: state.perm_luck,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReceipt {
    pub best_score_seconds: f64,
}

/// Backing storage for profiles, saves, stats and scores.
pub trait ProfileStore {
    fn load_save(&mut self, profile_id: &str) -> Result<Option<SavedGameState>, PersistError>;
    fn save_game(&mut self, profile_id: &str, save: &SavedGameState) -> Result<(), PersistError>;
    fn save_stats(&mut self, profile_id: &str, stats: &StatsUpdate) -> Result<(), PersistError>;
    fn submit_score(
        &mut self,
        user_id: &str,
        seconds: f64,
        meta: &ScoreMeta,
    ) -> Result<ScoreReceipt, PersistError>;
    fn reset_profile(&mut self, profile_id: &str) -> Result<(), PersistError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum PersistRequest {
    SaveGame(SavedGameState),
    SaveStats(StatsUpdate),
    SubmitScore { seconds: f64, meta: ScoreMeta },
    ResetProfile,
}

impl PersistRequest {
    pub fn name(&self) -> &'static str {
        match self {
            PersistRequest::SaveGame(_) => "save",
            PersistRequest::SaveStats(_) => "stats",
            PersistRequest::SubmitScore { .. } => "score",
            PersistRequest::ResetProfile => "reset",
        }
    }
}

/// What the worker reports back to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum PersistEvent {
    Saved,
    ScoreAccepted(ScoreReceipt),
    Failed(&'static str),
}

/// Sending half of the persistence queue. Never blocks.
#[derive(Clone)]
pub struct Outbox {
    sender: Sender<PersistRequest>,
}

impl Outbox {
    pub fn send(&self, request: PersistRequest) {
        let name = request.name();
        if self.sender.send(request).is_err() {
            log::warn!("persist: worker gone, dropping {} request", name);
        }
    }
}

pub fn channel() -> (Outbox, Receiver<PersistRequest>) {
    let (sender, receiver) = unbounded::<PersistRequest>();
    (Outbox { sender }, receiver)
}

/// Drains queued requests into a store. Errors are logged and counted.
pub struct PersistWorker<S: ProfileStore> {
    store: S,
    receiver: Receiver<PersistRequest>,
    profile_id: String,
    user_id: String,
    failures: u64,
}

impl<S: ProfileStore> PersistWorker<S> {
    pub fn new(
        store: S,
        receiver: Receiver<PersistRequest>,
        profile_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            receiver,
            profile_id: profile_id.into(),
            user_id: user_id.into(),
            failures: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Apply everything queued so far.
    pub fn drain(&mut self) -> Vec<PersistEvent> {
        let mut events = Vec::new();
        while let Ok(request) = self.receiver.try_recv() {
            let name = request.name();
            match self.apply(request) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(err) => {
                    self.failures += 1;
                    log::warn!("persist: {} failed: {}", name, err);
                    events.push(PersistEvent::Failed(name));
                }
            }
        }
        events
    }

    fn apply(&mut self, request: PersistRequest) -> Result<Option<PersistEvent>, PersistError> {
        match request {
            PersistRequest::SaveGame(save) => {
                self.store.save_game(&self.profile_id, &save)?;
                Ok(Some(PersistEvent::Saved))
            }
            PersistRequest::SaveStats(stats) => {
                self.store.save_stats(&self.profile_id, &stats)?;
                Ok(None)
            }
            PersistRequest::SubmitScore { seconds, meta } => {
                if !(seconds >= MIN_SCORE_SECONDS) {
                    return Err(PersistError::ScoreRejected(seconds));
                }
                let receipt = self.store.submit_score(&self.user_id, seconds, &meta)?;
                log::info!(
                    "persist: score {:.1}s accepted, best {:.1}s",
                    seconds,
                    receipt.best_score_seconds
                );
                Ok(Some(PersistEvent::ScoreAccepted(receipt)))
            }
            PersistRequest::ResetProfile => {
                self.store.reset_profile(&self.profile_id)?;
                Ok(None)
            }
        }
    }
}

/// Load a profile into a fresh session. Anything short of a valid save
/// starts a new game.
pub fn load_session<S: ProfileStore>(store: &mut S, profile_id: &str, now_ms: f64) -> GameState {
    match store.load_save(profile_id) {
        Ok(Some(save)) => {
            log::info!("save: loaded profile {}", profile_id);
            snapshot::restore(save, now_ms)
        }
        Ok(None) => GameState::new(now_ms),
        Err(err) => {
            log::warn!("save: discarded ({}), starting a new game", err);
            GameState::new(now_ms)
        }
    }
}

/// Decode a stored payload. One that fails to decode is discarded so the next
/// load starts fresh; a failed discard is only logged.
fn decode_or_discard(
    json: &str,
    profile_id: &str,
    discard: impl FnOnce() -> Result<(), PersistError>,
) -> Result<Option<SavedGameState>, PersistError> {
    match snapshot::decode_save(json) {
        Ok(save) => Ok(Some(save)),
        Err(err) => {
            if let Err(discard_err) = discard() {
                log::warn!("persist: could not drop corrupt save for {}: {}", profile_id, discard_err);
            }
            Err(err)
        }
    }
}

#[derive(Clone, Debug, Default)]
struct ProfileRecord {
    save_json: Option<String>,
    stats: StatsUpdate,
}

/// In-memory store. Saves go through the JSON wire format like a real backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: HashMap<String, ProfileRecord>,
    best_scores: HashMap<String, f64>,
    /// Every write fails with `Storage` while set.
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_json(&self, profile_id: &str) -> Option<&str> {
        self.profiles.get(profile_id)?.save_json.as_deref()
    }

    /// Put a raw payload in place, e.g. a corrupted one.
    pub fn put_save_json(&mut self, profile_id: &str, json: impl Into<String>) {
        self.profiles.entry(profile_id.to_string()).or_default().save_json = Some(json.into());
    }

    pub fn stats(&self, profile_id: &str) -> Option<&StatsUpdate> {
        self.profiles.get(profile_id).map(|p| &p.stats)
    }

    pub fn best_score(&self, user_id: &str) -> Option<f64> {
        self.best_scores.get(user_id).copied()
    }

    fn check_writable(&self) -> Result<(), PersistError> {
        if self.fail_writes {
            return Err(PersistError::Storage("write refused".into()));
        }
        Ok(())
    }
}

impl ProfileStore for MemoryStore {
    fn load_save(&mut self, profile_id: &str) -> Result<Option<SavedGameState>, PersistError> {
        let json = match self.save_json(profile_id) {
            Some(j) => j.to_string(),
            None => return Ok(None),
        };
        decode_or_discard(&json, profile_id, || {
            self.check_writable()?;
            if let Some(p) = self.profiles.get_mut(profile_id) {
                p.save_json = None;
            }
            Ok(())
        })
    }

    fn save_game(&mut self, profile_id: &str, save: &SavedGameState) -> Result<(), PersistError> {
        self.check_writable()?;
        let json = snapshot::encode_save(save)?;
        self.put_save_json(profile_id, json);
        Ok(())
    }

    fn save_stats(&mut self, profile_id: &str, stats: &StatsUpdate) -> Result<(), PersistError> {
        self.check_writable()?;
        self.profiles
            .entry(profile_id.to_string())
            .or_default()
            .stats
            .merge(stats);
        Ok(())
    }

    fn submit_score(
        &mut self,
        user_id: &str,
        seconds: f64,
        _meta: &ScoreMeta,
    ) -> Result<ScoreReceipt, PersistError> {
        self.check_writable()?;
        let best = self
            .best_scores
            .entry(user_id.to_string())
            .or_insert(seconds);
        *best = best.min(seconds);
        Ok(ScoreReceipt {
            best_score_seconds: *best,
        })
    }

    fn reset_profile(&mut self, profile_id: &str) -> Result<(), PersistError> {
        self.check_writable()?;
        self.profiles.remove(profile_id);
        Ok(())
    }
}

/// Browser `localStorage` store.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Result<web_sys::Storage, PersistError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(PersistError::Unavailable)
    }

    fn key(kind: &str, id: &str) -> String {
        format!("heat_clicker_{kind}:{id}")
    }

    fn get(key: &str) -> Result<Option<String>, PersistError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| PersistError::Storage(format!("{e:?}")))
    }

    fn set(key: &str, value: &str) -> Result<(), PersistError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| PersistError::Storage(format!("{e:?}")))
    }

    fn remove(key: &str) -> Result<(), PersistError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| PersistError::Storage(format!("{e:?}")))
    }
}

#[cfg(target_arch = "wasm32")]
impl ProfileStore for LocalStorageStore {
    fn load_save(&mut self, profile_id: &str) -> Result<Option<SavedGameState>, PersistError> {
        let key = Self::key("save", profile_id);
        let json = match Self::get(&key)? {
            Some(j) => j,
            None => return Ok(None),
        };
        decode_or_discard(&json, profile_id, || Self::remove(&key))
    }

    fn save_game(&mut self, profile_id: &str, save: &SavedGameState) -> Result<(), PersistError> {
        let json = snapshot::encode_save(save)?;
        Self::set(&Self::key("save", profile_id), &json)
    }

    fn save_stats(&mut self, profile_id: &str, stats: &StatsUpdate) -> Result<(), PersistError> {
        let key = Self::key("stats", profile_id);
        let mut current: StatsUpdate = match Self::get(&key)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_default(),
            None => StatsUpdate::default(),
        };
        current.merge(stats);
        Self::set(&key, &serde_json::to_string(&current)?)
    }

    fn submit_score(
        &mut self,
        user_id: &str,
        seconds: f64,
        _meta: &ScoreMeta,
    ) -> Result<ScoreReceipt, PersistError> {
        let key = Self::key("best", user_id);
        let previous = Self::get(&key)?.and_then(|s| s.parse::<f64>().ok());
        let best = previous.map_or(seconds, |p| p.min(seconds));
        Self::set(&key, &best.to_string())?;
        Ok(ScoreReceipt {
            best_score_seconds: best,
        })
    }

    fn reset_profile(&mut self, profile_id: &str) -> Result<(), PersistError> {
        Self::remove(&Self::key("save", profile_id))?;
        Self::remove(&Self::key("stats", profile_id))
    }
}
