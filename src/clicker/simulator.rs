//! Long-run session simulator for Heat & Chips.
//! Run with: cargo test simulate_ -- --nocapture

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::clicker::config::{CASH_MAX, HEAT_MAX, LUCK_MAX};
    use crate::clicker::logic::{format_duration, format_number};
    use crate::clicker::persist::{self, MemoryStore, PersistEvent, PersistWorker};
    use crate::clicker::scheduler::{Command, Scheduler};
    use crate::clicker::snapshot::decode_save;
    use crate::clicker::state::*;

    const FRAME_MS: f64 = 100.0;
    const PROFILE: &str = "sim-profile";

    struct Run {
        scheduler: Scheduler<ChaCha8Rng>,
        worker: PersistWorker<MemoryStore>,
        now_ms: f64,
        gambles: u32,
        events: Vec<PersistEvent>,
    }

    fn start(seed: u64, store: MemoryStore) -> Run {
        let (outbox, rx) = persist::channel();
        let scheduler = Scheduler::new(
            GameState::new(0.0),
            ChaCha8Rng::seed_from_u64(seed),
            outbox,
            0.0,
        );
        Run {
            scheduler,
            worker: PersistWorker::new(store, rx, PROFILE, "sim-user"),
            now_ms: 0.0,
            gambles: 0,
            events: Vec::new(),
        }
    }

    fn enable_all_automation(run: &mut Run, risk: RiskKey) {
        for &key in UpgradeKey::all() {
            for mode in [BuyMode::Single, BuyMode::Bulk] {
                run.scheduler
                    .dispatch(Command::ToggleAutoBuy(AutoBuyTarget::Upgrade { key, mode }), 0.0);
            }
        }
        for &kind in ConversionKind::all() {
            run.scheduler
                .dispatch(Command::ToggleAutoBuy(AutoBuyTarget::Conversion(kind)), 0.0);
        }
        run.scheduler.dispatch(Command::ToggleAutoRisk(risk), 0.0);
    }

    fn assert_bounds(state: &GameState) {
        let r = &state.resources;
        assert!(r.cash >= 0.0 && r.cash <= CASH_MAX, "cash {}", r.cash);
        assert!(r.chips >= 0.0, "chips {}", r.chips);
        assert!((0.0..=HEAT_MAX).contains(&r.heat), "heat {}", r.heat);
        assert!((0.0..=LUCK_MAX).contains(&r.luck), "luck {}", r.luck);
        for &key in UpgradeKey::all() {
            if let Some(max) = key.upgrade().max_level {
                assert!(state.levels.get(key) <= max, "{} over cap", key.name());
            }
        }
    }

    /// Drive the session for `seconds` of wall time.
    fn simulate(run: &mut Run, seconds: u32) {
        let frames = (seconds as f64 * 1000.0 / FRAME_MS) as u32;
        for _ in 0..frames {
            run.now_ms += FRAME_MS;
            let report = run.scheduler.step(run.now_ms);
            if report.auto_gamble.is_some() {
                run.gambles += 1;
            }
            let events = run.worker.drain();
            run.scheduler.apply_events(&events);
            run.events.extend(events);
            assert_bounds(run.scheduler.state());
        }
    }

    fn report(run: &Run) {
        let state = run.scheduler.state();
        let levels: Vec<String> = UpgradeKey::all()
            .iter()
            .map(|k| format!("{}:{}", k.name(), state.levels.get(*k)))
            .collect();
        eprintln!("┌─── {} ───", format_duration(run.now_ms / 1000.0));
        eprintln!(
            "│ Cash: {}  Chips: {}  Insight: {}",
            format_number(state.resources.cash),
            format_number(state.resources.chips),
            format_number(state.resources.insight)
        );
        eprintln!("│ Levels: {}", levels.join("  "));
        eprintln!("│ Gambles: {}  Buffs live: {}", run.gambles, state.buffs.len());
        eprintln!("└────────────────────────────────────");
    }

    #[test]
    fn simulate_one_hour_fully_automated() {
        let mut run = start(42, MemoryStore::new());
        enable_all_automation(&mut run, RiskKey::Low);

        for _ in 0..6 {
            simulate(&mut run, 600);
            report(&run);
        }

        let state = run.scheduler.state();
        assert!(state.levels.printer > 0);
        assert!(run.gambles > 0, "auto-gamble never fired");
        assert!(state.max_cash >= state.resources.cash);
        assert_eq!(run.worker.failures(), 0);

        // The autosave cadence arms on the first frame (t=100ms), so the
        // sixth save would land just past the hour. Levels only grow after
        // the newest save.
        let saved = run
            .events
            .iter()
            .filter(|e| matches!(e, PersistEvent::Saved))
            .count();
        assert_eq!(saved, 5);
        let json = run.worker.store().save_json(PROFILE).unwrap();
        let save = decode_save(json).unwrap();
        for &key in UpgradeKey::all() {
            assert!(save.levels.get(key) <= state.levels.get(key));
        }
        assert!(run.worker.store().stats(PROFILE).is_some());
    }

    #[test]
    fn simulate_ultra_risk_keeps_bounds() {
        let mut run = start(7, MemoryStore::new());
        enable_all_automation(&mut run, RiskKey::Ultra);
        simulate(&mut run, 1_800);
        report(&run);
        assert_bounds(run.scheduler.state());
    }

    #[test]
    fn simulate_storage_outage() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        let mut run = start(9, store);
        enable_all_automation(&mut run, RiskKey::Mid);
        run.scheduler.dispatch(Command::SaveNow, 0.0);
        simulate(&mut run, 1_200);

        // Every save and stats write failed; the session kept going.
        assert!(run.worker.failures() >= 2);
        assert!(run
            .events
            .iter()
            .all(|e| matches!(e, PersistEvent::Failed(_))));
        assert!(run.scheduler.state().levels.printer > 0);
        assert!(run
            .scheduler
            .state()
            .log
            .iter()
            .any(|l| l.text.starts_with("Could not reach storage")));
    }

    #[test]
    fn simulate_prestige_loop() {
        let mut run = start(11, MemoryStore::new());
        enable_all_automation(&mut run, RiskKey::Mid);
        let mut prestiges = 0;
        for _ in 0..4 {
            simulate(&mut run, 900);
            let now = run.now_ms;
            if run.scheduler.snapshot().can_prestige() && run.scheduler.dispatch(Command::Prestige, now) {
                prestiges += 1;
                // Automation survives the reset.
                assert!(!run.scheduler.state().auto_buy.is_empty());
                assert_eq!(run.scheduler.state().levels.printer, 0);
            }
        }
        report(&run);
        assert_eq!(run.scheduler.state().prestige_count, prestiges);
        assert_bounds(run.scheduler.state());
    }
}
