mod clicker;
mod input;
mod logging;
mod time;
mod widgets;

use std::{cell::RefCell, io, rc::Rc};

use clicker::persist::{self, PersistWorker};
use clicker::scheduler::Scheduler;
use clicker::ClickerGame;
use input::{ClickState, InputEvent};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use ratzilla::event::{KeyCode, MouseButton, MouseEventKind};
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};

const PROFILE_ID: &str = "local";
const USER_ID: &str = "local";

#[cfg(target_arch = "wasm32")]
fn open_store() -> persist::LocalStorageStore {
    persist::LocalStorageStore
}

#[cfg(not(target_arch = "wasm32"))]
fn open_store() -> persist::MemoryStore {
    persist::MemoryStore::new()
}

/// Epoch milliseconds. Buff expiry and the run clock are stored as epoch
/// times, so they survive a reload.
fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Pixel position → action ID, using the grid container's bounding rect.
fn dom_hit_test(mouse_x: u32, mouse_y: u32, cs: &ClickState) -> Option<u16> {
    let window = web_sys::window()?;
    let document = window.document()?;

    // DomBackend creates a <div> as the grid container inside <body>.
    let grid = document.query_selector("body > div").ok()??;
    let rect = grid.get_bounding_client_rect();

    let hit = cs.locate(
        mouse_x as f64 - rect.left(),
        mouse_y as f64 - rect.top(),
        rect.width(),
        rect.height(),
    );
    log::debug!("click: x={} y={} action={:?}", mouse_x, mouse_y, hit);
    hit
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();
    logging::init();

    let start = now_ms();
    let mut store = open_store();
    let state = persist::load_session(&mut store, PROFILE_ID, start);
    let (outbox, requests) = persist::channel();
    let rng = SmallRng::seed_from_u64(start as u64);

    let game = Rc::new(RefCell::new(ClickerGame::new(Scheduler::new(
        state, rng, outbox, start,
    ))));
    let worker = Rc::new(RefCell::new(PersistWorker::new(
        store, requests, PROFILE_ID, USER_ID,
    )));
    let click_state = Rc::new(RefCell::new(ClickState::new()));

    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;

    terminal.on_mouse_event({
        let game = game.clone();
        let click_state = click_state.clone();
        move |mouse_event| {
            if mouse_event.event != MouseEventKind::Pressed
                || mouse_event.button != MouseButton::Left
            {
                return;
            }
            let hit = {
                let cs = click_state.borrow();
                if cs.terminal_rows == 0 || cs.terminal_cols == 0 {
                    return;
                }
                dom_hit_test(mouse_event.x, mouse_event.y, &cs)
            };
            if let Some(action) = hit {
                game.borrow_mut()
                    .handle_input(&InputEvent::Click(action), now_ms());
            }
        }
    });

    terminal.on_key_event({
        let game = game.clone();
        move |key_event| {
            if let KeyCode::Char(c) = key_event.code {
                game.borrow_mut().handle_input(&InputEvent::Key(c), now_ms());
            }
        }
    });

    terminal.draw_web(move |f| {
        let now = now_ms();
        let mut game = game.borrow_mut();
        game.tick(now);

        let events = worker.borrow_mut().drain();
        if !events.is_empty() {
            game.scheduler.apply_events(&events);
        }

        let size = f.area();
        {
            let mut cs = click_state.borrow_mut();
            cs.terminal_cols = size.width;
            cs.terminal_rows = size.height;
            cs.clear_targets();
        }
        game.render(f, size, &click_state);
    });

    Ok(())
}
