//! Heat & Chips rendering. Reads only the published `Snapshot`.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};
use crate::widgets::{ButtonRow, ClickableList};

use super::actions::*;
use super::config::{CASH_RANK_TARGET, HEAT_MAX, PERM_LUCK_MAX};
use super::key_for_action;
use super::logic::{format_duration, format_number};
use super::snapshot::{ConversionRow, Snapshot, TierRow, UpgradeRow};
use super::state::{ConversionKind, Tone};
use super::UiState;

/// Sparkline characters for the cash graph (8 levels of height).
const SPARKLINE_CHARS: &[char] = &[' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇'];

const HEAT_GAUGE_WIDTH: usize = 20;

pub fn render(
    snap: &Snapshot,
    ui: &UiState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let narrow = is_narrow_layout(area.width);
    // Narrow screens split each upgrade over two rows.
    let upgrade_rows = if narrow { 8 } else { 4 };
    let buff_rows = (snap.buffs.len() as u16).clamp(1, 4);

    if narrow {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(upgrade_rows + 2),
                Constraint::Length(4),
                Constraint::Length(7),
                Constraint::Length(buff_rows + 2),
                Constraint::Length(9),
                Constraint::Min(3),
            ])
            .split(area);
        render_header(snap, f, chunks[0]);
        render_upgrades(snap, f, chunks[1], narrow, click_state);
        render_conversions(snap, f, chunks[2], click_state);
        render_gambles(snap, f, chunks[3], click_state);
        render_buffs(snap, f, chunks[4]);
        render_session(snap, ui, f, chunks[5], click_state);
        render_log(snap, f, chunks[6]);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(upgrade_rows + 2),
            Constraint::Length(4),
            Constraint::Length(7),
            Constraint::Min(0),
        ])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(buff_rows + 2),
            Constraint::Length(9),
            Constraint::Min(3),
        ])
        .split(columns[1]);

    render_header(snap, f, left[0]);
    render_upgrades(snap, f, left[1], narrow, click_state);
    render_conversions(snap, f, left[2], click_state);
    render_gambles(snap, f, left[3], click_state);
    render_buffs(snap, f, right[0]);
    render_session(snap, ui, f, right[1], click_state);
    render_log(snap, f, right[2]);
}

fn key_label(action: u16) -> String {
    match key_for_action(action) {
        Some(c) => format!("[{}]", c),
        None => "[ ]".to_string(),
    }
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn auto_style(on: bool) -> Style {
    if on {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        dim()
    }
}

fn action_style(enabled: bool, color: Color) -> Style {
    if enabled {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        dim()
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Good => Color::Green,
        Tone::Bad => Color::Red,
        Tone::Neutral => Color::White,
    }
}

/// Draw a bordered panel and return its interior.
fn panel(f: &mut Frame, area: Rect, title: &str, color: Color) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ", title));
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner
}

/// The `i`-th row of `inner`, if it fits.
fn row(inner: Rect, i: u16) -> Option<Rect> {
    (i < inner.height).then(|| Rect::new(inner.x, inner.y + i, inner.width, 1))
}

// ── Header ─────────────────────────────────────────────────────

fn render_header(snap: &Snapshot, f: &mut Frame, area: Rect) {
    let res = &snap.resources;
    let rates = &snap.rates;

    let cash_line = Line::from(vec![
        Span::styled(
            format!("${}", format_number(res.cash.floor())),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" +{}/s", format_number(rates.income_per_sec)),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("  ×{:.2}", rates.income_multiplier),
            Style::default().fg(Color::Cyan),
        ),
    ]);

    let chips_line = Line::from(vec![
        Span::styled(
            format!("Chips {}", format_number(res.chips)),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(format!(" +{:.3}/s", rates.chips_per_sec), dim()),
        Span::styled(
            format!("  Insight {}", format_number(res.insight)),
            Style::default().fg(Color::Blue),
        ),
        Span::styled(
            format!("  Luck {:.0}", snap.total_luck),
            Style::default().fg(Color::LightGreen),
        ),
    ]);

    let heat_pct = (res.heat / HEAT_MAX).clamp(0.0, 1.0);
    let heat_color = if heat_pct >= 1.0 { Color::Red } else { Color::LightRed };
    let heat_line = Line::from(vec![
        Span::styled("Heat ", Style::default().fg(heat_color)),
        Span::styled(
            heat_gauge(heat_pct, HEAT_GAUGE_WIDTH),
            Style::default().fg(heat_color),
        ),
        Span::styled(
            format!(" {:>3.0}%", heat_pct * 100.0),
            Style::default().fg(heat_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" +{:.2}/s", rates.heat_per_sec), dim()),
    ]);

    let spark_width = area.width.saturating_sub(8).max(1) as usize;
    let spark_line = Line::from(vec![
        Span::styled("Cash ", dim()),
        Span::styled(
            build_log_sparkline(&snap.cash_history, spark_width),
            Style::default().fg(Color::Yellow),
        ),
    ]);

    let widget = Paragraph::new(vec![cash_line, chips_line, heat_line, spark_line]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Heat & Chips "),
    );
    f.render_widget(widget, area);
}

fn heat_gauge(fraction: f64, width: usize) -> String {
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Sparkline over `ln(1 + cash)`, right-aligned in `max_width` cells.
fn build_log_sparkline(history: &[f64], max_width: usize) -> String {
    if history.is_empty() {
        return "▁".repeat(max_width);
    }
    let scaled = |v: &f64| v.max(0.0).ln_1p();
    let data: Vec<f64> = if history.len() > max_width {
        history[history.len() - max_width..].iter().map(scaled).collect()
    } else {
        let mut padded = vec![0.0; max_width - history.len()];
        padded.extend(history.iter().map(scaled));
        padded
    };
    let max_val = data.iter().cloned().fold(0.0f64, f64::max).max(1.0);
    data.iter()
        .map(|v| {
            let normalized = (v / max_val * 7.0).round() as usize;
            SPARKLINE_CHARS[normalized.min(7)]
        })
        .collect()
}

// ── Upgrades ───────────────────────────────────────────────────

fn render_upgrades(
    snap: &Snapshot,
    f: &mut Frame,
    area: Rect,
    narrow: bool,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let inner = panel(f, area, "Upgrades", Color::Cyan);
    let mut cs = click_state.borrow_mut();
    let mut line = 0u16;
    for up in &snap.upgrades {
        for button_row in upgrade_rows(up, snap.resources.cash, narrow) {
            if let Some(r) = row(inner, line) {
                button_row.render(f, r, &mut cs);
            }
            line += 1;
        }
    }
}

/// One row per upgrade, or two when `split` (buy/bulk, then automation).
fn upgrade_rows(up: &UpgradeRow, cash: f64, split: bool) -> Vec<ButtonRow> {
    let idx = up.key.index() as u16;
    let level = match up.max_level {
        Some(max) => format!("{:>2}/{}", up.level, max),
        None => format!("{:>3}", up.level),
    };

    let buy_action = BUY_UPGRADE_BASE + idx;
    let (buy_text, can_buy) = match up.next_cost {
        Some(cost) => (
            format!(
                "{} {:<8} {} ${}",
                key_label(buy_action),
                up.key.name(),
                level,
                format_number(cost.ceil())
            ),
            cash >= cost,
        ),
        None => (
            format!("{} {:<8} {} MAX", key_label(buy_action), up.key.name(), level),
            false,
        ),
    };

    let bulk_action = BUY_BULK_BASE + idx;
    let bulk_text = if up.bulk_count > 0 {
        format!(
            "{} ×{} ${}",
            key_label(bulk_action),
            up.bulk_count,
            format_number(up.bulk_cost.ceil())
        )
    } else {
        format!("{} ×0", key_label(bulk_action))
    };

    let single_action = AUTO_SINGLE_BASE + idx;
    let auto_bulk_action = AUTO_BULK_BASE + idx;

    let first = ButtonRow::new()
        .button(buy_text, action_style(can_buy, Color::Yellow), buy_action)
        .text(" ", dim())
        .button(
            bulk_text,
            action_style(up.bulk_count > 0, Color::Yellow),
            bulk_action,
        );

    let automation = |r: ButtonRow| {
        r.button(
            format!("{} auto", key_label(single_action)),
            auto_style(up.auto_single),
            single_action,
        )
        .text(" ", dim())
        .button(
            format!("{} auto×", key_label(auto_bulk_action)),
            auto_style(up.auto_bulk),
            auto_bulk_action,
        )
    };

    if split {
        let second = ButtonRow::new().text(format!("    {} ", up.key.effect_text()), dim());
        vec![first, automation(second)]
    } else {
        vec![automation(first.text("  ", dim()))]
    }
}

// ── Conversions ────────────────────────────────────────────────

fn render_conversions(
    snap: &Snapshot,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let inner = panel(f, area, "Convert", Color::Magenta);
    let mut cs = click_state.borrow_mut();
    for (i, conv) in snap.conversions.iter().enumerate() {
        if let Some(r) = row(inner, i as u16) {
            conversion_row(conv).render(f, r, &mut cs);
        }
    }
}

fn conversion_row(conv: &ConversionRow) -> ButtonRow {
    let idx = conv.kind.index() as u16;
    let unit = match conv.kind {
        ConversionKind::CashToChips => "chips",
        ConversionKind::CashToHeat => "heat",
    };
    let can = conv.affordable_units > 0;
    let one = CONVERT_BASE + idx;
    let max = CONVERT_MAX_BASE + idx;
    let auto = AUTO_CONVERT_BASE + idx;
    ButtonRow::new()
        .button(
            format!(
                "{} +10 {} ${}",
                key_label(one),
                unit,
                format_number(conv.unit_cost.ceil())
            ),
            action_style(can, Color::Magenta),
            one,
        )
        .text(" ", dim())
        .button(
            format!("{} max ×{}", key_label(max), conv.affordable_units),
            action_style(can, Color::Magenta),
            max,
        )
        .text(" ", dim())
        .button(format!("{} auto", key_label(auto)), auto_style(conv.auto), auto)
}

// ── Gambles ────────────────────────────────────────────────────

fn render_gambles(
    snap: &Snapshot,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let inner = panel(f, area, "Risk", Color::Red);
    let mut cs = click_state.borrow_mut();
    for (i, tier) in snap.tiers.iter().enumerate() {
        if let Some(r) = row(inner, i as u16) {
            tier_row(tier).render(f, r, &mut cs);
        }
    }

    let status = if snap.resources.heat < HEAT_MAX {
        Line::from(Span::styled("Heat must be full to roll.", dim()))
    } else if let Some(last) = &snap.last_gamble {
        Line::from(Span::styled(
            format!(
                "Last: {} {} (roll {:.2})",
                last.tier.name(),
                last.outcome.name(),
                last.roll
            ),
            Style::default().fg(tone_color(last.outcome.tone())),
        ))
    } else {
        Line::from(Span::styled("Ready to roll.", Style::default().fg(Color::Red)))
    };
    if let Some(r) = row(inner, snap.tiers.len() as u16) {
        f.render_widget(Paragraph::new(status), r);
    }
}

fn tier_row(tier: &TierRow) -> ButtonRow {
    let idx = tier.key.index() as u16;
    let roll = GAMBLE_BASE + idx;
    let auto = AUTO_RISK_BASE + idx;
    let p = &tier.probs;
    ButtonRow::new()
        .button(
            format!(
                "{} {:<5} {:>3} chips",
                key_label(roll),
                tier.key.name(),
                tier.cost
            ),
            action_style(tier.ready, Color::Red),
            roll,
        )
        .text(
            format!(
                "  J{:>3.0}% S{:>3.0}% F{:>3.0}% C{:>3.0}% ",
                p.jackpot * 100.0,
                p.success * 100.0,
                p.fail * 100.0,
                p.crash * 100.0
            ),
            if tier.ready { Style::default().fg(Color::White) } else { dim() },
        )
        .button(format!("{} auto", key_label(auto)), auto_style(tier.auto), auto)
}

// ── Buffs ──────────────────────────────────────────────────────

fn render_buffs(snap: &Snapshot, f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = if snap.buffs.is_empty() {
        vec![Line::from(Span::styled("No active buffs", dim()))]
    } else {
        snap.buffs
            .iter()
            .take(4)
            .map(|b| {
                Line::from(vec![
                    Span::styled(
                        format!("×{:<5}", b.multiplier),
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" {}", format_duration(b.remaining_secs)),
                        Style::default().fg(Color::White),
                    ),
                ])
            })
            .collect()
    };
    let title = format!(" Buffs ×{:.2} ", snap.buff_multiplier());
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(title),
    );
    f.render_widget(widget, area);
}

// ── Prestige and session ───────────────────────────────────────

fn render_session(
    snap: &Snapshot,
    ui: &UiState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut cl = ClickableList::new();

    cl.push_clickable(
        Line::from(Span::styled(
            format!(
                "{} Prestige +{} (have {}, runs {})",
                key_label(PRESTIGE),
                format_number(snap.prestige_gain),
                format_number(snap.resources.prestige),
                snap.prestige_count
            ),
            action_style(snap.can_prestige(), Color::LightYellow),
        )),
        PRESTIGE,
    );

    let perm_text = match snap.perm_luck_cost {
        Some(cost) => format!(
            "{} Perm luck {}/{} (costs {})",
            key_label(BUY_PERM_LUCK),
            snap.perm_luck,
            PERM_LUCK_MAX,
            format_number(cost)
        ),
        None => format!(
            "{} Perm luck {}/{} MAX",
            key_label(BUY_PERM_LUCK),
            snap.perm_luck,
            PERM_LUCK_MAX
        ),
    };
    let can_perm = snap
        .perm_luck_cost
        .is_some_and(|c| snap.resources.prestige >= c);
    cl.push_clickable(
        Line::from(Span::styled(perm_text, action_style(can_perm, Color::LightGreen))),
        BUY_PERM_LUCK,
    );

    let best = match snap.best_time_to_rank {
        Some(s) => format_duration(s),
        None => "--".to_string(),
    };
    cl.push(Line::from(Span::styled(
        format!("Run {}  Best {}", format_duration(snap.elapsed_seconds), best),
        Style::default().fg(Color::White),
    )));

    cl.push_clickable(
        Line::from(Span::styled(
            format!("{} Save now", key_label(SAVE_NOW)),
            Style::default().fg(Color::Cyan),
        )),
        SAVE_NOW,
    );

    let score_text = match snap.rank_prompt_seconds {
        Some(s) => format!("{} Submit {}", key_label(SUBMIT_SCORE), format_duration(s)),
        None => format!(
            "{} Submit (reach {})",
            key_label(SUBMIT_SCORE),
            format_number(CASH_RANK_TARGET)
        ),
    };
    cl.push_clickable(
        Line::from(Span::styled(
            score_text,
            action_style(snap.rank_prompt_seconds.is_some(), Color::LightYellow),
        )),
        SUBMIT_SCORE,
    );

    let (reset_text, reset_style) = if ui.confirm_reset {
        (
            format!("{} Press again to wipe everything", key_label(FULL_RESET)),
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (format!("{} Full reset", key_label(FULL_RESET)), dim())
    };
    cl.push_clickable(Line::from(Span::styled(reset_text, reset_style)), FULL_RESET);

    let inner_width = area.width.saturating_sub(2);
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, inner_width);
    }

    let widget = Paragraph::new(cl.into_lines())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightYellow))
                .title(format!(" Prestige · max ${} ", format_number(snap.max_cash))),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

// ── Log ────────────────────────────────────────────────────────

fn render_log(snap: &Snapshot, f: &mut Frame, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;

    // Newest first.
    let lines: Vec<Line> = snap
        .log
        .iter()
        .rev()
        .take(visible_height)
        .enumerate()
        .map(|(i, entry)| {
            let mut style = Style::default().fg(tone_color(entry.tone));
            if i < 3 {
                style = style.add_modifier(Modifier::BOLD);
            } else if entry.tone == Tone::Neutral {
                style = dim();
            }
            Line::from(Span::styled(entry.text.as_str(), style))
        })
        .collect();

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Log "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clicker::snapshot::Snapshot;
    use crate::clicker::state::{GameState, UpgradeKey};

    #[test]
    fn sparkline_fills_width() {
        let s = build_log_sparkline(&[1.0, 10.0, 100.0], 10);
        assert_eq!(s.chars().count(), 10);
        assert_eq!(build_log_sparkline(&[], 5), "▁▁▁▁▁");
    }

    #[test]
    fn sparkline_is_log_scaled() {
        // Linear scaling would flatten the small value to the baseline.
        let s: Vec<char> = build_log_sparkline(&[1e3, 1e6], 2).chars().collect();
        assert_eq!(s[1], '▇');
        assert!(s[0] >= '▃', "got {:?}", s);
    }

    #[test]
    fn sparkline_keeps_newest_samples() {
        let mut history = vec![1e9; 10];
        history.push(0.0);
        let s: Vec<char> = build_log_sparkline(&history, 4).chars().collect();
        assert_eq!(s[3], ' ');
        assert_eq!(s[0], '▇');
    }

    #[test]
    fn heat_gauge_bounds() {
        assert_eq!(heat_gauge(0.0, 4), "░░░░");
        assert_eq!(heat_gauge(0.5, 4), "██░░");
        assert_eq!(heat_gauge(1.0, 4), "████");
    }

    #[test]
    fn key_labels_match_keymap() {
        assert_eq!(key_label(BUY_UPGRADE_BASE), "[1]");
        assert_eq!(key_label(CONVERT_MAX_BASE + 1), "[H]");
        assert_eq!(key_label(FULL_RESET), "[X]");
    }

    #[test]
    fn upgrade_row_splits_when_narrow() {
        let mut state = GameState::new(0.0);
        state.resources.cash = 1_000.0;
        let snap = Snapshot::capture(&state, 0.0);
        let printer = snap
            .upgrades
            .iter()
            .find(|u| u.key == UpgradeKey::Printer)
            .unwrap();
        assert_eq!(upgrade_rows(printer, 1_000.0, false).len(), 1);
        assert_eq!(upgrade_rows(printer, 1_000.0, true).len(), 2);
    }
}
