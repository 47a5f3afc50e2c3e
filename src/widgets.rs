//! Clickable UI components.
//!
//! Each component renders its text and registers the matching click targets
//! in one place, so what the player sees and what they can tap never drift
//! apart.
//!
//! - [`ButtonRow`]: several buttons side by side on one terminal row.
//! - [`ClickableList`]: a vertical list with per-row click targets.

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::style::Style;
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::Paragraph;
use ratzilla::ratatui::Frame;

use crate::input::ClickState;

// ── ButtonRow ──────────────────────────────────────────────────

enum Segment {
    Text(String, Style),
    Button(String, Style, u16),
}

/// One row of mixed text and buttons.
///
/// Each button gets a click target exactly as wide as its label, measured
/// with `Line::width` so wide glyphs (→, ×) are counted correctly.
///
/// ```ignore
/// ButtonRow::new()
///     .button("[1] Printer", buy_style, BUY_UPGRADE_BASE)
///     .text("  ", Style::default())
///     .button("[5] auto", auto_style, AUTO_SINGLE_BASE)
///     .render(f, row, &mut cs);
/// ```
pub struct ButtonRow {
    segments: Vec<Segment>,
}

impl ButtonRow {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>, style: Style) -> Self {
        self.segments.push(Segment::Text(text.into(), style));
        self
    }

    pub fn button(mut self, label: impl Into<String>, style: Style, action_id: u16) -> Self {
        self.segments
            .push(Segment::Button(label.into(), style, action_id));
        self
    }

    /// `(column offset, width, action_id)` for every button, clipped to `max_width`.
    fn button_spans(&self, max_width: u16) -> Vec<(u16, u16, u16)> {
        let mut out = Vec::new();
        let mut cursor: u16 = 0;
        for seg in &self.segments {
            let (text, action) = match seg {
                Segment::Text(t, _) => (t, None),
                Segment::Button(t, _, id) => (t, Some(*id)),
            };
            let w = Line::from(text.as_str()).width() as u16;
            if let Some(id) = action {
                let visible = w.min(max_width.saturating_sub(cursor));
                if visible > 0 {
                    out.push((cursor, visible, id));
                }
            }
            cursor = cursor.saturating_add(w);
        }
        out
    }

    /// Render into the first row of `area` and register the button targets.
    pub fn render(self, f: &mut Frame, area: Rect, cs: &mut ClickState) {
        if area.height == 0 {
            return;
        }
        let row = Rect::new(area.x, area.y, area.width, 1);
        for (offset, width, id) in self.button_spans(row.width) {
            cs.add_click_target(Rect::new(row.x + offset, row.y, width, 1), id);
        }
        let spans: Vec<Span> = self
            .segments
            .into_iter()
            .map(|seg| match seg {
                Segment::Text(t, style) | Segment::Button(t, style, _) => Span::styled(t, style),
            })
            .collect();
        f.render_widget(Paragraph::new(Line::from(spans)), row);
    }
}

// ── ClickableList ──────────────────────────────────────────────

/// Pairs rendered [`Line`]s with click actions.
///
/// Lines added with [`push_clickable`](ClickableList::push_clickable) keep
/// their action bound to whatever row they end up on, so inserting a status
/// line above a button never breaks its target.
pub struct ClickableList<'a> {
    lines: Vec<Line<'a>>,
    /// `(line_index, action_id)`
    actions: Vec<(u16, u16)>,
}

impl<'a> ClickableList<'a> {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Add a non-clickable line.
    pub fn push(&mut self, line: Line<'a>) {
        self.lines.push(line);
    }

    /// Add a line that triggers `action_id` when tapped.
    pub fn push_clickable(&mut self, line: Line<'a>, action_id: u16) {
        let idx = self.lines.len() as u16;
        self.actions.push((idx, action_id));
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn into_lines(self) -> Vec<Line<'a>> {
        self.lines
    }

    /// Register click targets for all clickable lines.
    ///
    /// `top_offset`/`bottom_offset` are the border rows of the widget.
    /// `inner_width` is the wrap width, or `0` when the widget does not wrap.
    pub fn register_targets(
        &self,
        area: Rect,
        cs: &mut ClickState,
        top_offset: u16,
        bottom_offset: u16,
        inner_width: u16,
    ) {
        let content_y = area.y + top_offset;
        let content_end = area.y + area.height.saturating_sub(bottom_offset);

        let mut visual_starts: Vec<u16> = Vec::with_capacity(self.lines.len());
        let mut visual_heights: Vec<u16> = Vec::with_capacity(self.lines.len());
        let mut cumulative: u16 = 0;
        for line in &self.lines {
            visual_starts.push(cumulative);
            let lw = line.width();
            let h = if inner_width == 0 || lw <= inner_width as usize {
                1
            } else {
                lw.div_ceil(inner_width as usize) as u16
            };
            visual_heights.push(h);
            cumulative += h;
        }

        for &(line_idx, action_id) in &self.actions {
            let li = line_idx as usize;
            for r in 0..visual_heights[li] {
                let screen_row = content_y + visual_starts[li] + r;
                if screen_row >= content_end {
                    break;
                }
                cs.add_row_target(area, screen_row, action_id);
            }
        }
    }
}
