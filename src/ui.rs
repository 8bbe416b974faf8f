use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::game::GameState;
use crate::hole::{Hole, HoleStatus};
use crate::App;

/// Screen regions: title, scoreboard, grid, help bar. Shared by the renderer
/// and the mouse hit-testing in the event loop, so clicks always land on
/// what was actually drawn.
pub fn screen_chunks(area: Rect) -> (Rect, Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2], chunks[3])
}

/// One rect per hole inside the grid area: 4 columns when the burrow count
/// is high, 3 otherwise (row-major, hole id order). Each cell is inset from
/// its slot and nudged by the hole's cosmetic scatter, clamped so cells never
/// overlap and never extend past the grid (a short terminal shrinks the
/// bottom row instead of letting it spill under the help bar).
pub fn hole_rects(grid: Rect, holes: &[Hole]) -> Vec<Rect> {
    let n = holes.len();
    if n == 0 || grid.width < 8 || grid.height < 3 {
        return vec![Rect::default(); n];
    }
    let cols = if n >= 7 { 4 } else { 3 };
    let rows = n.div_ceil(cols);

    let cell_w = grid.width / cols as u16;
    let cell_h = (grid.height / rows as u16).max(3);

    holes
        .iter()
        .enumerate()
        .map(|(i, hole)| {
            let col = (i % cols) as u16;
            let row = (i / cols) as u16;
            let slot = Rect::new(
                grid.x + col * cell_w,
                grid.y + row * cell_h,
                cell_w,
                cell_h,
            );
            // inset leaves room for a one-cell scatter nudge
            let inset_x = 2u16.min(slot.width / 4);
            let inset_y = 1u16.min(slot.height / 4);
            let dx = (hole.x_offset / 10.0).round() as i32;
            let dy = (hole.y_offset / 10.0).round() as i32;
            Rect::new(
                slot.x
                    .saturating_add(inset_x)
                    .saturating_add_signed(dx.clamp(-1, 1) as i16),
                slot.y
                    .saturating_add(inset_y)
                    .saturating_add_signed(dy.clamp(-1, 1) as i16),
                slot.width.saturating_sub(inset_x * 2).max(1),
                slot.height.saturating_sub(inset_y * 2).max(1),
            )
            .intersection(grid)
        })
        .collect()
}

/// Maps a click position to the hole under it, if any.
pub fn hole_at(grid: Rect, holes: &[Hole], column: u16, row: u16) -> Option<usize> {
    hole_rects(grid, holes)
        .iter()
        .zip(holes)
        .find(|(rect, _)| {
            column >= rect.x
                && column < rect.x + rect.width
                && row >= rect.y
                && row < rect.y + rect.height
        })
        .map(|(_, hole)| hole.id)
}

fn hole_face(hole: &Hole) -> (String, Style) {
    match hole.status {
        HoleStatus::Empty => (
            "·".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        HoleStatus::Active => (
            hole.mole_kind.glyph().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        HoleStatus::Hit => (
            "💥".to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let game = &self.game;
        let (title_area, score_area, grid_area, help_area) = screen_chunks(area);

        let title = Paragraph::new(Span::styled(
            "WHACK-A-MOLE",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        title.render(title_area, buf);

        let mute_label = if self.muted { "muted" } else { "sound" };
        let score_line = Line::from(vec![
            Span::styled(
                format!("score {:>4}", game.score()),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                format!("time {:>2}", game.time_remaining()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(mute_label, Style::default().fg(Color::DarkGray)),
        ]);
        Paragraph::new(score_line)
            .alignment(Alignment::Center)
            .render(score_area, buf);

        for (hole, rect) in game.holes().iter().zip(hole_rects(grid_area, game.holes())) {
            if rect.width == 0 || rect.height == 0 {
                continue;
            }
            let (face, style) = hole_face(hole);
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!("{}", hole.id + 1));
            let inner = block.inner(rect);
            block.render(rect, buf);
            Paragraph::new(Span::styled(face, style))
                .alignment(Alignment::Center)
                .render(inner, buf);
        }

        let overlay = match game.state() {
            GameState::Idle => Some(Line::from(vec![
                Span::styled(
                    "Ready? ",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("smash the moles, press (s) to start"),
            ])),
            GameState::Finished => Some(Line::from(vec![
                Span::styled(
                    "TIME'S UP! ",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("final score {} ", game.score()),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("press (s) to play again"),
            ])),
            GameState::Playing => None,
        };
        if let Some(line) = overlay {
            let banner = Rect::new(
                grid_area.x,
                grid_area.y + grid_area.height / 2,
                grid_area.width,
                1.min(grid_area.height),
            );
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(banner, buf);
        }

        let help = Paragraph::new(Span::styled(
            "(1-9/click) whack  (s) start  (p) pause  (m) mute  (esc) quit",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        help.render(help_area, buf);
    }
}
