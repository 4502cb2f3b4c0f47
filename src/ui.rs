//! Layout and drawing: menu, instructions, playfield, game over, sidebar, tap flashes.
//!
//! The 400×800 logical field is drawn as a square block of terminal cells (cells are
//! roughly twice as tall as wide). A cell shows whatever contains its centre point, and
//! mouse clicks are mapped back to that same centre, so anything visible is hittable.

use crate::app::Screen;
use crate::game::{FIELD_HEIGHT, FIELD_WIDTH, GameState, LANES, Tile, TileKind};
use crate::input::Action;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

const SIDEBAR_WIDTH: u16 = 24;
/// Largest board edge in cells; bigger terminals just get more margin.
const MAX_BOARD_CELLS: u16 = 48;
const TAP_FLASH_MS: u32 = 250;

/// A menu button in logical field coordinates. `tone` picks its colour from the theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Button {
    pub label: &'static str,
    /// What a click does; same as the button's keyboard shortcut.
    pub action: Action,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub tone: TileKind,
}

impl Button {
    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

const CENTER_X: f32 = FIELD_WIDTH / 2.0 - 75.0;
const UPPER_Y: f32 = FIELD_HEIGHT / 2.0 - 50.0;
const LOWER_Y: f32 = FIELD_HEIGHT / 2.0 + 20.0;

pub const START_BUTTON: Button = Button {
    label: "Start",
    action: Action::Confirm,
    x: CENTER_X,
    y: UPPER_Y,
    width: 150.0,
    height: 50.0,
    tone: TileKind::Good,
};
pub const INSTRUCTIONS_BUTTON: Button = Button {
    label: "Instructions",
    action: Action::Instructions,
    x: CENTER_X,
    y: LOWER_Y,
    width: 150.0,
    height: 50.0,
    tone: TileKind::Bonus,
};
pub const BACK_BUTTON: Button = Button {
    label: "Back",
    action: Action::Back,
    x: 10.0,
    y: 10.0,
    width: 100.0,
    height: 40.0,
    tone: TileKind::Bad,
};
pub const REPLAY_BUTTON: Button = Button {
    label: "Replay",
    ..START_BUTTON
};
pub const QUIT_BUTTON: Button = Button {
    label: "Quit",
    action: Action::Quit,
    tone: TileKind::Bad,
    ..INSTRUCTIONS_BUTTON
};

/// Buttons visible on a screen, in hit-test order.
pub fn buttons_for(screen: Screen) -> &'static [Button] {
    match screen {
        Screen::Menu => &[START_BUTTON, INSTRUCTIONS_BUTTON],
        Screen::Instructions => &[BACK_BUTTON],
        Screen::GameOver => &[REPLAY_BUTTON, QUIT_BUTTON],
        Screen::Playing => &[],
    }
}

/// Where the logical field sits on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    /// Board cells, inside the border.
    pub board: Rect,
    pub sidebar: Rect,
}

impl FieldMap {
    pub fn for_area(area: Rect) -> Self {
        let avail_rows = area.height.saturating_sub(2);
        let avail_cols = area.width.saturating_sub(2 + SIDEBAR_WIDTH);
        let edge = avail_rows.min(avail_cols).min(MAX_BOARD_CELLS).max(1);
        let outer_w = edge + 2;
        let outer_h = edge + 2;

        let horiz = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(outer_w + SIDEBAR_WIDTH),
                Constraint::Fill(1),
            ])
            .split(area);
        let vert = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(outer_h),
                Constraint::Fill(1),
            ])
            .split(horiz[1]);
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(outer_w), Constraint::Length(SIDEBAR_WIDTH)])
            .split(vert[1]);
        let outer = inner[0];
        Self {
            board: Rect {
                x: outer.x + 1,
                y: outer.y + 1,
                width: outer.width.saturating_sub(2),
                height: outer.height.saturating_sub(2),
            },
            sidebar: inner[1],
        }
    }

    /// Board plus its border.
    pub fn outer(&self) -> Rect {
        Rect {
            x: self.board.x.saturating_sub(1),
            y: self.board.y.saturating_sub(1),
            width: self.board.width + 2,
            height: self.board.height + 2,
        }
    }

    fn cell_size(&self) -> (f32, f32) {
        (
            FIELD_WIDTH / f32::from(self.board.width.max(1)),
            FIELD_HEIGHT / f32::from(self.board.height.max(1)),
        )
    }

    /// Logical centre of board cell (col, row), board-relative.
    pub fn cell_center(&self, col: u16, row: u16) -> (f32, f32) {
        let (cw, ch) = self.cell_size();
        ((f32::from(col) + 0.5) * cw, (f32::from(row) + 0.5) * ch)
    }

    /// Terminal position to logical coordinates; None outside the board.
    pub fn to_logical(&self, column: u16, row: u16) -> Option<(f32, f32)> {
        let b = self.board;
        if column < b.x || row < b.y || column >= b.x + b.width || row >= b.y + b.height {
            return None;
        }
        Some(self.cell_center(column - b.x, row - b.y))
    }

    /// Board row a logical y falls on, clamped to the board.
    pub fn row_of(&self, y: f32) -> u16 {
        let (_, ch) = self.cell_size();
        let row = (y / ch).floor().max(0.0) as u16;
        self.board.y + row.min(self.board.height.saturating_sub(1))
    }

    /// Absolute terminal cells whose centre lies in the logical rect (x, y, w, h).
    pub fn covered_cells(&self, x: f32, y: f32, w: f32, h: f32) -> Vec<(u16, u16)> {
        let (cw, ch) = self.cell_size();
        let span = |lo: f32, hi: f32, size: f32, cells: u16| {
            let first = ((lo / size).floor().max(0.0) as u16).min(cells);
            let last = ((hi / size).ceil().max(0.0) as u16).min(cells);
            first..last
        };
        let mut out = Vec::new();
        for row in span(y, y + h, ch, self.board.height) {
            for col in span(x, x + w, cw, self.board.width) {
                let (px, py) = self.cell_center(col, row);
                if px >= x && px < x + w && py >= y && py < y + h {
                    out.push((self.board.x + col, self.board.y + row));
                }
            }
        }
        out
    }

    /// Smallest terminal rect around the cells a logical rect covers.
    pub fn bounding_rect(&self, x: f32, y: f32, w: f32, h: f32) -> Option<Rect> {
        let cells = self.covered_cells(x, y, w, h);
        let (&(x0, y0), &(x1, y1)) = (cells.first()?, cells.last()?);
        Some(Rect {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }
}

/// Short fade left behind where a tile was tapped.
pub struct TapFlash {
    pub tile: Tile,
    effect: Effect,
    last_processed: Option<Instant>,
}

impl TapFlash {
    pub fn new(tile: Tile, theme: &Theme) -> Self {
        let effect = fx::fade_to(theme.bg, theme.bg, (TAP_FLASH_MS, Interpolation::Linear));
        Self {
            tile,
            effect,
            last_processed: None,
        }
    }

    pub fn done(&self) -> bool {
        self.effect.done()
    }
}

/// Draw the current screen. `flashes` are advanced by the time since they were last drawn.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    flashes: &mut [TapFlash],
    now: Instant,
) {
    let map = FieldMap::for_area(frame.area());
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(frame.area(), frame.buffer_mut());
    draw_board_frame(frame, &map, theme, screen);

    match screen {
        Screen::Menu => draw_menu(frame.buffer_mut(), &map, theme),
        Screen::Instructions => draw_instructions(frame.buffer_mut(), &map, theme),
        Screen::Playing => {
            draw_lanes(frame.buffer_mut(), &map, theme);
            let buf = frame.buffer_mut();
            for t in &state.tiles {
                fill_logical(buf, &map, t.x, t.y, t.width, t.height, theme.tile_color(t.kind));
            }
            draw_flashes(frame, &map, flashes, now);
            draw_sidebar(frame.buffer_mut(), &map, state, theme);
        }
        Screen::GameOver => draw_game_over(frame.buffer_mut(), &map, state, theme),
    }
}

fn draw_board_frame(frame: &mut Frame, map: &FieldMap, theme: &Theme, screen: Screen) {
    let title = match screen {
        Screen::Playing => " FlashTap ",
        Screen::Menu => " FlashTap  menu ",
        Screen::Instructions => " FlashTap  how to play ",
        Screen::GameOver => " FlashTap  game over ",
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)))
        .render(map.outer(), frame.buffer_mut());
}

/// Paint the cells whose centre lies in a logical rect.
fn fill_logical(buf: &mut Buffer, map: &FieldMap, x: f32, y: f32, w: f32, h: f32, color: Color) {
    for (cx, cy) in map.covered_cells(x, y, w, h) {
        buf[(cx, cy)]
            .set_symbol(" ")
            .set_style(Style::default().bg(color));
    }
}

/// Centred text on a logical row.
fn text_at(buf: &mut Buffer, map: &FieldMap, y: f32, text: &str, style: Style) {
    let row = map.row_of(y);
    let width = text.chars().count() as u16;
    let x = map.board.x + map.board.width.saturating_sub(width) / 2;
    buf.set_stringn(x, row, text, map.board.width as usize, style);
}

fn draw_button(buf: &mut Buffer, map: &FieldMap, theme: &Theme, button: &Button) {
    let color = theme.tile_color(button.tone);
    fill_logical(buf, map, button.x, button.y, button.width, button.height, color);
    let Some(rect) = map.bounding_rect(button.x, button.y, button.width, button.height) else {
        return;
    };
    let label = if (button.label.len() as u16) > rect.width {
        &button.label[..rect.width as usize]
    } else {
        button.label
    };
    let x = rect.x + (rect.width - label.len() as u16) / 2;
    let y = rect.y + rect.height / 2;
    buf.set_string(x, y, label, Style::default().fg(Color::Black).bg(color).bold());
}

fn draw_menu(buf: &mut Buffer, map: &FieldMap, theme: &Theme) {
    text_at(buf, map, 100.0, "FlashTap", Style::default().fg(theme.main_fg).bold());
    text_at(buf, map, 160.0, "tap the tiles before they fall", Style::default().fg(theme.inactive_fg));
    for button in buttons_for(Screen::Menu) {
        draw_button(buf, map, theme, button);
    }
    text_at(buf, map, 700.0, "Enter start  i help  q quit", Style::default().fg(theme.inactive_fg));
}

fn draw_instructions(buf: &mut Buffer, map: &FieldMap, theme: &Theme) {
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(vec![
            Span::from("Tap "),
            Span::styled("GREEN", Style::default().fg(theme.good).bold()),
            Span::from(" tiles to score points."),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::from("Tap "),
            Span::styled("GOLD", Style::default().fg(theme.bonus).bold()),
            Span::from(" tiles for bonus points."),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::from("Avoid "),
            Span::styled("RED", Style::default().fg(theme.bad).bold()),
            Span::from(" tiles to prevent mistakes."),
        ]),
        Line::from(""),
        Line::from("Don't let GREEN tiles fall more than 2 times!"),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled("Click a tile, or use D F J K", Style::default().fg(theme.title))),
        Line::from(Span::styled("(or 1 2 3 4) for the lanes.", Style::default().fg(theme.title))),
    ];
    let top = map.row_of(150.0);
    let area = Rect {
        x: map.board.x + 1,
        y: top,
        width: map.board.width.saturating_sub(2),
        height: (map.board.y + map.board.height).saturating_sub(top),
    };
    Paragraph::new(lines)
        .style(fg)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
    draw_button(buf, map, theme, &BACK_BUTTON);
}

fn draw_lanes(buf: &mut Buffer, map: &FieldMap, theme: &Theme) {
    let style = Style::default().fg(theme.div_line).bg(theme.bg);
    for lane in 1..LANES {
        let col = u32::from(map.board.width) * lane as u32 / LANES as u32;
        let x = map.board.x + col as u16;
        for y in map.board.y..map.board.y + map.board.height {
            buf[(x, y)].set_symbol("┊").set_style(style);
        }
    }
}

fn draw_flashes(frame: &mut Frame, map: &FieldMap, flashes: &mut [TapFlash], now: Instant) {
    for flash in flashes.iter_mut() {
        let t = flash.tile;
        let Some(area) = map.bounding_rect(t.x, t.y, t.width, t.height) else {
            continue;
        };
        fill_logical(frame.buffer_mut(), map, t.x, t.y, t.width, t.height, Color::White);
        let delta = flash
            .last_processed
            .map(|p| now.saturating_duration_since(p))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
        flash.last_processed = Some(now);
        frame.render_effect(&mut flash.effect, area, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_sidebar(buf: &mut Buffer, map: &FieldMap, state: &GameState, theme: &Theme) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats
            Constraint::Length(1),
            Constraint::Length(4), // Lives
            Constraint::Length(1),
            Constraint::Length(5), // Legend
            Constraint::Length(1),
            Constraint::Length(5), // Keys
        ])
        .split(map.sidebar);

    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], buf);
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    Paragraph::new(vec![
        stat("Score: ", state.score.to_string()),
        stat("Speed: ", format!("{:.0}", state.fall_speed)),
        stat("Tiles: ", format!("{}/{}", state.tiles.len(), state.rules.max_tiles)),
        stat("Miss:  ", format!("{}/{}", state.mistakes, state.rules.max_mistakes)),
    ])
    .render(stats_inner, buf);

    let lives_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let lives_inner = lives_block.inner(chunks[2]);
    lives_block.render(chunks[2], buf);
    let lives_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(lives_inner);
    Paragraph::new(Line::from(Span::styled(format!("Lives {}", state.lives()), title_style)))
        .render(lives_layout[0], buf);
    let ratio = if state.rules.max_mistakes > 0 {
        f64::from(state.lives()) / f64::from(state.rules.max_mistakes)
    } else {
        0.0
    };
    let bar_color = if ratio > 0.6 {
        theme.good
    } else if ratio > 0.3 {
        theme.bonus
    } else {
        theme.bad
    };
    Gauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(lives_layout[1], buf);

    let legend_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let legend_inner = legend_block.inner(chunks[4]);
    legend_block.render(chunks[4], buf);
    let legend = TileKind::ALL
        .iter()
        .map(|kind| {
            let effect = match kind {
                TileKind::Bad => "miss".to_string(),
                k => format!("+{}", k.reward()),
            };
            Line::from(vec![
                Span::styled("  ", Style::default().bg(theme.tile_color(*kind))),
                Span::styled(format!(" {:<6}{}", kind.label(), effect), fg_style),
            ])
        })
        .collect::<Vec<_>>();
    Paragraph::new(legend).render(legend_inner, buf);

    let keys_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let keys_inner = keys_block.inner(chunks[6]);
    keys_block.render(chunks[6], buf);
    Paragraph::new(vec![
        Line::from(Span::styled("D F J K  lanes", fg_style)),
        Line::from(Span::styled("Esc      menu", fg_style)),
        Line::from(Span::styled("Q        quit", fg_style)),
    ])
    .render(keys_inner, buf);
}

fn draw_game_over(buf: &mut Buffer, map: &FieldMap, state: &GameState, theme: &Theme) {
    text_at(buf, map, 100.0, "FlashTap", Style::default().fg(theme.main_fg).bold());
    text_at(
        buf,
        map,
        300.0,
        &format!("Your Score: {}", state.score),
        Style::default().fg(theme.main_fg),
    );
    for button in buttons_for(Screen::GameOver) {
        draw_button(buf, map, theme, button);
    }
    text_at(buf, map, 700.0, "Enter replay  q quit", Style::default().fg(theme.inactive_fg));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Rules;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn map() -> FieldMap {
        FieldMap::for_area(Rect::new(0, 0, 100, 50))
    }

    #[test]
    fn test_board_is_square_in_cells() {
        let m = map();
        assert_eq!(m.board.width, 48);
        assert_eq!(m.board.height, 48);
        assert_eq!(m.outer().width, 50);
    }

    #[test]
    fn test_small_terminal_board_fits() {
        let m = FieldMap::for_area(Rect::new(0, 0, 40, 20));
        assert!(m.board.width <= 40 - 2 - SIDEBAR_WIDTH);
        assert_eq!(m.board.width, m.board.height);
    }

    #[test]
    fn test_click_outside_board() {
        let m = map();
        assert!(m.to_logical(0, 0).is_none());
        assert!(m.to_logical(m.board.x + m.board.width, m.board.y).is_none());
    }

    #[test]
    fn test_every_drawn_tile_cell_hits_the_tile() {
        let m = map();
        for lane in 0..LANES {
            let tile = Tile {
                y: 300.0,
                ..Tile::in_lane(lane, TileKind::Good)
            };
            let cells = m.covered_cells(tile.x, tile.y, tile.width, tile.height);
            assert!(!cells.is_empty());
            for (cx, cy) in cells {
                let (x, y) = m.to_logical(cx, cy).unwrap();
                assert!(tile.contains(x, y), "lane {} cell ({}, {})", lane, cx, cy);
            }
        }
    }

    #[test]
    fn test_button_cells_hit_button() {
        let m = map();
        for button in [START_BUTTON, INSTRUCTIONS_BUTTON, BACK_BUTTON] {
            let cells = m.covered_cells(button.x, button.y, button.width, button.height);
            assert!(!cells.is_empty(), "{}", button.label);
            for (cx, cy) in cells {
                let (x, y) = m.to_logical(cx, cy).unwrap();
                assert!(button.contains(x, y));
            }
        }
    }

    #[test]
    fn test_offscreen_tile_covers_nothing() {
        let m = map();
        assert!(m.covered_cells(25.0, -80.0, 50.0, 80.0).is_empty());
        assert!(m.bounding_rect(25.0, 900.0, 50.0, 80.0).is_none());
    }

    fn rendered(screen: Screen, state: &GameState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 50)).unwrap();
        terminal
            .draw(|f| draw(f, screen, state, &Theme::default(), &mut [], Instant::now()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_menu_renders_buttons() {
        let state = GameState::new(Rules::default(), 1);
        let text = rendered(Screen::Menu, &state);
        assert!(text.contains("FlashTap"));
        assert!(text.contains("Start"));
        assert!(text.contains("Instructions"));
    }

    #[test]
    fn test_game_over_shows_score() {
        let mut state = GameState::new(Rules::default(), 1);
        state.score = 130;
        let text = rendered(Screen::GameOver, &state);
        assert!(text.contains("Your Score: 130"));
        assert!(text.contains("Replay"));
    }
}
