//! App: terminal init, main loop, screen transitions, key and mouse handling.

use crate::GameConfig;
use crate::game::GameState;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, FieldMap, TapFlash};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

/// Longest simulation step; a stalled terminal should not teleport tiles.
const MAX_STEP_SECS: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Instructions,
    Playing,
    /// Post-game summary with Replay / Quit.
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    flashes: Vec<TapFlash>,
    /// Layout from the last frame; mouse clicks are mapped through it.
    field: FieldMap,
    last_tick: Instant,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(config.rules, config.seed);
        let screen = if config.show_instructions {
            Screen::Instructions
        } else {
            Screen::Menu
        };
        Self {
            config,
            theme,
            state,
            screen,
            flashes: Vec::new(),
            field: FieldMap::for_area(Rect::new(0, 0, 80, 24)),
            last_tick: Instant::now(),
        }
    }

    fn set_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            log::debug!("screen {:?} -> {:?}", self.screen, screen);
            self.screen = screen;
        }
    }

    /// Start or Replay: fresh score, mistakes, tiles, speed.
    fn start_game(&mut self) {
        self.state.reset();
        self.flashes.clear();
        self.last_tick = Instant::now();
        self.set_screen(Screen::Playing);
        log::info!("game started (seed {})", self.config.seed);
    }

    fn finish_game(&mut self) {
        log::info!("game over: score {}", self.state.score);
        self.state.tiles.clear();
        self.flashes.clear();
        self.set_screen(Screen::GameOver);
    }

    /// Apply a key or button action to the current screen.
    pub fn apply(&mut self, action: Action) -> Flow {
        match (self.screen, action) {
            (_, Action::Quit) => return Flow::Quit,
            (Screen::Menu | Screen::GameOver, Action::Confirm) => self.start_game(),
            (Screen::Menu, Action::Instructions) => self.set_screen(Screen::Instructions),
            (Screen::Instructions, Action::Back | Action::Confirm) => self.set_screen(Screen::Menu),
            (Screen::GameOver, Action::Back) => self.set_screen(Screen::Menu),
            (Screen::Playing, Action::Back) => {
                log::info!("run abandoned at score {}", self.state.score);
                self.state.reset();
                self.flashes.clear();
                self.set_screen(Screen::Menu);
            }
            (Screen::Playing, Action::Lane(lane)) => {
                let outcome = self.state.tap_lane(lane);
                self.after_tap(outcome);
            }
            _ => {}
        }
        Flow::Continue
    }

    /// Pointer-down at a terminal cell.
    pub fn click(&mut self, column: u16, row: u16) -> Flow {
        let Some((x, y)) = self.field.to_logical(column, row) else {
            return Flow::Continue;
        };
        if self.screen == Screen::Playing {
            let outcome = self.state.tap(x, y);
            self.after_tap(outcome);
            return Flow::Continue;
        }
        match ui::buttons_for(self.screen).iter().find(|b| b.contains(x, y)) {
            Some(button) => self.apply(button.action),
            None => Flow::Continue,
        }
    }

    fn after_tap(&mut self, outcome: Option<crate::game::TapOutcome>) {
        let Some(outcome) = outcome else {
            return;
        };
        log::debug!(
            "tapped {:?}: +{}{}, score {}, mistakes {}",
            outcome.tile.kind,
            outcome.points,
            if outcome.mistake { " (mistake)" } else { "" },
            self.state.score,
            self.state.mistakes
        );
        if !self.config.no_animation {
            self.flashes.push(TapFlash::new(outcome.tile, &self.theme));
        }
        if self.state.is_over() {
            self.finish_game();
        }
    }

    /// Advance the simulation; only Playing moves anything.
    pub fn tick(&mut self, dt: f32) {
        if self.screen != Screen::Playing {
            return;
        }
        self.state.tick(dt.min(MAX_STEP_SECS));
        if self.state.is_over() {
            self.finish_game();
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore even if the loop failed.
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::try_from_secs_f64(1.0 / self.config.fps)
            .with_context(|| format!("invalid frame rate {}", self.config.fps))?;
        self.last_tick = Instant::now();
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                self.field = FieldMap::for_area(f.area());
                ui::draw(f, self.screen, &self.state, &self.theme, &mut self.flashes, now);
            })?;
            self.flashes.retain(|flash| !flash.done());

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let flow = match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            self.apply(key_to_action(key))
                        }
                        Event::Mouse(mouse)
                            if mouse.kind == MouseEventKind::Down(MouseButton::Left) =>
                        {
                            self.click(mouse.column, mouse.row)
                        }
                        _ => Flow::Continue,
                    };
                    if flow == Flow::Quit {
                        return Ok(());
                    }
                }
            }

            let dt = self.last_tick.elapsed().as_secs_f32();
            self.last_tick = Instant::now();
            self.tick(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Rules, Tile, TileKind};
    use crate::ui::{INSTRUCTIONS_BUTTON, START_BUTTON};

    fn config() -> GameConfig {
        GameConfig {
            rules: Rules::default(),
            seed: 3,
            fps: 60.0,
            show_instructions: false,
            no_animation: true,
        }
    }

    fn app() -> App {
        let mut app = App::new(config(), Theme::default());
        app.field = FieldMap::for_area(Rect::new(0, 0, 100, 50));
        app
    }

    /// Terminal cell showing the logical point (x, y).
    fn cell_at(app: &App, x: f32, y: f32) -> (u16, u16) {
        let cells = app.field.covered_cells(x - 5.0, y - 10.0, 10.0, 20.0);
        cells[cells.len() / 2]
    }

    #[test]
    fn test_starts_on_menu() {
        assert_eq!(app().screen, Screen::Menu);
        let cfg = GameConfig {
            show_instructions: true,
            ..config()
        };
        assert_eq!(App::new(cfg, Theme::default()).screen, Screen::Instructions);
    }

    #[test]
    fn test_instructions_round_trip() {
        let mut app = app();
        app.apply(Action::Instructions);
        assert_eq!(app.screen, Screen::Instructions);
        app.apply(Action::Lane(0));
        assert_eq!(app.screen, Screen::Instructions);
        app.apply(Action::Back);
        assert_eq!(app.screen, Screen::Menu);
    }

    #[test]
    fn test_menu_does_not_simulate() {
        let mut app = app();
        app.tick(5.0);
        assert!(app.state.tiles.is_empty());
        assert_eq!(app.state.spawn_timer, 0.0);
    }

    #[test]
    fn test_start_resets_and_plays() {
        let mut app = app();
        app.state.score = 40;
        app.state.tiles.push(Tile::in_lane(0, TileKind::Good));
        app.apply(Action::Confirm);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.state.score, 0);
        assert!(app.state.tiles.is_empty());
        assert_eq!(app.state.fall_speed, 200.0);
        for _ in 0..4 {
            app.tick(0.25);
        }
        assert_eq!(app.state.tiles.len(), 1);
    }

    #[test]
    fn test_click_start_button() {
        let mut app = app();
        let (c, r) = cell_at(&app, START_BUTTON.x + 75.0, START_BUTTON.y + 25.0);
        app.click(c, r);
        assert_eq!(app.screen, Screen::Playing);
    }

    #[test]
    fn test_click_instructions_then_back() {
        let mut app = app();
        let (c, r) = cell_at(&app, INSTRUCTIONS_BUTTON.x + 75.0, INSTRUCTIONS_BUTTON.y + 25.0);
        app.click(c, r);
        assert_eq!(app.screen, Screen::Instructions);
        // Start is not on this screen; clicking where it was does nothing.
        let (c, r) = cell_at(&app, START_BUTTON.x + 75.0, START_BUTTON.y + 25.0);
        app.click(c, r);
        assert_eq!(app.screen, Screen::Instructions);
        let (c, r) = cell_at(&app, 60.0, 30.0);
        app.click(c, r);
        assert_eq!(app.screen, Screen::Menu);
    }

    #[test]
    fn test_click_outside_board_is_ignored() {
        let mut app = app();
        assert_eq!(app.click(0, 0), Flow::Continue);
        assert_eq!(app.screen, Screen::Menu);
    }

    #[test]
    fn test_click_taps_good_tile() {
        let mut app = app();
        app.apply(Action::Confirm);
        app.state.tiles.push(Tile {
            y: 300.0,
            ..Tile::in_lane(0, TileKind::Good)
        });
        let (c, r) = cell_at(&app, 50.0, 340.0);
        app.click(c, r);
        assert_eq!(app.state.score, 10);
        assert!(app.state.tiles.is_empty());
        assert_eq!(app.screen, Screen::Playing);
    }

    #[test]
    fn test_third_bad_tap_ends_game() {
        let mut app = app();
        app.apply(Action::Confirm);
        app.state.score = 60;
        app.state.mistakes = 2;
        app.state.tiles.push(Tile {
            y: 300.0,
            ..Tile::in_lane(2, TileKind::Bad)
        });
        app.apply(Action::Lane(2));
        assert_eq!(app.screen, Screen::GameOver);
        assert_eq!(app.state.score, 60);
    }

    #[test]
    fn test_three_misses_end_game_and_freeze() {
        let mut app = app();
        app.apply(Action::Confirm);
        for lane in 0..3 {
            app.state.tiles.push(Tile {
                y: 790.0,
                ..Tile::in_lane(lane, TileKind::Good)
            });
        }
        app.state.score = 30;
        app.tick(0.1);
        assert_eq!(app.state.mistakes, 3);
        assert_eq!(app.screen, Screen::GameOver);
        assert_eq!(app.state.score, 30);
        assert!(app.state.tiles.is_empty());

        app.tick(5.0);
        assert!(app.state.tiles.is_empty());
    }

    #[test]
    fn test_replay_resets() {
        let mut app = app();
        app.apply(Action::Confirm);
        app.state.score = 100;
        app.state.mistakes = 3;
        app.tick(0.0);
        assert_eq!(app.screen, Screen::GameOver);
        app.apply(Action::Confirm);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.state.score, 0);
        assert_eq!(app.state.mistakes, 0);
        assert!(app.state.tiles.is_empty());
        assert_eq!(app.state.fall_speed, 200.0);
    }

    #[test]
    fn test_quit_from_game_over() {
        let mut app = app();
        app.screen = Screen::GameOver;
        assert_eq!(app.apply(Action::Quit), Flow::Quit);
    }

    #[test]
    fn test_back_abandons_run() {
        let mut app = app();
        app.apply(Action::Confirm);
        app.state.score = 20;
        app.apply(Action::Back);
        assert_eq!(app.screen, Screen::Menu);
        assert_eq!(app.state.score, 0);
    }

    #[test]
    fn test_tap_flash_recorded() {
        let mut app = App::new(
            GameConfig {
                no_animation: false,
                ..config()
            },
            Theme::default(),
        );
        app.apply(Action::Confirm);
        app.state.tiles.push(Tile {
            y: 100.0,
            ..Tile::in_lane(1, TileKind::Bonus)
        });
        app.apply(Action::Lane(1));
        assert_eq!(app.flashes.len(), 1);
        assert_eq!(app.state.score, 50);
    }
}
