//! Game state: falling tiles, lane spawning, motion, taps, difficulty.

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Logical playfield size; rendering scales this onto the terminal.
pub const FIELD_WIDTH: f32 = 400.0;
pub const FIELD_HEIGHT: f32 = 800.0;

pub const LANES: usize = 4;
pub const LANE_WIDTH: f32 = FIELD_WIDTH / LANES as f32;

const TILE_HEIGHT: f32 = 80.0;
/// Tiles spawn just above the visible area.
const SPAWN_Y: f32 = -TILE_HEIGHT;

const BASE_SPEED: f32 = 200.0;
const SPEED_STEP: f32 = 20.0;
const POINTS_PER_SPEED_STEP: u32 = 50;

/// Tile category. Colour on screen comes from the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Good,
    Bad,
    Bonus,
}

impl TileKind {
    pub const ALL: [Self; 3] = [Self::Good, Self::Bad, Self::Bonus];

    /// Relative spawn weight (out of 100).
    pub fn weight(&self) -> u32 {
        match self {
            Self::Good => 70,
            Self::Bad => 20,
            Self::Bonus => 10,
        }
    }

    /// Score awarded when tapped.
    pub fn reward(&self) -> u32 {
        match self {
            Self::Good => 10,
            Self::Bad => 0,
            Self::Bonus => 50,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::Bad => "BAD",
            Self::Bonus => "BONUS",
        }
    }
}

/// A falling rectangle in logical coordinates. `y` is the top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: TileKind,
}

impl Tile {
    /// Tile centred in `lane`, just above the field.
    pub fn in_lane(lane: usize, kind: TileKind) -> Self {
        Self {
            x: lane as f32 * LANE_WIDTH + LANE_WIDTH / 4.0,
            y: SPAWN_Y,
            width: LANE_WIDTH / 2.0,
            height: TILE_HEIGHT,
            kind,
        }
    }

    /// Half-open bounds test: left/top edges inclusive, right/bottom exclusive.
    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn lane(&self) -> usize {
        ((self.x / LANE_WIDTH) as usize).min(LANES - 1)
    }

    fn fell_off(&self) -> bool {
        self.y > FIELD_HEIGHT
    }
}

/// Tunables for a run. Defaults are the classic FlashTap numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rules {
    /// Seconds between spawn attempts.
    pub spawn_interval: f32,
    pub max_tiles: usize,
    pub max_mistakes: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            spawn_interval: 1.0,
            max_tiles: 6,
            max_mistakes: 3,
        }
    }
}

/// Fall speed in logical units per second for a given score.
pub fn fall_speed(score: u32) -> f32 {
    BASE_SPEED + (score / POINTS_PER_SPEED_STEP) as f32 * SPEED_STEP
}

/// What a successful tap did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapOutcome {
    pub tile: Tile,
    pub points: u32,
    pub mistake: bool,
}

/// Per-run state: score, mistakes, active tiles (spawn order), speed, spawn timer.
#[derive(Debug, Clone)]
pub struct GameState {
    pub rules: Rules,
    pub score: u32,
    pub mistakes: u32,
    pub tiles: Vec<Tile>,
    pub fall_speed: f32,
    /// Seconds accumulated toward the next spawn.
    pub spawn_timer: f32,
    rng: Pcg32,
    /// Index into `TileKind::ALL`, weighted by `TileKind::weight`.
    kinds: WeightedIndex<u32>,
}

impl GameState {
    pub fn new(rules: Rules, seed: u64) -> Self {
        Self {
            rules,
            score: 0,
            mistakes: 0,
            tiles: Vec::with_capacity(rules.max_tiles),
            fall_speed: fall_speed(0),
            spawn_timer: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            kinds: WeightedIndex::new(TileKind::ALL.map(|k| k.weight()))
                .expect("tile weights are fixed and non-zero"),
        }
    }

    /// Fresh run with the same rules; the RNG keeps going so replays differ.
    pub fn reset(&mut self) {
        self.score = 0;
        self.mistakes = 0;
        self.tiles.clear();
        self.spawn_timer = 0.0;
        self.fall_speed = fall_speed(0);
        log::debug!("game reset: {:?}", self.rules);
    }

    pub fn is_over(&self) -> bool {
        self.mistakes >= self.rules.max_mistakes
    }

    pub fn lives(&self) -> u32 {
        self.rules.max_mistakes.saturating_sub(self.mistakes)
    }

    /// One simulation step of `dt` seconds. No-op once the run is over.
    pub fn tick(&mut self, dt: f32) {
        if self.is_over() {
            return;
        }
        self.advance_spawn_timer(dt);
        self.advance_tiles(dt);
        self.refresh_speed();
    }

    /// Accumulate `dt`; on reaching the interval attempt one spawn and reset.
    /// Returns true if a tile was actually added.
    pub fn advance_spawn_timer(&mut self, dt: f32) -> bool {
        self.spawn_timer += dt;
        if self.spawn_timer < self.rules.spawn_interval {
            return false;
        }
        self.spawn_timer = 0.0;
        self.spawn_tile()
    }

    /// Append a tile in a random lane with a weighted random kind.
    /// Dropped silently at the tile cap.
    pub fn spawn_tile(&mut self) -> bool {
        if self.tiles.len() >= self.rules.max_tiles {
            log::trace!("spawn dropped: {} tiles on field", self.tiles.len());
            return false;
        }
        let lane = self.rng.random_range(0..LANES);
        let kind = self.pick_kind();
        log::trace!("spawn {:?} in lane {}", kind, lane);
        self.tiles.push(Tile::in_lane(lane, kind));
        true
    }

    fn pick_kind(&mut self) -> TileKind {
        TileKind::ALL[self.kinds.sample(&mut self.rng)]
    }

    /// Move every tile down by `fall_speed * dt` and drop the ones past the bottom.
    /// Returns how many Good tiles were missed.
    pub fn advance_tiles(&mut self, dt: f32) -> u32 {
        let step = self.fall_speed * dt;
        let mut missed = 0u32;
        self.tiles.retain_mut(|tile| {
            tile.y += step;
            if !tile.fell_off() {
                return true;
            }
            if tile.kind == TileKind::Good {
                missed += 1;
            }
            false
        });
        for _ in 0..missed {
            self.add_mistake();
        }
        if missed > 0 {
            log::debug!("missed {} good tile(s), mistakes {}", missed, self.mistakes);
        }
        missed
    }

    /// Pointer-down at logical (x, y). Consumes at most one tile: the first in spawn order
    /// whose bounds contain the point.
    pub fn tap(&mut self, x: f32, y: f32) -> Option<TapOutcome> {
        if self.is_over() {
            return None;
        }
        let index = self.tiles.iter().position(|t| t.contains(x, y))?;
        let tile = self.tiles.remove(index);
        let points = tile.kind.reward();
        let mistake = tile.kind == TileKind::Bad;
        self.score += points;
        if mistake {
            self.add_mistake();
        }
        self.refresh_speed();
        Some(TapOutcome {
            tile,
            points,
            mistake,
        })
    }

    /// Keyboard tap: hit the lowest visible tile in `lane` at its centre.
    pub fn tap_lane(&mut self, lane: usize) -> Option<TapOutcome> {
        let target = self
            .tiles
            .iter()
            .filter(|t| t.lane() == lane && t.y + t.height > 0.0)
            .max_by(|a, b| a.y.total_cmp(&b.y))?;
        let (cx, cy) = target.center();
        // Clamp into the visible part so a half-entered tile is still hittable.
        let cy = cy.max(0.0).min(target.y + target.height - f32::EPSILON);
        self.tap(cx, cy)
    }

    fn add_mistake(&mut self) {
        self.mistakes = (self.mistakes + 1).min(self.rules.max_mistakes);
    }

    fn refresh_speed(&mut self) {
        self.fall_speed = fall_speed(self.score);
    }
}
