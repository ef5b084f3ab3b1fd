//! Space Rocks: estimated replay.
//!
//! Free-flight physics are not reproduced. Instead each shot resolves against
//! a seeded hit chance, with a bonus while the ship is maneuvering, and rocks
//! split by size class. The result is a plausible score for the submitted
//! inputs that the verifier uses only as a ratio bound.

use crate::digest::StateHasher;
use crate::engine::{GameEventKind, RockSize, ScoreLedger, SimError, Simulation, check_delta};
use crate::input::{GameInput, InputKind};
use crate::rng::Rng;

pub const FIRE_COOLDOWN_MS: f64 = 250.0;
const BASE_HIT_CHANCE: f64 = 0.30;
const MANEUVER_HIT_BONUS: f64 = 0.10;
const STARTING_ROCKS: u32 = 4;
const MAX_ROCKS_PER_WAVE: u32 = 10;

impl RockSize {
    pub fn points(self) -> u64 {
        match self {
            Self::Large => 20,
            Self::Medium => 50,
            Self::Small => 100,
        }
    }

    /// Fragments left behind when destroyed.
    fn split(self) -> Option<RockSize> {
        match self {
            Self::Large => Some(Self::Medium),
            Self::Medium => Some(Self::Small),
            Self::Small => None,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Large => 0,
            Self::Medium => 1,
            Self::Small => 2,
        }
    }
}

/// Space Rocks estimator.
#[derive(Debug, Clone, Default)]
pub struct SpaceRocks {
    rng: Option<Rng>,
    rocks: Vec<RockSize>,
    wave: u32,
    fire_held: bool,
    maneuvering: bool,
    cooldown_ms: f64,
    shots_fired: u64,
}

impl SpaceRocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rocks_remaining(&self) -> usize {
        self.rocks.len()
    }

    pub fn shots_fired(&self) -> u64 {
        self.shots_fired
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    fn spawn_wave(&mut self) {
        let count = (STARTING_ROCKS + self.wave.saturating_sub(1)).min(MAX_ROCKS_PER_WAVE);
        self.rocks = vec![RockSize::Large; count as usize];
    }

    fn step(&mut self, delta_ms: f64, rng: &mut Rng, ledger: &mut ScoreLedger) {
        self.cooldown_ms -= delta_ms;
        if !self.fire_held || self.cooldown_ms > 0.0 {
            return;
        }
        self.cooldown_ms = FIRE_COOLDOWN_MS;
        self.shots_fired += 1;

        let chance = if self.maneuvering {
            BASE_HIT_CHANCE + MANEUVER_HIT_BONUS
        } else {
            BASE_HIT_CHANCE
        };
        if !rng.next_bool(chance) || self.rocks.is_empty() {
            return;
        }

        let index = rng.next_int(0, self.rocks.len() as i32 - 1) as usize;
        let rock = self.rocks.swap_remove(index);
        if let Some(fragment) = rock.split() {
            self.rocks.push(fragment);
            self.rocks.push(fragment);
        }
        ledger.add_score(rock.points(), GameEventKind::RockDestroyed { size: rock });

        if self.rocks.is_empty() {
            ledger.record(GameEventKind::WaveCleared { wave: self.wave });
            self.wave += 1;
            self.spawn_wave();
        }
    }
}

impl Simulation for SpaceRocks {
    fn init(&mut self, rng: Rng) {
        *self = Self::new();
        self.wave = 1;
        self.spawn_wave();
        self.rng = Some(rng);
    }

    fn process_input(&mut self, input: &GameInput) {
        match input.kind {
            InputKind::Direction => {
                let data = &input.data;
                self.maneuvering = data.up() || data.down() || data.left() || data.right();
            }
            InputKind::Action => self.fire_held = input.data.action(),
        }
    }

    fn update(&mut self, delta_ms: f64, ledger: &mut ScoreLedger) -> Result<(), SimError> {
        check_delta(delta_ms)?;
        let mut rng = self.rng.take().ok_or(SimError::NotInitialized)?;
        self.step(delta_ms, &mut rng, ledger);
        self.rng = Some(rng);
        Ok(())
    }

    /// The estimator has no terminal state; replay ends when inputs run out.
    fn check_game_over(&self) -> bool {
        false
    }

    fn state_digest(&self) -> u64 {
        let mut hasher = StateHasher::new();
        hasher.write_u32(self.rng.as_ref().map_or(0, Rng::state));
        hasher.write_u32(self.wave);
        hasher.write_u64(self.shots_fired);
        hasher.write_f64(self.cooldown_ms);
        hasher.write_bool(self.fire_held);
        hasher.write_bool(self.maneuvering);
        for rock in &self.rocks {
            hasher.update(&[rock.code()]);
        }
        hasher.finish()
    }
}
