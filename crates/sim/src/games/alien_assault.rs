//! Alien Assault: exact headless replay.
//!
//! A marching formation of aliens descends toward the player's ship. The ship
//! moves horizontally and fires straight up; each bullet can destroy at most
//! one alien, and firing is rate-limited by a cooldown and a finite ammo pool
//! with deterministic restocking.
//!
//! Score bound: one bullet per `FIRE_COOLDOWN_MS`, at most `ROW_POINTS[0]`
//! points per bullet. Over the 10 minute replay cap this is
//! `(600_000 / 400 + 1) * 30 = 45_030`, below the configured
//! `max_theoretical_score` of 50_000.

use crate::digest::StateHasher;
use crate::engine::{GameEventKind, ScoreLedger, SimError, Simulation, check_delta};
use crate::input::{GameInput, InputKind};
use crate::rng::Rng;

// ============================================================================
// Tuning Constants
// ============================================================================

pub const FIELD_WIDTH: f64 = 480.0;
pub const FIELD_HEIGHT: f64 = 640.0;
/// Horizontal keep-out band at both field edges.
const FIELD_MARGIN: f64 = 16.0;

pub const SHIP_Y: f64 = 600.0;
pub const SHIP_MIN_X: f64 = FIELD_MARGIN;
pub const SHIP_MAX_X: f64 = FIELD_WIDTH - FIELD_MARGIN;
/// Units per ms.
const SHIP_SPEED: f64 = 0.3;
const STARTING_LIVES: u32 = 3;
const RESPAWN_INVULNERABLE_MS: f64 = 1500.0;

/// Units per ms, upward.
const BULLET_SPEED: f64 = 0.6;
const BULLET_SPAWN_Y: f64 = SHIP_Y - 10.0;
const MAX_BULLETS_IN_FLIGHT: usize = 3;
pub const FIRE_COOLDOWN_MS: f64 = 400.0;

pub const STARTING_AMMO: u32 = 40;
const MAX_AMMO: u32 = 60;
const WAVE_RESTOCK: u32 = 25;
const RESTOCK_INTERVAL_MS: f64 = 5000.0;
const RESTOCK_AMOUNT: u32 = 5;

const GRID_COLS: u8 = 8;
const GRID_ROWS: u8 = 3;
const SPACING_X: f64 = 48.0;
const SPACING_Y: f64 = 40.0;
const ORIGIN_X: f64 = 72.0;
const ORIGIN_Y: f64 = 80.0;
/// Extra starting depth per wave, capped after five waves.
const WAVE_STEP_Y: f64 = 8.0;
const SLOT_FILL_CHANCE: f64 = 0.85;
/// Points by grid row, top row first.
pub const ROW_POINTS: [u64; GRID_ROWS as usize] = [30, 20, 10];

const FORMATION_BASE_SPEED: f64 = 0.04;
const FORMATION_SPEED_PER_WAVE: f64 = 0.01;
const FORMATION_MAX_SPEED: f64 = 0.12;
const FORMATION_DROP: f64 = 16.0;
const INVASION_LINE: f64 = 560.0;

const HIT_RADIUS: f64 = 18.0;

const BOMB_INTERVAL_MS: f64 = 900.0;
/// Units per ms, downward.
const BOMB_SPEED: f64 = 0.25;
const BOMB_HIT_RADIUS: f64 = 14.0;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct Alien {
    col: u8,
    row: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Projectile {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Formation {
    x: f64,
    y: f64,
    /// +1.0 marching right, -1.0 marching left.
    dir: f64,
    speed: f64,
}

impl Formation {
    fn position(&self, alien: Alien) -> (f64, f64) {
        (
            self.x + f64::from(alien.col) * SPACING_X,
            self.y + f64::from(alien.row) * SPACING_Y,
        )
    }
}

fn dist_sq(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

/// Alien Assault simulation.
#[derive(Debug, Clone)]
pub struct AlienAssault {
    rng: Option<Rng>,
    ship_x: f64,
    move_left: bool,
    move_right: bool,
    fire_held: bool,
    fire_cooldown_ms: f64,
    invulnerable_ms: f64,
    ammo: u32,
    restock_timer_ms: f64,
    lives: u32,
    wave: u32,
    formation: Formation,
    aliens: Vec<Alien>,
    bullets: Vec<Projectile>,
    bombs: Vec<Projectile>,
    bomb_timer_ms: f64,
    game_over: bool,
}

impl Default for AlienAssault {
    fn default() -> Self {
        Self::new()
    }
}

impl AlienAssault {
    /// Uninitialized game; call [`Simulation::init`] before updating.
    pub fn new() -> Self {
        Self {
            rng: None,
            ship_x: FIELD_WIDTH / 2.0,
            move_left: false,
            move_right: false,
            fire_held: false,
            fire_cooldown_ms: 0.0,
            invulnerable_ms: 0.0,
            ammo: STARTING_AMMO,
            restock_timer_ms: 0.0,
            lives: STARTING_LIVES,
            wave: 1,
            formation: Formation {
                x: ORIGIN_X,
                y: ORIGIN_Y,
                dir: 1.0,
                speed: FORMATION_BASE_SPEED,
            },
            aliens: Vec::with_capacity(usize::from(GRID_COLS * GRID_ROWS)),
            bullets: Vec::with_capacity(MAX_BULLETS_IN_FLIGHT),
            bombs: Vec::new(),
            bomb_timer_ms: BOMB_INTERVAL_MS,
            game_over: false,
        }
    }

    pub fn ship_x(&self) -> f64 {
        self.ship_x
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn aliens_remaining(&self) -> usize {
        self.aliens.len()
    }

    /// Fill the grid for the current wave from the seeded RNG.
    fn spawn_wave(&mut self, rng: &mut Rng) {
        self.aliens.clear();
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                if rng.next_bool(SLOT_FILL_CHANCE) {
                    self.aliens.push(Alien { col, row });
                }
            }
        }
        if self.aliens.is_empty() {
            let slot = rng.next_int(0, i32::from(GRID_COLS * GRID_ROWS) - 1) as u8;
            self.aliens.push(Alien {
                col: slot % GRID_COLS,
                row: slot / GRID_COLS,
            });
        }

        let depth = f64::from(self.wave.saturating_sub(1).min(5));
        let speed = FORMATION_BASE_SPEED
            + FORMATION_SPEED_PER_WAVE * f64::from(self.wave.saturating_sub(1));
        self.formation = Formation {
            x: ORIGIN_X,
            y: ORIGIN_Y + depth * WAVE_STEP_Y,
            dir: if rng.chance() { 1.0 } else { -1.0 },
            speed: speed.min(FORMATION_MAX_SPEED),
        };
        self.bomb_timer_ms = BOMB_INTERVAL_MS * rng.next_float(0.75, 1.25);
    }

    fn step(&mut self, delta_ms: f64, rng: &mut Rng, ledger: &mut ScoreLedger) {
        self.tick_timers(delta_ms);
        self.move_ship(delta_ms);
        self.try_fire();
        self.move_bullets(delta_ms);
        self.advance_formation(delta_ms);
        self.drop_bombs(delta_ms, rng);
        self.resolve_bullet_hits(ledger);
        self.resolve_bomb_hits(ledger);

        if self.game_over {
            return;
        }

        if self.invaded() {
            self.game_over = true;
            ledger.record(GameEventKind::GameOver);
            return;
        }

        if self.aliens.is_empty() {
            ledger.record(GameEventKind::WaveCleared { wave: self.wave });
            self.wave += 1;
            self.ammo = (self.ammo + WAVE_RESTOCK).min(MAX_AMMO);
            self.bullets.clear();
            self.bombs.clear();
            self.spawn_wave(rng);
        }
    }

    fn tick_timers(&mut self, delta_ms: f64) {
        self.fire_cooldown_ms -= delta_ms;
        if self.invulnerable_ms > 0.0 {
            self.invulnerable_ms -= delta_ms;
        }

        self.restock_timer_ms += delta_ms;
        while self.restock_timer_ms >= RESTOCK_INTERVAL_MS {
            self.restock_timer_ms -= RESTOCK_INTERVAL_MS;
            self.ammo = (self.ammo + RESTOCK_AMOUNT).min(MAX_AMMO);
        }
    }

    fn move_ship(&mut self, delta_ms: f64) {
        let direction = f64::from(u8::from(self.move_right)) - f64::from(u8::from(self.move_left));
        self.ship_x = (self.ship_x + direction * SHIP_SPEED * delta_ms).clamp(SHIP_MIN_X, SHIP_MAX_X);
    }

    fn try_fire(&mut self) {
        if !self.fire_held
            || self.fire_cooldown_ms > 0.0
            || self.ammo == 0
            || self.bullets.len() >= MAX_BULLETS_IN_FLIGHT
        {
            return;
        }
        self.bullets.push(Projectile {
            x: self.ship_x,
            y: BULLET_SPAWN_Y,
        });
        self.ammo -= 1;
        self.fire_cooldown_ms = FIRE_COOLDOWN_MS;
    }

    fn move_bullets(&mut self, delta_ms: f64) {
        for bullet in &mut self.bullets {
            bullet.y -= BULLET_SPEED * delta_ms;
        }
        self.bullets.retain(|b| b.y > 0.0);
    }

    fn advance_formation(&mut self, delta_ms: f64) {
        let Some(min_col) = self.aliens.iter().map(|a| a.col).min() else {
            return;
        };
        let max_col = self.aliens.iter().map(|a| a.col).max().unwrap_or(min_col);

        let step = self.formation.dir * self.formation.speed * delta_ms;
        let left_edge = self.formation.x + f64::from(min_col) * SPACING_X + step;
        let right_edge = self.formation.x + f64::from(max_col) * SPACING_X + step;

        if left_edge < FIELD_MARGIN || right_edge > FIELD_WIDTH - FIELD_MARGIN {
            self.formation.dir = -self.formation.dir;
            self.formation.y += FORMATION_DROP;
        } else {
            self.formation.x += step;
        }
    }

    fn drop_bombs(&mut self, delta_ms: f64, rng: &mut Rng) {
        self.bomb_timer_ms -= delta_ms;
        if self.bomb_timer_ms <= 0.0 {
            let formation = self.formation;
            if let Some(&bomber) = rng.pick(&self.aliens) {
                let (x, y) = formation.position(bomber);
                self.bombs.push(Projectile { x, y });
            }
            self.bomb_timer_ms = BOMB_INTERVAL_MS * rng.next_float(0.75, 1.25);
        }

        for bomb in &mut self.bombs {
            bomb.y += BOMB_SPEED * delta_ms;
        }
        self.bombs.retain(|b| b.y < FIELD_HEIGHT);
    }

    fn resolve_bullet_hits(&mut self, ledger: &mut ScoreLedger) {
        let formation = self.formation;
        let hit_sq = HIT_RADIUS * HIT_RADIUS;
        let aliens = &mut self.aliens;

        // Each bullet is consumed by the first alien it touches.
        self.bullets.retain(|bullet| {
            let target = aliens
                .iter()
                .position(|&alien| dist_sq(formation.position(alien), (bullet.x, bullet.y)) < hit_sq);
            match target {
                Some(index) => {
                    let alien = aliens.remove(index);
                    ledger.add_score(
                        ROW_POINTS[usize::from(alien.row)],
                        GameEventKind::AlienDestroyed { row: alien.row },
                    );
                    false
                }
                None => true,
            }
        });
    }

    fn resolve_bomb_hits(&mut self, ledger: &mut ScoreLedger) {
        if self.invulnerable_ms > 0.0 {
            return;
        }
        let ship = (self.ship_x, SHIP_Y);
        let hit_sq = BOMB_HIT_RADIUS * BOMB_HIT_RADIUS;
        let Some(index) = self
            .bombs
            .iter()
            .position(|bomb| dist_sq((bomb.x, bomb.y), ship) < hit_sq)
        else {
            return;
        };

        self.bombs.remove(index);
        self.lives = self.lives.saturating_sub(1);
        ledger.record(GameEventKind::LifeLost {
            lives_left: self.lives,
        });

        if self.lives == 0 {
            self.game_over = true;
            ledger.record(GameEventKind::GameOver);
        } else {
            self.invulnerable_ms = RESPAWN_INVULNERABLE_MS;
        }
    }

    fn invaded(&self) -> bool {
        self.aliens
            .iter()
            .any(|&alien| self.formation.position(alien).1 >= INVASION_LINE)
    }

    fn check_invariants(&self) -> Result<(), SimError> {
        if !self.ship_x.is_finite() || !self.formation.x.is_finite() || !self.formation.y.is_finite() {
            return Err(SimError::StateCorrupted {
                reason: "non-finite position".to_string(),
            });
        }
        if self.ammo > MAX_AMMO {
            return Err(SimError::StateCorrupted {
                reason: format!("ammo {} above cap {MAX_AMMO}", self.ammo),
            });
        }
        Ok(())
    }
}

impl Simulation for AlienAssault {
    fn init(&mut self, mut rng: Rng) {
        *self = Self::new();
        self.spawn_wave(&mut rng);
        self.rng = Some(rng);
    }

    fn process_input(&mut self, input: &GameInput) {
        match input.kind {
            InputKind::Direction => {
                self.move_left = input.data.left();
                self.move_right = input.data.right();
            }
            InputKind::Action => {
                self.fire_held = input.data.action();
            }
        }
    }

    fn update(&mut self, delta_ms: f64, ledger: &mut ScoreLedger) -> Result<(), SimError> {
        check_delta(delta_ms)?;
        if self.game_over {
            return Ok(());
        }
        let mut rng = self.rng.take().ok_or(SimError::NotInitialized)?;
        self.step(delta_ms, &mut rng, ledger);
        self.rng = Some(rng);
        self.check_invariants()
    }

    fn check_game_over(&self) -> bool {
        self.game_over
    }

    fn state_digest(&self) -> u64 {
        let mut hasher = StateHasher::new();
        hasher.write_u32(self.rng.as_ref().map_or(0, Rng::state));
        hasher.write_f64(self.ship_x);
        hasher.write_bool(self.fire_held);
        hasher.write_f64(self.fire_cooldown_ms);
        hasher.write_u32(self.ammo);
        hasher.write_u32(self.lives);
        hasher.write_u32(self.wave);
        hasher.write_f64(self.formation.x);
        hasher.write_f64(self.formation.y);
        hasher.write_f64(self.formation.dir);
        for alien in &self.aliens {
            hasher.update(&[alien.col, alien.row]);
        }
        for bullet in &self.bullets {
            hasher.write_f64(bullet.x);
            hasher.write_f64(bullet.y);
        }
        for bomb in &self.bombs {
            hasher.write_f64(bomb.x);
            hasher.write_f64(bomb.y);
        }
        hasher.write_bool(self.game_over);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_MS: f64 = 1000.0 / 60.0;

    fn new_game(seed: i32) -> AlienAssault {
        let mut game = AlienAssault::new();
        game.init(Rng::new(seed));
        game
    }

    fn run_ticks(game: &mut AlienAssault, ledger: &mut ScoreLedger, ticks: u32) {
        for tick in 0..ticks {
            ledger.set_time(f64::from(tick) * TICK_MS);
            game.update(TICK_MS, ledger).unwrap();
        }
    }

    /// Single stationary alien directly above the ship, no bombs.
    fn isolated_target(seed: i32, row: u8) -> AlienAssault {
        let mut game = new_game(seed);
        game.aliens = vec![Alien { col: 0, row }];
        game.formation = Formation {
            x: game.ship_x,
            y: 300.0 - f64::from(row) * SPACING_Y,
            dir: 1.0,
            speed: 0.0,
        };
        game.bombs.clear();
        game.bomb_timer_ms = 1.0e9;
        game
    }

    #[test]
    fn test_init_is_deterministic() {
        let a = new_game(12345);
        let b = new_game(12345);
        assert_eq!(a.state_digest(), b.state_digest());
        assert_eq!(a.aliens, b.aliens);
        assert!(!a.aliens.is_empty());
    }

    #[test]
    fn test_update_before_init_fails() {
        let mut game = AlienAssault::new();
        let mut ledger = ScoreLedger::new();
        assert_eq!(
            game.update(TICK_MS, &mut ledger),
            Err(SimError::NotInitialized)
        );
    }

    #[test]
    fn test_ship_clamped_to_field() {
        let mut game = isolated_target(1, 0);
        let mut ledger = ScoreLedger::new();
        game.process_input(&GameInput::direction(0, false, false, true, false));
        run_ticks(&mut game, &mut ledger, 200);
        assert_eq!(game.ship_x(), SHIP_MIN_X);

        game.process_input(&GameInput::direction(0, false, false, false, true));
        run_ticks(&mut game, &mut ledger, 300);
        assert_eq!(game.ship_x(), SHIP_MAX_X);
    }

    #[test]
    fn test_fire_cooldown_limits_shots() {
        let mut game = isolated_target(3, 0);
        // Move the target out of the firing lane so bullets fly free.
        game.formation.x = SHIP_MIN_X;
        game.ship_x = SHIP_MAX_X;
        let mut ledger = ScoreLedger::new();

        game.process_input(&GameInput::action(0, true));
        run_ticks(&mut game, &mut ledger, 60);

        // One second of held fire: shots at tick 0, ~24 and ~48.
        assert_eq!(game.ammo(), STARTING_AMMO - 3);
        assert_eq!(ledger.score(), 0);
    }

    #[test]
    fn test_bullet_destroys_alien_and_clears_wave() {
        let mut game = isolated_target(5, 0);
        let mut ledger = ScoreLedger::new();

        // Fire is sampled on update, so hold for the first tick only.
        game.process_input(&GameInput::action(0, true));
        run_ticks(&mut game, &mut ledger, 1);
        game.process_input(&GameInput::action(16, false));
        run_ticks(&mut game, &mut ledger, 40);

        assert_eq!(ledger.score(), ROW_POINTS[0]);
        let kinds: Vec<_> = ledger.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds[0], GameEventKind::AlienDestroyed { row: 0 });
        assert_eq!(kinds[1], GameEventKind::WaveCleared { wave: 1 });
        assert_eq!(game.wave(), 2);
        assert!(game.aliens_remaining() > 0);
        // 39 + 25 wave restock, capped
        assert_eq!(game.ammo(), MAX_AMMO);
    }

    #[test]
    fn test_row_points() {
        let mut game = isolated_target(8, 2);
        let mut ledger = ScoreLedger::new();
        game.fire_held = true;
        run_ticks(&mut game, &mut ledger, 1);
        game.fire_held = false;
        run_ticks(&mut game, &mut ledger, 40);
        assert_eq!(ledger.score(), ROW_POINTS[2]);
    }

    #[test]
    fn test_bomb_costs_life() {
        let mut game = isolated_target(9, 0);
        let mut ledger = ScoreLedger::new();
        game.bombs.push(Projectile {
            x: game.ship_x,
            y: SHIP_Y,
        });
        run_ticks(&mut game, &mut ledger, 1);

        assert_eq!(game.lives(), STARTING_LIVES - 1);
        assert_eq!(
            ledger.events()[0].kind,
            GameEventKind::LifeLost {
                lives_left: STARTING_LIVES - 1
            }
        );
        assert!(!game.check_game_over());
    }

    #[test]
    fn test_last_life_ends_game() {
        let mut game = isolated_target(9, 0);
        game.lives = 1;
        let mut ledger = ScoreLedger::new();
        game.bombs.push(Projectile {
            x: game.ship_x,
            y: SHIP_Y,
        });
        run_ticks(&mut game, &mut ledger, 1);
        assert!(game.check_game_over());
        assert_eq!(ledger.events().last().map(|e| e.kind), Some(GameEventKind::GameOver));

        // Further updates are inert
        let digest = game.state_digest();
        run_ticks(&mut game, &mut ledger, 10);
        assert_eq!(game.state_digest(), digest);
    }

    #[test]
    fn test_idle_game_ends_within_replay_cap() {
        let mut game = new_game(12345);
        let mut ledger = ScoreLedger::new();
        let mut ticks = 0u32;
        while !game.check_game_over() && ticks < 36_000 {
            ledger.set_time(f64::from(ticks) * TICK_MS);
            game.update(TICK_MS, &mut ledger).unwrap();
            ticks += 1;
        }
        assert!(game.check_game_over());
        assert_eq!(ledger.score(), 0);
    }

    #[test]
    fn test_restock_is_capped() {
        let mut game = isolated_target(4, 0);
        game.ammo = MAX_AMMO - 1;
        let mut ledger = ScoreLedger::new();
        // Twelve seconds: two restock intervals
        run_ticks(&mut game, &mut ledger, 720);
        assert_eq!(game.ammo(), MAX_AMMO);
    }
}
