//! Session lifecycle, countdown, mole spawning and whack resolution.
//!
//! All timed work goes through one [`TimerQueue`]; tasks carry hole ids, not
//! captured state, and every handler re-reads the current status before
//! mutating. That plus handle-based cancellation is what keeps rapid
//! start/stop/restart cycles race-free on the cooperative clock.

use itertools::Itertools;
use rand::Rng;
use std::time::Duration;

use crate::audio::AudioBackend;
use crate::config::GameConfig;
use crate::hole::{Hole, HoleStatus, MoleKind};
use crate::scheduler::{TimerId, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Playing,
    Finished,
}

/// Deferred work dispatched from the timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    CountdownTick,
    Spawn,
    Retract(usize),
    ClearHit(usize),
}

pub struct Game {
    pub config: GameConfig,
    state: GameState,
    score: u32,
    time_remaining: u32,
    holes: Vec<Hole>,
    queue: TimerQueue<Task>,
    countdown_timer: Option<TimerId>,
    /// The single pending link of the spawn chain; replaced, never stacked.
    spawn_timer: Option<TimerId>,
    audio: Box<dyn AudioBackend>,
}

impl Game {
    pub fn new(config: GameConfig, audio: Box<dyn AudioBackend>) -> Self {
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(config.min_holes..=config.max_holes);
        Self::with_hole_count(config, audio, count)
    }

    /// Pins the hole count instead of rolling it; `--holes` and tests use this.
    pub fn with_hole_count(config: GameConfig, audio: Box<dyn AudioBackend>, count: usize) -> Self {
        let mut rng = rand::thread_rng();
        let holes = (0..count).map(|id| Hole::new(id, &mut rng)).collect();
        Self {
            state: GameState::Idle,
            score: 0,
            time_remaining: config.initial_time_secs,
            holes,
            queue: TimerQueue::new(),
            countdown_timer: None,
            spawn_timer: None,
            audio,
            config,
        }
    }

    // --- render feed (read-only) ---

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    /// Number of live scheduled callbacks of any kind. Zero after `stop()`.
    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    // --- control surface ---

    /// Begins or restarts a session. Tears down whatever was in flight,
    /// resets score and clock, empties every hole (identity and cosmetics
    /// preserved) and kicks off the countdown, the spawn chain and the music.
    pub fn start(&mut self) {
        self.stop();
        self.score = 0;
        self.time_remaining = self.config.initial_time_secs;
        for hole in &mut self.holes {
            hole.status = HoleStatus::Empty;
        }
        self.state = GameState::Playing;
        self.countdown_timer = Some(self.queue.schedule(1000, Task::CountdownTick));
        self.schedule_next_spawn();
        self.audio.start_music();
    }

    /// Cancels every live handle: countdown, the pending spawn link, each
    /// hole's retract and clear timers, and stops the music. Idempotent, and
    /// leaves `state` alone; transitions are the caller's business.
    pub fn stop(&mut self) {
        if let Some(id) = self.countdown_timer.take() {
            self.queue.cancel(id);
        }
        if let Some(id) = self.spawn_timer.take() {
            self.queue.cancel(id);
        }
        for hole in &mut self.holes {
            if let Some(id) = hole.pending_retract.take() {
                self.queue.cancel(id);
            }
            if let Some(id) = hole.pending_clear.take() {
                self.queue.cancel(id);
            }
        }
        self.audio.stop_music();
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.audio.toggle_mute()
    }

    /// Resolves whack input against the current hole state. Anything but a
    /// Playing session and an Active hole is silently ignored.
    pub fn whack(&mut self, hole_id: usize) {
        if self.state != GameState::Playing {
            return;
        }
        let clear_ms = self.config.hit_clear_ms;
        let Some(hole) = self.holes.iter_mut().find(|h| h.id == hole_id) else {
            return;
        };
        if hole.status != HoleStatus::Active {
            return;
        }
        // Cancel the retract before touching status, so the already-due
        // retract can never run against a hole that just went to Hit.
        if let Some(id) = hole.pending_retract.take() {
            self.queue.cancel(id);
        }
        hole.status = HoleStatus::Hit;
        hole.pending_clear = Some(self.queue.schedule(clear_ms, Task::ClearHit(hole_id)));
        self.score += self.config.score_per_hit;
        self.audio.play_hit();
    }

    /// Advances the cooperative clock, firing due tasks at their own due
    /// times so chained reschedules stay relative to when they fired.
    pub fn tick(&mut self, elapsed: Duration) {
        let target = self.queue.now().saturating_add(elapsed.as_millis() as u64);
        while let Some(task) = self.queue.pop_due(target) {
            self.dispatch(task);
        }
        self.queue.advance_to(target);
    }

    // --- timer callbacks ---

    fn dispatch(&mut self, task: Task) {
        match task {
            Task::CountdownTick => self.on_countdown_tick(),
            Task::Spawn => self.on_spawn_fired(),
            Task::Retract(id) => self.on_retract(id),
            Task::ClearHit(id) => self.on_clear_hit(id),
        }
    }

    fn on_countdown_tick(&mut self) {
        self.countdown_timer = None;
        if self.state != GameState::Playing {
            return;
        }
        if self.time_remaining <= 1 {
            self.time_remaining = 0;
            self.stop();
            self.state = GameState::Finished;
            self.audio.play_game_over();
        } else {
            self.time_remaining -= 1;
            self.countdown_timer = Some(self.queue.schedule(1000, Task::CountdownTick));
        }
    }

    fn schedule_next_spawn(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        let delay = rand::thread_rng().gen_range(self.config.min_spawn_ms..=self.config.max_spawn_ms);
        self.spawn_timer = Some(self.queue.schedule(delay, Task::Spawn));
    }

    fn on_spawn_fired(&mut self) {
        self.spawn_timer = None;
        // the chain self-terminates here when stop() ran while this link was
        // already in flight
        if self.state != GameState::Playing {
            return;
        }
        self.spawn_one();
        self.schedule_next_spawn();
    }

    fn spawn_one(&mut self) {
        let mut rng = rand::thread_rng();
        let empty = self
            .holes
            .iter()
            .positions(|h| h.status == HoleStatus::Empty)
            .collect_vec();
        if empty.is_empty() {
            return;
        }
        let idx = empty[rng.gen_range(0..empty.len())];
        let kind = MoleKind::ALL[rng.gen_range(0..MoleKind::ALL.len())];
        let stay_ms = self.config.mole_stay_ms;
        let hole = &mut self.holes[idx];
        hole.status = HoleStatus::Active;
        hole.mole_kind = kind;
        hole.pending_retract = Some(self.queue.schedule(stay_ms, Task::Retract(hole.id)));
        self.audio.play_pop();
    }

    fn on_retract(&mut self, hole_id: usize) {
        let Some(hole) = self.holes.iter_mut().find(|h| h.id == hole_id) else {
            return;
        };
        hole.pending_retract = None;
        // status re-checked at fire time; a whack may have won the race
        if hole.status == HoleStatus::Active {
            hole.status = HoleStatus::Empty;
        }
    }

    fn on_clear_hit(&mut self, hole_id: usize) {
        let Some(hole) = self.holes.iter_mut().find(|h| h.id == hole_id) else {
            return;
        };
        hole.pending_clear = None;
        if hole.status == HoleStatus::Hit {
            hole.status = HoleStatus::Empty;
        }
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("state", &self.state)
            .field("score", &self.score)
            .field("time_remaining", &self.time_remaining)
            .field("holes", &self.holes)
            .field("pending_timers", &self.queue.len())
            .finish()
    }
}
