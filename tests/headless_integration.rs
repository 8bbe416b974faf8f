use std::time::Duration;

use bonk::audio::NullAudio;
use bonk::config::GameConfig;
use bonk::game::{Game, GameState};
use bonk::hole::HoleStatus;

// Headless integration driving the whole core over the simulated cooperative
// clock: countdown, spawn chain, retracts, whacks and teardown, no TTY.

fn new_game(cfg: GameConfig) -> Game {
    Game::with_hole_count(cfg, Box::new(NullAudio::default()), 6)
}

fn snapshot(game: &Game) -> (GameState, u32, u32, Vec<HoleStatus>) {
    (
        game.state(),
        game.score(),
        game.time_remaining(),
        game.holes().iter().map(|h| h.status).collect(),
    )
}

fn first_active(game: &Game) -> Option<usize> {
    game.holes()
        .iter()
        .find(|h| h.status == HoleStatus::Active)
        .map(|h| h.id)
}

/// Steps the clock in 10ms increments until a mole surfaces; returns
/// (hole id, elapsed ms).
fn tick_until_spawn(game: &mut Game, cap_ms: u64) -> (usize, u64) {
    let mut elapsed = 0;
    loop {
        game.tick(Duration::from_millis(10));
        elapsed += 10;
        if let Some(id) = first_active(game) {
            return (id, elapsed);
        }
        assert!(elapsed < cap_ms, "no spawn within {cap_ms}ms");
    }
}

#[test]
fn full_session_runs_down_to_finished() {
    let mut game = new_game(GameConfig::default());
    game.start();
    assert_eq!(snapshot(&game).0, GameState::Playing);

    // 30 seconds of play in coarse ticks
    for _ in 0..300 {
        game.tick(Duration::from_millis(100));
    }

    assert_eq!(game.state(), GameState::Finished);
    assert_eq!(game.time_remaining(), 0);
    assert_eq!(game.pending_timers(), 0, "finish cancels every timer");

    // the world is inert afterwards
    let before = snapshot(&game);
    game.tick(Duration::from_secs(120));
    assert_eq!(snapshot(&game), before);
}

#[test]
fn start_then_stop_goes_silent() {
    let mut game = new_game(GameConfig::default());
    game.start();
    game.stop();

    assert_eq!(game.pending_timers(), 0);
    let before = snapshot(&game);
    game.tick(Duration::from_secs(3600));
    assert_eq!(snapshot(&game), before, "no callback may fire after stop()");
}

#[test]
fn active_holes_always_carry_retract_handles() {
    let mut game = new_game(GameConfig::default());
    game.start();

    // sample the invariant at many instants across a few seconds of play
    for _ in 0..500 {
        game.tick(Duration::from_millis(10));
        let active = game
            .holes()
            .iter()
            .filter(|h| h.status == HoleStatus::Active)
            .count();
        assert!(active <= game.holes().len());
        for hole in game.holes() {
            match hole.status {
                HoleStatus::Active => assert!(hole.pending_retract.is_some()),
                _ => assert!(hole.pending_retract.is_none()),
            }
        }
    }
}

#[test]
fn scenario_first_spawn_and_unwhacked_retract() {
    // duration=30, spawn in [600,1200], stay=1300, 10 points per hit
    let mut game = new_game(GameConfig::default());
    game.start();

    assert_eq!(game.state(), GameState::Playing);
    assert_eq!(game.score(), 0);
    assert_eq!(game.time_remaining(), 30);

    let (_, elapsed) = tick_until_spawn(&mut game, 1300);
    assert!((600..=1210).contains(&elapsed), "spawned at {elapsed}ms");
    assert_eq!(
        game.holes()
            .iter()
            .filter(|h| h.status == HoleStatus::Active)
            .count(),
        1
    );

    // 1300ms with no whack: that mole ducks back down on its own and the
    // chain keeps running independently
    game.tick(Duration::from_millis(1300));
    assert!(game.pending_timers() >= 1, "next spawn link still pending");
    assert_eq!(game.score(), 0);
}

#[test]
fn scenario_whack_then_reset_with_no_late_retract() {
    // pin the spawn gap far out so the first mole is alone on stage
    let mut game = new_game(GameConfig {
        min_spawn_ms: 600,
        max_spawn_ms: 600,
        ..GameConfig::default()
    });
    game.start();

    game.tick(Duration::from_millis(600));
    let id = first_active(&game).expect("mole up at 600ms");

    game.whack(id);
    assert_eq!(game.score(), 10);
    let hole = game.holes().iter().find(|h| h.id == id).unwrap();
    assert_eq!(hole.status, HoleStatus::Hit);
    assert!(hole.pending_retract.is_none(), "retract cancelled by the hit");

    // the splat clears after the 500ms reset delay
    game.tick(Duration::from_millis(500));
    assert_eq!(
        game.holes().iter().find(|h| h.id == id).unwrap().status,
        HoleStatus::Empty
    );

    // advance past the original stay duration: the cancelled retract never
    // fires and no phantom transition or score shows up
    let score_before = game.score();
    game.tick(Duration::from_millis(1300));
    assert_eq!(game.score(), score_before);
}

#[test]
fn whacking_empty_or_hit_holes_changes_nothing() {
    let mut game = new_game(GameConfig::default());
    game.start();
    let (id, _) = tick_until_spawn(&mut game, 1300);

    let empty_id = game
        .holes()
        .iter()
        .find(|h| h.status == HoleStatus::Empty)
        .unwrap()
        .id;
    game.whack(empty_id);
    assert_eq!(game.score(), 0);
    assert_eq!(
        game.holes().iter().find(|h| h.id == empty_id).unwrap().status,
        HoleStatus::Empty
    );

    game.whack(id);
    let score = game.score();
    game.whack(id); // now in Hit
    assert_eq!(game.score(), score);
    assert_eq!(
        game.holes().iter().find(|h| h.id == id).unwrap().status,
        HoleStatus::Hit
    );
}

#[test]
fn scenario_play_again_resets_cleanly() {
    let mut game = new_game(GameConfig::default());
    game.start();
    let (id, _) = tick_until_spawn(&mut game, 1300);
    game.whack(id);
    game.tick(Duration::from_secs(2));
    assert!(game.score() > 0 && game.time_remaining() < 30);

    // second start fully resets regardless of in-flight timers
    game.start();
    assert_eq!(game.state(), GameState::Playing);
    assert_eq!(game.score(), 0);
    assert_eq!(game.time_remaining(), 30);
    assert!(game
        .holes()
        .iter()
        .all(|h| h.status == HoleStatus::Empty && h.pending_retract.is_none()));
    assert_eq!(game.pending_timers(), 2);
}

#[test]
fn time_reaches_zero_exactly_once() {
    let mut game = new_game(GameConfig {
        initial_time_secs: 3,
        ..GameConfig::default()
    });
    game.start();

    let mut zero_crossings = 0;
    let mut last = game.time_remaining();
    for _ in 0..100 {
        game.tick(Duration::from_millis(100));
        let now = game.time_remaining();
        if now == 0 && last != 0 {
            zero_crossings += 1;
            assert_eq!(game.state(), GameState::Finished);
            assert_eq!(game.pending_timers(), 0);
        }
        last = now;
    }
    assert_eq!(zero_crossings, 1);
}

#[test]
fn runner_drives_a_headless_session() {
    use bonk::runtime::{FixedTicker, GameEvent, Runner, TestEventSource};
    use std::sync::mpsc;

    let mut game = new_game(GameConfig {
        initial_time_secs: 1,
        ..GameConfig::default()
    });
    game.start();

    let (_tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(1)));

    // each timeout step stands in for 100ms of wall time
    for _ in 0..15 {
        if let GameEvent::Tick = runner.step() {
            game.tick(Duration::from_millis(100));
        }
        if game.state() == GameState::Finished {
            break;
        }
    }

    assert_eq!(game.state(), GameState::Finished);
    assert_eq!(game.time_remaining(), 0);
}
