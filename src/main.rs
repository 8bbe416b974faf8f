pub mod audio;
pub mod config;
pub mod game;
pub mod hole;
pub mod runtime;
pub mod scheduler;
pub mod ui;

use crate::{
    audio::{AudioBackend, AudioEngine, NullAudio},
    config::{ConfigStore, FileConfigStore, GameConfig},
    game::Game,
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyModifiers, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 50;

/// colorful whack-a-mole tui with randomized burrows and generative chiptune audio
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Whack-a-mole in the terminal: moles pop out of a scattered grid of burrows on randomized timers. Whack them with the digit keys or the mouse before they duck back down."
)]
pub struct Cli {
    /// round length in seconds
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// pin the number of burrows (1-9, so every burrow stays on a digit key)
    #[clap(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=9))]
    holes: Option<usize>,

    /// start with the sound muted
    #[clap(short = 'm', long)]
    muted: bool,

    /// disable the audio device entirely
    #[clap(long)]
    no_audio: bool,
}

impl Cli {
    /// Applies CLI overrides on top of the stored configuration.
    fn apply(&self, mut cfg: GameConfig) -> GameConfig {
        if let Some(secs) = self.seconds {
            cfg.initial_time_secs = secs;
        }
        if let Some(n) = self.holes {
            cfg.min_holes = n;
            cfg.max_holes = n;
        }
        cfg
    }
}

#[derive(Debug)]
pub struct App {
    pub game: Game,
    pub muted: bool,
}

impl App {
    pub fn new(cli: &Cli, cfg: GameConfig) -> Self {
        let audio: Box<dyn AudioBackend> = if cli.no_audio {
            Box::new(NullAudio::default())
        } else {
            Box::new(AudioEngine::new(&cfg.audio))
        };
        let mut game = match cli.holes {
            Some(n) => Game::with_hole_count(cfg, audio, n),
            None => Game::new(cfg, audio),
        };
        let mut muted = false;
        if cli.muted {
            muted = game.toggle_mute();
        }
        Self { game, muted }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let cfg = cli.apply(FileConfigStore::new().load());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&cli, cfg);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(app, f))?;

        match runner.step() {
            GameEvent::Tick => {
                // feed real elapsed time so a starved loop doesn't slow the game
                app.game.tick(last_tick.elapsed());
                last_tick = Instant::now();
            }
            GameEvent::Resize => {}
            GameEvent::Mouse(mouse) => {
                if let MouseEventKind::Down(_) = mouse.kind {
                    let size = terminal.size()?;
                    let area = Rect::new(0, 0, size.width, size.height);
                    let (_, _, grid, _) = ui::screen_chunks(area);
                    if let Some(id) = ui::hole_at(grid, app.game.holes(), mouse.column, mouse.row) {
                        app.game.whack(id);
                    }
                }
            }
            GameEvent::Key(key) => match key.code {
                KeyCode::Esc => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('s') | KeyCode::Enter => app.game.start(),
                KeyCode::Char('p') => app.game.stop(),
                KeyCode::Char('m') => app.muted = app.game.toggle_mute(),
                KeyCode::Char(c) => {
                    if let Some(id) = digit_to_hole(c) {
                        app.game.whack(id);
                    }
                }
                _ => {}
            },
        }
    }

    Ok(())
}

/// Digit keys 1-9 map to hole ids 0-8.
fn digit_to_hole(c: char) -> Option<usize> {
    c.to_digit(10)
        .filter(|d| *d >= 1)
        .map(|d| (d - 1) as usize)
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}
