use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

use maze_chase::clock::{Clock, MonotonicClock};
use maze_chase::powerup::PowerUpKind;
use maze_chase::scores::{JsonlScoreStore, ScoreStore, DEFAULT_LEADERBOARD_LIMIT};
use maze_chase::session::{GameSession, Player};
use maze_chase::{Cell as GridCell, Dir, GameConfig, GameMode, Grid, Outcome, Simulation, Snapshot};

const CELL_W: usize = 2;
const INPUT_HOLD: Duration = Duration::from_millis(160);
const BANNER_SECS: f64 = 2.0;

#[derive(Parser, Debug)]
#[command(name = "maze-chase", about = "Reach the exit before the ghost catches you")]
struct Args {
    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "local")]
    user_id: String,
    #[arg(long, default_value = "player")]
    username: String,
    #[arg(long, default_value = "classic")]
    mode: GameMode,
    /// Score file, one JSON record per line.
    #[arg(long, default_value = "scores.jsonl")]
    scores: PathBuf,
    #[arg(long, default_value = "maze-chase.log")]
    log_file: PathBuf,
    /// Print the top N players and exit.
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "50")]
    leaderboard: Option<usize>,
}


#[derive(Clone, Copy, Debug, PartialEq)]
enum Glyph {
    Player,
    Ghost,
    Frozen,
    Wall,
    Empty,
    Trail,
    Goal,
    Speed,
    Freeze,
    Breaker,
}

impl Glyph {
    fn text(self) -> &'static str {
        match self {
            Glyph::Player => "😃",
            Glyph::Ghost => "👻",
            Glyph::Frozen => "🥶",
            Glyph::Wall => "██",
            Glyph::Empty => "  ",
            Glyph::Trail => "· ",
            Glyph::Goal => "🏁",
            Glyph::Speed => "⚡",
            Glyph::Freeze => "❄ ",
            Glyph::Breaker => "🔨",
        }
    }

    fn color(self) -> Color {
        match self {
            Glyph::Player => Color::Green,
            Glyph::Ghost => Color::Red,
            Glyph::Frozen | Glyph::Freeze => Color::Cyan,
            Glyph::Wall => Color::DarkGrey,
            Glyph::Empty => Color::Reset,
            Glyph::Trail => Color::DarkRed,
            Glyph::Goal => Color::Yellow,
            Glyph::Speed => Color::Blue,
            Glyph::Breaker => Color::DarkYellow,
        }
    }
}

impl From<PowerUpKind> for Glyph {
    fn from(kind: PowerUpKind) -> Self {
        match kind {
            PowerUpKind::Speed => Glyph::Speed,
            PowerUpKind::Freeze => Glyph::Freeze,
            PowerUpKind::WallBreaker => Glyph::Breaker,
        }
    }
}

/// Last frame drawn, so only changed cells are written.
struct Renderer {
    last: Vec<Glyph>,
    dims: (usize, usize),
    last_hud: String,
    needs_full: bool,
    origin: (u16, u16),
    visible: bool,
}

impl Renderer {
    fn new() -> Self {
        Self {
            last: Vec::new(),
            dims: (0, 0),
            last_hud: String::new(),
            needs_full: true,
            origin: (0, 1),
            visible: false,
        }
    }
}

/// Terminals report presses and repeats but not releases, so a direction
/// counts as held for a short window after its latest press.
#[derive(Debug, Default)]
struct HeldKey {
    latest: Option<(Dir, Instant)>,
}

impl HeldKey {
    fn press(&mut self, dir: Dir, at: Instant) {
        self.latest = Some((dir, at));
    }

    fn release(&mut self) {
        self.latest = None;
    }

    fn current(&self, now: Instant) -> Option<Dir> {
        self.latest
            .filter(|(_, at)| now.saturating_duration_since(*at) <= INPUT_HOLD)
            .map(|(dir, _)| dir)
    }
}

struct Banner {
    text: String,
    shown_at: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GameConfig::default(),
    };
    config.apply_env();
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate().context("invalid configuration")?;

    let store = JsonlScoreStore::new(&args.scores);
    if let Some(limit) = args.leaderboard {
        return print_leaderboard(&store, limit);
    }

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, config, store, &args);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("maze_chase=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn print_leaderboard(store: &JsonlScoreStore, limit: usize) -> Result<()> {
    let limit = if limit == 0 { DEFAULT_LEADERBOARD_LIMIT } else { limit };
    let entries = store
        .leaderboard(limit)
        .with_context(|| format!("reading {}", store.path().display()))?;
    if entries.is_empty() {
        println!("No scores yet.");
        return Ok(());
    }
    println!("{:>3}  {:<20} {:>6}  {:<6} {:>9}  {}", "#", "player", "score", "result", "survival", "mode");
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}  {:<20} {:>6}  {:<6} {:>8.1}s  {}",
            rank + 1,
            entry.username,
            entry.score,
            format!("{:?}", entry.result).to_lowercase(),
            entry.survival_time,
            entry.mode.as_str()
        );
    }
    Ok(())
}

fn run(stdout: &mut Stdout, config: GameConfig, store: JsonlScoreStore, args: &Args) -> Result<()> {
    let clock = MonotonicClock::new();
    let config = config.for_mode(args.mode);
    let frame_time = Duration::from_micros(1_000_000 / u64::from(config.frame_rate.max(1)));
    let sim = Simulation::new(config, clock.now());
    let player = Player {
        user_id: args.user_id.clone(),
        username: args.username.clone(),
    };
    info!(user = %player.user_id, mode = args.mode.as_str(), "session started");

    let mut session = GameSession::new(sim, clock, store, player, args.mode);
    let mut renderer = Renderer::new();
    let mut held = HeldKey::default();
    let mut banner: Option<Banner> = None;
    let mut events = Vec::new();

    let (cols, rows) = terminal::size()?;
    if !fits(session.simulation().grid(), cols, rows) {
        let (height, width) = playfield_for(cols, rows);
        session.resize(height, width, &mut events);
    }

    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                TermEvent::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
                    let dir = match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('r') if session.simulation().outcome().is_terminal() => {
                            session.restart();
                            held.release();
                            renderer.needs_full = true;
                            continue;
                        }
                        KeyCode::Char('k' | 'w') | KeyCode::Up => Dir::Up,
                        KeyCode::Char('j' | 's') | KeyCode::Down => Dir::Down,
                        KeyCode::Char('h' | 'a') | KeyCode::Left => Dir::Left,
                        KeyCode::Char('l' | 'd') | KeyCode::Right => Dir::Right,
                        _ => continue,
                    };
                    held.press(dir, Instant::now());
                }
                TermEvent::Resize(cols, rows) => {
                    let (height, width) = playfield_for(cols, rows);
                    session.resize(height, width, &mut events);
                }
                _ => {}
            }
        }

        let outcome = session.tick(held.current(Instant::now()), &mut events);
        let now = session.now();
        for ev in events.drain(..) {
            if let Some(text) = ev.message() {
                banner = Some(Banner { text, shown_at: now });
            }
        }
        if banner.as_ref().is_some_and(|b| now - b.shown_at > BANNER_SECS) {
            banner = None;
        }

        let snap = session.simulation().snapshot(now);
        let hud = hud_line(
            &snap,
            session.is_offline(),
            banner.as_ref().map(|b| b.text.as_str()),
            session.simulation().config().frame_rate,
        );
        render(stdout, &mut renderer, &snap, hud)?;
        if outcome.is_terminal() {
            render_game_over(stdout, &renderer, &snap)?;
        }
        stdout.flush()?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

/// Terminal columns and rows needed to show a grid plus the HUD line.
fn footprint(height: usize, width: usize) -> (u16, u16) {
    ((width * CELL_W) as u16, (height + 2) as u16)
}

fn fits(grid: &Grid, cols: u16, rows: u16) -> bool {
    let (need_cols, need_rows) = footprint(grid.height(), grid.width());
    cols >= need_cols && rows >= need_rows
}

/// Largest playfield (height, width) that fits a terminal of this size.
fn playfield_for(cols: u16, rows: u16) -> (usize, usize) {
    (usize::from(rows).saturating_sub(3), usize::from(cols) / CELL_W)
}

/// Lays the snapshot out as one glyph per cell, later layers on top:
/// walls, agent trails, goal, power-ups, agents, player.
fn paint(snap: &Snapshot) -> Vec<Glyph> {
    let grid = &snap.grid;
    let width = grid.width();
    let mut frame: Vec<Glyph> = (0..grid.height())
        .flat_map(|row| (0..width).map(move |col| GridCell::new(row, col)))
        .map(|cell| if grid.is_wall(cell) { Glyph::Wall } else { Glyph::Empty })
        .collect();

    let mut put = |cell: GridCell, glyph: Glyph| {
        if grid.in_bounds(cell) {
            frame[cell.row * width + cell.col] = glyph;
        }
    };
    for agent in &snap.agents {
        for &cell in &agent.path {
            put(cell, Glyph::Trail);
        }
    }
    put(snap.goal, Glyph::Goal);
    for power_up in &snap.power_ups {
        put(power_up.cell, power_up.kind.into());
    }
    for agent in &snap.agents {
        put(agent.cell, if agent.frozen { Glyph::Frozen } else { Glyph::Ghost });
    }
    let (row, col) = snap.player_position;
    put(GridCell::new(row.round() as usize, col.round() as usize), Glyph::Player);
    frame
}

fn render(stdout: &mut Stdout, renderer: &mut Renderer, snap: &Snapshot, hud: String) -> io::Result<()> {
    let grid = &snap.grid;
    let (term_w, term_h) = terminal::size()?;
    if !fits(grid, term_w, term_h) {
        let (need_w, need_h) = footprint(grid.height(), grid.width());
        stdout.queue(MoveTo(0, 0))?;
        stdout.queue(Clear(ClearType::All))?;
        stdout.queue(Print(format!(
            "Terminal too small. Need at least {need_w}x{need_h} (cols x rows). Current: {term_w}x{term_h}."
        )))?;
        renderer.needs_full = true;
        renderer.visible = false;
        return Ok(());
    }

    let (need_w, need_h) = footprint(grid.height(), grid.width());
    let origin = ((term_w - need_w) / 2, (term_h - need_h) / 2 + 1);
    let dims = (grid.height(), grid.width());
    if origin != renderer.origin || dims != renderer.dims {
        renderer.origin = origin;
        renderer.dims = dims;
        renderer.needs_full = true;
    }
    if renderer.needs_full {
        stdout.queue(Clear(ClearType::All))?;
    }

    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(origin.0, origin.1 - 1))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Print(&hud))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    let frame = paint(snap);
    for (idx, glyph) in frame.iter().enumerate() {
        if renderer.needs_full || renderer.last.get(idx) != Some(glyph) {
            draw_glyph(stdout, origin, idx % dims.1, idx / dims.1, *glyph)?;
        }
    }
    renderer.last = frame;
    renderer.needs_full = false;
    renderer.visible = true;
    Ok(())
}

fn draw_glyph(stdout: &mut Stdout, origin: (u16, u16), col: usize, row: usize, glyph: Glyph) -> io::Result<()> {
    let text = glyph.text();
    let pad = CELL_W.saturating_sub(UnicodeWidthStr::width(text));
    stdout.queue(MoveTo(origin.0 + (col * CELL_W) as u16, origin.1 + row as u16))?;
    stdout.queue(SetForegroundColor(glyph.color()))?;
    stdout.queue(Print(format!("{text}{}", " ".repeat(pad))))?;
    stdout.queue(ResetColor)?;
    Ok(())
}

fn hud_line(snap: &Snapshot, offline: bool, banner: Option<&str>, frame_rate: u32) -> String {
    let mut parts = vec![format!("Score: {}", snap.score), format!("Lives: {}", snap.lives)];
    for effect in &snap.effects {
        parts.push(format!("{}: {}s", effect.kind.label(), effect.remaining.ceil()));
    }
    // Freeze is tracked on the agents; its countdown is the only timer left.
    let frozen = snap.countdowns.get(PowerUpKind::Freeze);
    if frozen > 0 {
        parts.push(format!(
            "{}: {}s",
            PowerUpKind::Freeze.label(),
            frozen.div_ceil(frame_rate.max(1))
        ));
    }
    if offline {
        parts.push("[offline]".to_string());
    }
    if let Some(text) = banner {
        parts.push(text.to_string());
    }
    parts.push("(q to quit)".to_string());
    parts.join("  ")
}

fn render_game_over(stdout: &mut Stdout, renderer: &Renderer, snap: &Snapshot) -> io::Result<()> {
    let (x, y) = if renderer.visible {
        (renderer.origin.0, renderer.origin.1 + snap.grid.height() as u16)
    } else {
        (0, 1)
    };
    let headline = match snap.outcome {
        Outcome::Win => "YOU ESCAPED",
        _ => "GAME OVER",
    };
    stdout.queue(MoveTo(x, y))?;
    stdout.queue(Clear(ClearType::CurrentLine))?;
    stdout.queue(Print(format!(
        "{headline} - Final Score: {} (r to restart, q to quit)",
        snap.score
    )))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_sim() -> Simulation {
        let config = GameConfig {
            spawn_chance: 0.0,
            agent_count: 0,
            ..GameConfig::default()
        };
        Simulation::with_grid(config, Grid::bordered(10, 12), 1, 0.0)
    }

    #[test]
    fn held_key_expires_after_the_hold_window() {
        let t0 = Instant::now();
        let mut held = HeldKey::default();
        assert_eq!(held.current(t0), None);

        held.press(Dir::Up, t0);
        held.press(Dir::Right, t0 + Duration::from_millis(20));
        assert_eq!(held.current(t0 + Duration::from_millis(100)), Some(Dir::Right));
        assert_eq!(held.current(t0 + Duration::from_millis(400)), None);

        held.press(Dir::Left, t0);
        held.release();
        assert_eq!(held.current(t0), None);
    }

    #[test]
    fn hud_shows_each_effect_once() {
        let mut sim = open_sim();
        sim.place_power_up(PowerUpKind::Speed, GridCell::new(1, 1), 0.0);
        sim.place_power_up(PowerUpKind::Freeze, GridCell::new(1, 1), 0.0);
        sim.step(0.5, None, &mut Vec::new());

        let hud = hud_line(&sim.snapshot(1.5), false, None, 60);
        assert!(hud.contains("Speed Boost: 2s"), "{hud}");
        assert!(hud.contains("Ghost Freeze: 3s"), "{hud}");
        assert_eq!(hud.matches("Ghost Freeze").count(), 1);
        assert!(!hud.contains("[offline]"));

        let hud = hud_line(&sim.snapshot(1.5), true, Some("Wall broken!"), 60);
        assert!(hud.contains("[offline]") && hud.contains("Wall broken!"));
    }

    #[test]
    fn playfield_fits_the_terminal_it_was_sized_for() {
        for (cols, rows) in [(80, 24), (61, 30), (120, 40), (40, 16)] {
            let (height, width) = playfield_for(cols, rows);
            assert!(fits(&Grid::bordered(height, width), cols, rows), "{cols}x{rows}");
            assert!(!fits(&Grid::bordered(height + 2, width), cols, rows));
        }
        assert!(!fits(&Grid::bordered(21, 31), 60, 20));
    }

    #[test]
    fn paint_layers_player_over_everything() {
        let mut sim = open_sim();
        sim.add_agent(GridCell::new(5, 5), 0.0);
        sim.place_power_up(PowerUpKind::WallBreaker, GridCell::new(3, 3), 0.0);
        let snap = sim.snapshot(0.0);
        let frame = paint(&snap);
        let at = |row: usize, col: usize| frame[row * 12 + col];

        assert_eq!(frame.len(), 120);
        assert_eq!(at(0, 0), Glyph::Wall);
        assert_eq!(at(1, 1), Glyph::Player);
        assert_eq!(at(5, 5), Glyph::Ghost);
        assert_eq!(at(3, 3), Glyph::Breaker);
        assert_eq!(at(8, 10), Glyph::Goal);
        assert_eq!(at(2, 2), Glyph::Empty);
    }
}
