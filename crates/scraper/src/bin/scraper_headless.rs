//! # SCRAPER Headless Run
//!
//! Plays a level without a window: an autopilot jumps over gaps and walls
//! and parries incoming projectiles. Dead runs are reloaded.
//!
//! ```text
//! scraper_headless [--ticks N] [--config game.toml] [--weather report.json]
//! ```

use std::process::ExitCode;
use std::time::Instant;

use scraper::{
    GameConfig, GameEvent, GameResult, Level, PlayerInput, WeatherReport, PLAYER_SIZE,
};

const DEFAULT_TICKS: u64 = 60 * 60;

struct Args {
    ticks: u64,
    config: Option<String>,
    weather: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        ticks: DEFAULT_TICKS,
        config: None,
        weather: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("{flag} needs a value"))?;
        match flag.as_str() {
            "--ticks" => {
                args.ticks = value
                    .parse()
                    .map_err(|_| format!("--ticks: not a number: {value}"))?;
            }
            "--config" => args.config = Some(value),
            "--weather" => args.weather = Some(value),
            other => return Err(format!("unknown flag {other}")),
        }
    }
    Ok(args)
}

/// Jumps when the ground ahead ends or a wall is coming, parries when a
/// projectile is close.
fn autopilot(level: &Level) -> PlayerInput {
    let player = level.player();
    let grid = level.grid();
    let ts = f64::from(grid.tile_size());
    let flags = player.body().flags;

    let feet_row = ((player.y() + f64::from(PLAYER_SIZE / 2)) / ts).floor() as i32;
    let ahead_col = ((player.x() + ts * 1.5) / ts).floor() as i32;
    let grounded = !flags.falling && !flags.fast_falling;
    let gap = !grid.query_tile_type(feet_row, ahead_col).is_blocked();
    let wall = grid.query_tile_type(feet_row - 1, ahead_col).is_blocked();

    let parry = level.hazards().iter().any(|hazard| {
        let body = hazard.body();
        (0.0..90.0).contains(&(body.x - player.x())) && (body.y - player.y()).abs() < ts
    });

    PlayerInput {
        jump: grounded && (gap || wall),
        parry,
    }
}

#[derive(Default)]
struct Summary {
    runs: u64,
    best_distance: f64,
    damaged: u64,
    parried: u64,
    healed: u64,
    hard_landings: u64,
    spawned: u64,
    stalls: u64,
}

impl Summary {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PlayerDamaged { .. } => self.damaged += 1,
            GameEvent::Parried { .. } => self.parried += 1,
            GameEvent::PlayerHealed { .. } => {
                self.parried += 1;
                self.healed += 1;
            }
            GameEvent::LandedHard { .. } => self.hard_landings += 1,
            GameEvent::PlayerDied { distance, .. } => {
                self.runs += 1;
                self.best_distance = self.best_distance.max(*distance);
            }
            GameEvent::HazardSpawned { .. } => self.spawned += 1,
            GameEvent::HazardDestroyed { .. } | GameEvent::LevelReloaded => {}
        }
    }
}

fn run(args: &Args) -> GameResult<()> {
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let weather = match &args.weather {
        Some(path) => WeatherReport::from_json(&std::fs::read_to_string(path)?)?,
        None => WeatherReport::sample()?,
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                 SCRAPER - HEADLESS RUN                           ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Weather:            {} ({:.1} °C, {}% humidity)", weather.condition, weather.temperature, weather.humidity);
    println!("│ Template Pool:      {}", weather.pool());
    println!("│ Seed:               {:#x}", config.seed);
    println!("│ Ticks:              {} @ {} Hz", args.ticks, config.tick_rate_hz);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let mut level = Level::new(config, weather)?;
    let events = level.events();
    let mut summary = Summary::default();
    let start = Instant::now();

    for _ in 0..args.ticks {
        if !level.terrain_ready() {
            summary.stalls += 1;
            while !level.terrain_ready() {
                std::thread::yield_now();
            }
        }

        let input = autopilot(&level);
        let report = level.tick(input);
        for event in events.drain() {
            summary.record(&event);
        }

        if !report.alive {
            level.reload()?;
        }
    }

    let elapsed = start.elapsed();
    let distance = level.player().distance();
    summary.best_distance = summary.best_distance.max(distance);
    let stats = level.generator().stats();

    println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
    println!("│ Real Time:          {:.3} s", elapsed.as_secs_f64());
    println!("│ Deaths:             {}", summary.runs);
    println!("│ Best Distance:      {:.0} px", summary.best_distance);
    println!("│ Current Distance:   {distance:.0} px");
    println!("│ Scroll Speed:       {:.3} px/tick", level.scroll_speed());
    println!("│ Hits Taken:         {}", summary.damaged);
    println!("│ Parries:            {} ({} heals)", summary.parried, summary.healed);
    println!("│ Hard Landings:      {}", summary.hard_landings);
    println!("│ Hazards Spawned:    {}", summary.spawned);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ TERRAIN (current level) ───────────────────────────────────────┐");
    println!("│ Columns:            {}", level.grid().len());
    println!("│ Generator Runs:     {} ({} capped)", stats.runs, stats.capped_runs);
    println!("│ Templates Appended: {}", stats.templates_appended);
    println!("│ Loading Stalls:     {}", summary.stalls);
    println!("└──────────────────────────────────────────────────────────────────┘");

    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: scraper_headless [--ticks N] [--config game.toml] [--weather report.json]");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("scraper_headless: {error}");
            ExitCode::FAILURE
        }
    }
}
