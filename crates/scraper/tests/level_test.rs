//! # Level Integration Test
//!
//! Drives whole levels through the public API: config and weather in,
//! ticks, deaths and reloads out.

use std::path::PathBuf;
use std::sync::Arc;

use scraper::{GameConfig, GameEvent, Level, PlayerInput, TickReport, WeatherReport};
use scraper_tilemap::{GeneratorWorker, TemplatePool};

fn weather(condition: &str) -> WeatherReport {
    WeatherReport {
        condition: condition.to_string(),
        ..WeatherReport::default()
    }
}

fn tick_ready(level: &mut Level, input: PlayerInput) -> TickReport {
    while !level.terrain_ready() {
        std::thread::yield_now();
    }
    level.tick(input)
}

/// Test: the weather condition picks the generator's pool.
#[test]
fn test_weather_picks_pool() {
    for (condition, pool) in [
        ("Clear", TemplatePool::Fair),
        ("Rain", TemplatePool::Precipitation),
        ("Snow", TemplatePool::Precipitation),
        ("Clouds", TemplatePool::Mixed),
        ("", TemplatePool::Precipitation),
    ] {
        let level = Level::new(GameConfig::default(), weather(condition)).unwrap();
        assert_eq!(level.generator().pool(), pool, "{condition:?}");
    }
}

/// Test: a config file on disk pointing at the template manifest loads.
#[test]
fn test_level_from_config_file() {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../scraper_tilemap/assets/maps/templates.toml");
    let dir = std::env::temp_dir().join(format!("scraper_level_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("game.toml");
    std::fs::write(
        &path,
        format!(
            "seed = 99\ntemplates = {:?}\n[scroll]\nspeed = 2.5\n[hazards]\nenabled = false\n",
            manifest.display().to_string()
        ),
    )
    .unwrap();

    let config = GameConfig::load(&path).unwrap();
    let mut level = Level::new(config, WeatherReport::sample().unwrap()).unwrap();

    assert_eq!(level.library().len(), 8);
    assert_eq!(level.config().seed, 99);
    for _ in 0..30 {
        tick_ready(&mut level, PlayerInput::default());
    }
    assert!(level.scroll_speed() > 2.5);
    assert!(level.hazards().is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

/// Test: the same seed and weather play out identically.
#[test]
fn test_runs_are_deterministic() {
    let play = || {
        let mut config = GameConfig::default();
        config.hazards.enabled = false;
        let mut level = Level::new(config, weather("Rain")).unwrap();
        let mut trace = Vec::new();
        for tick in 0..400u64 {
            let input = if tick % 40 == 0 {
                PlayerInput::JUMP
            } else {
                PlayerInput::default()
            };
            let report = tick_ready(&mut level, input);
            trace.push((report.alive, level.player().x().to_bits(), level.player().y().to_bits()));
            if !report.alive {
                break;
            }
        }
        trace
    };

    assert_eq!(play(), play());
}

/// Test: a long session with deaths and reloads keeps memory bounded and
/// always leaves exactly one live worker.
#[test]
fn test_reload_cycles() {
    let mut config = GameConfig::default();
    config.hazards.enabled = false;
    let mut level = Level::new(config, weather("Rain")).unwrap();
    let events = level.events();

    let mut deaths = 0;
    let mut retired = Vec::new();
    for _ in 0..5 {
        // Never jump: the first pit ends the run.
        let mut alive = true;
        for _ in 0..20_000 {
            alive = tick_ready(&mut level, PlayerInput::default()).alive;
            if !alive {
                break;
            }
        }
        if alive {
            continue;
        }
        deaths += 1;

        retired.push(Arc::clone(level.generator()));
        level.reload().unwrap();
        assert!(level.worker().is_some_and(GeneratorWorker::is_running));
        assert_eq!(level.player().distance(), 0.0);
        assert!(level.hazards().is_empty());
        assert_eq!(level.grid().x(), 0.0);
    }

    assert!(deaths > 0, "rain levels have pits");
    for generator in &retired {
        assert!(!generator.is_active());
        // Only our handle is left: the grid and the worker let go.
        assert_eq!(Arc::strong_count(generator), 1);
    }

    let drained = events.drain();
    let died = drained
        .iter()
        .filter(|e| matches!(e, GameEvent::PlayerDied { .. }))
        .count();
    let reloaded = drained
        .iter()
        .filter(|e| matches!(e, GameEvent::LevelReloaded))
        .count();
    assert_eq!(died, deaths);
    assert_eq!(reloaded, deaths);
}

/// Test: projectiles arrive and the player survives them by parrying.
#[test]
fn test_parrying_through_a_storm() {
    let mut config = GameConfig::default();
    config.hazards.min_interval_ms = 250;
    let storm = WeatherReport {
        humidity: 0.0,
        ..weather("Clear")
    };

    // Flat ground only, so nothing but projectiles can end the run.
    let flat = scraper_tilemap::TileTemplate::from_columns(
        "flat",
        8,
        vec![vec![0, 0, 0, 0, 0, 0, 0, 21]; 4],
    )
    .unwrap()
    .with_extendable(true)
    .in_pool(TemplatePool::Mixed);
    let library = Arc::new(scraper_tilemap::TemplateLibrary::from_templates(8, vec![flat]).unwrap());
    let mut level = Level::with_library(config, storm, library).unwrap();
    let events = level.events();

    let mut spawned = 0;
    let mut parried = 0;
    for _ in 0..3_000 {
        let (px, py) = (level.player().x(), level.player().y());
        let parry = level.hazards().iter().any(|h| {
            (0.0..40.0).contains(&(h.body().x - px)) && (h.body().y - py).abs() < 30.0
        });
        let report = tick_ready(&mut level, PlayerInput { jump: false, parry });
        assert!(report.alive);

        for event in events.drain() {
            match event {
                GameEvent::HazardSpawned { .. } => spawned += 1,
                GameEvent::HazardDestroyed { parried: true, .. } => parried += 1,
                _ => {}
            }
        }
    }

    assert!(spawned > 10, "{spawned}");
    assert!(parried > 0);
    assert_eq!(level.player().health(), level.player().max_health());
}
