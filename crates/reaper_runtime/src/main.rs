//! Reaper Runtime
//!
//! Headless endless scroller that drives the lifecycle manager once per fixed
//! tick. Useful for comparing presets: `reaper BASELINE 120` shows unbounded
//! growth, `reaper STAGE_5_COMPLETE 120` shows it held in check.
//!
//! Usage: `reaper [PRESET] [SECONDS]`. `REAPER_CONFIG` points at a JSON config.

mod world;

use anyhow::{Context, Result};
use reaper_core::glam::Vec2;
use reaper_core::time::{ManualClock, TICK_DURATION, TICK_RATE_HZ};
use reaper_core::{Category, LifecycleManager};
use std::time::Duration;
use world::{Spawner, World};

/// Player speed in pixels per second.
const SCROLL_SPEED: f32 = 420.0;
const DEFAULT_SECONDS: u64 = 90;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Reaper v{}", reaper_core::VERSION);

    let mut args = std::env::args().skip(1);
    let preset = args.next();
    let seconds = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid duration '{raw}'"))?,
        None => DEFAULT_SECONDS,
    };

    let config = reaper_services::load_settings(None).context("loading config")?;
    let services = reaper_services::init_services();

    // Simulated time runs faster than the wall clock.
    let clock = ManualClock::new();
    let mut manager = LifecycleManager::new(
        &config,
        clock.shared(),
        Box::new(services.memory),
        Box::new(services.textures),
    )?;
    if let Some(name) = preset {
        manager
            .activate(&name)
            .with_context(|| format!("available presets: {:?}", manager.list_presets()))?;
    }

    let world = World::default();
    let mut spawner = Spawner::new(0x5EED_CAFE);
    let ticks = seconds * TICK_RATE_HZ as u64;
    let mut viewport = Vec2::new(0.0, 0.0);
    let mut evicted = 0usize;

    for tick in 0..ticks {
        clock.advance(TICK_DURATION);
        viewport.x += SCROLL_SPEED * TICK_DURATION.as_secs_f32();

        for (category, x) in spawner.spawn_ahead(viewport.x) {
            let (key, object) = world.spawn(category, x);
            let id = manager.track(category, object);
            if category == Category::CollectibleRing {
                world.watch_ring(id, key, x);
            }
        }
        for id in world.collect_rings(viewport.x) {
            manager.untrack(id);
        }
        if let Some(key) = spawner.texture_request(tick) {
            manager.track_texture(key, 64 * 1024);
        }

        evicted += manager.frame(viewport).evicted();

        for key in manager.take_released_textures() {
            tracing::debug!(%key, "texture released");
        }
    }

    manager.shutdown();

    let (stage, _) = manager.current();
    let simulated = Duration::from_secs(seconds);
    for category in Category::ALL {
        tracing::info!(
            %category,
            tracked = manager.count_of(category),
            alive = world.alive(category),
            "final population"
        );
    }
    tracing::info!(
        %stage,
        ?simulated,
        evicted,
        escalations = manager.pressure().escalations(),
        textures = manager.textures().tracked(),
        "simulation finished"
    );

    let report = manager.analyze_patterns();
    for label in &report.concerning {
        let count = report.counts.get(label).copied().unwrap_or(0);
        tracing::warn!(%label, count, "recurring anomaly");
    }

    Ok(())
}
