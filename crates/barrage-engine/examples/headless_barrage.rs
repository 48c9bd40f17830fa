//! Headless run of a scene file with a simulated, uneven frame rate.
//!
//! Run with: `cargo run -p barrage-engine --example headless_barrage -- [scene.json] [seconds]`
//!
//! Defaults to `scenes/spiral.json` for 10 seconds. Set `RUST_LOG=debug` for
//! per-pool logging.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use barrage_engine::prelude::*;

fn main() -> anyhow::Result<()> {
    barrage_engine::logging::init_tracing("info");

    let mut args = std::env::args().skip(1);
    let scene_path = args
        .next()
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/scenes/spiral.json").to_owned());
    let seconds: f64 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid duration '{arg}'"))?,
        None => 10.0,
    };

    let scene = SceneConfig::from_path(&scene_path)?;
    let registry = Arc::new(barrage_engine::builtin_registry()?);
    let mut tick_loop = scene.build(registry)?;

    // Alternate fast and slow frames, with an occasional long stall.
    let frames = [16u64, 17, 16, 33, 16, 250];
    let mut elapsed = 0.0;
    let mut frame = 0usize;
    while elapsed < seconds {
        let frame_time = Duration::from_millis(frames[frame % frames.len()]);
        tick_loop.advance_frame(frame_time);
        elapsed += frame_time.as_secs_f64();
        frame += 1;

        if frame % 120 == 0 {
            let space = tick_loop.space();
            let counts: Vec<String> = space
                .pools()
                .iter()
                .map(|(_, pool)| format!("{}={}", pool.name(), pool.active_count()))
                .collect();
            tracing::info!(tick = space.tick_count(), pools = %counts.join(" "), "progress");
        }
    }

    let space = tick_loop.space();
    println!("frames:       {frame}");
    println!("ticks:        {}", space.tick_count());
    println!("sim time:     {:.3} s", space.sim_time());
    println!("dropped time: {:.3} s", tick_loop.clock().dropped_time());
    for (_, pool) in space.pools().iter() {
        println!("pool {:<10} {:>5} / {}", pool.name(), pool.active_count(), pool.capacity());
    }
    for (name, time) in &space.last_diagnostics().system_times {
        println!("system {name:<12} {time:?}");
    }
    println!("state hash:   {}", space.state_hash());
    Ok(())
}
