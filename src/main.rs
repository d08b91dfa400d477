//! Headless driver: loads a catalog, applies a query and runs the frame loop
//! against a counting sink, logging what each stage is doing.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use log::{info, warn, LevelFilter};
use nalgebra::{Vector2, Vector3};

use satcat_engine::ingest;
use satcat_engine::{
    CatalogSource, Engine, EngineConfig, EngineError, FrameInput, Picker, PriorityClass, RenderSink, Result,
    Sgp4Propagator, Viewpoint,
};

#[derive(Parser, Debug)]
#[command(name = "satcat", version, about = "Run the satellite catalog engine headless")]
struct Cli {
    /// TOML file overriding engine defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CelesTrak group to fetch.
    #[arg(long, default_value = "active")]
    group: String,

    /// Read TLEs from a local file instead of fetching.
    #[arg(long, conflicts_with = "group")]
    file: Option<PathBuf>,

    #[arg(long, short, default_value = "")]
    query: String,

    #[arg(long, default_value_t = 600)]
    frames: u64,

    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Viewpoint orbit radius in km.
    #[arg(long, default_value_t = 20_000.0)]
    view_radius: f64,

    /// Print details for this catalog number after the run.
    #[arg(long)]
    inspect: Option<u32>,
}

#[derive(Default)]
struct CountingSink {
    placed: u64,
    hidden: u64,
    focused: u64,
    active_len: usize,
}

impl RenderSink for CountingSink {
    fn place(&mut self, _slot: usize, _id: u32, _position: Vector3<f64>, class: PriorityClass) {
        self.placed += 1;
        if class == PriorityClass::Focused {
            self.focused += 1;
        }
    }

    fn hide(&mut self, _slot: usize, _id: u32) {
        self.hidden += 1;
    }

    fn set_active_len(&mut self, len: usize) {
        self.active_len = len;
    }
}

/// Treats the pointer x coordinate as an index into the active set.
struct IndexPicker;

impl Picker for IndexPicker {
    fn pick(&mut self, pointer: Vector2<f64>, active: &[u32]) -> Option<u32> {
        if active.is_empty() || pointer.x < 0.0 {
            return None;
        }
        active.get(pointer.x as usize % active.len()).copied()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(cli.config.as_deref())?;

    let (tx, feed) = ingest::channel();
    match &cli.file {
        Some(path) => {
            ingest::spawn_file_load(path.clone(), tx);
        }
        None => {
            let source = CatalogSource::from_group(&cli.group)
                .ok_or_else(|| EngineError::InvalidConfig(format!("unknown catalog group '{}'", cli.group)))?;
            ingest::spawn_fetch(source, tx);
        }
    }

    let mut engine = Engine::new(config, Sgp4Propagator::new()).with_feed(feed);
    engine.set_query(&cli.query);

    let mut sink = CountingSink::default();
    let mut picker = IndexPicker;
    let start = Instant::now();
    let start_utc = Utc::now();
    let frame = Duration::from_millis(cli.frame_ms);
    let mut focused = None;

    for n in 0..cli.frames {
        let clock = start.elapsed();
        let at = start_utc + chrono::Duration::from_std(clock).unwrap_or_else(|_| chrono::Duration::zero());
        let angle = clock.as_secs_f64() * 0.05;

        let mut input = FrameInput::new(at, clock);
        input.viewpoint = Viewpoint {
            position: Vector3::new(angle.cos(), angle.sin(), 0.3) * cli.view_radius,
            manipulating: false,
        };
        input.pointer = Some(Vector2::new(n as f64, 0.0));
        input.focused = focused;

        let out = engine.tick(&input, &mut sink, &mut picker);
        if let Some(report) = out.catalog_loaded {
            info!(
                "catalog generation {}: {} records ({} duplicates dropped)",
                report.generation, report.loaded, report.duplicates
            );
        }
        if let satcat_engine::HitTest::Evaluated(Some(id)) = out.pipeline.hit_test {
            focused = Some(id);
        }
        if out.ranked_swapped() {
            if let Some(nearest) = out.ranked.nearest() {
                info!(
                    "ranked cycle {}: {} objects, nearest {} at {:.0} km",
                    out.ranked.cycle(),
                    out.ranked.len(),
                    nearest.id,
                    nearest.distance_sq.sqrt()
                );
            }
        }
        if n % 60 == 0 {
            info!(
                "frame {}: cache {}/{} ({} built), {} results, {} active, {} hidden this frame",
                out.frame,
                out.cache.processed,
                out.cache.total,
                out.cache.built,
                out.result_len,
                out.pipeline.active,
                out.pipeline.hidden
            );
        }

        if let Some(rest) = frame.checked_sub(start.elapsed().saturating_sub(clock)) {
            std::thread::sleep(rest);
        }
    }

    info!(
        "done: {} placements ({} focused), {} hides, final working set {}",
        sink.placed, sink.focused, sink.hidden, sink.active_len
    );

    if let Some(id) = cli.inspect {
        match engine.inspect(id, Utc::now()) {
            Some(details) => {
                info!(
                    "{} [{}]: epoch {:?}, class {}, altitude {:?} km, handle {}, near rank {:?}",
                    details.record.name,
                    details.record.id,
                    details.epoch_year,
                    details.orbit_class.map_or("-", |c| c.label()),
                    details.altitude_km.map(|a| a.round()),
                    details.has_handle,
                    details.near_rank
                );
                if let Some(state) = details.state {
                    info!("  position {:?} km, velocity {:?} km/s", state.position, state.velocity);
                }
            }
            None => warn!("{id} is not in the catalog"),
        }
    }
    Ok(())
}
