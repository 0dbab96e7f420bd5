//! Offline path tracer CLI.
//!
//! Grounded on `original_source/app/trace_scene.cpp`'s flag set and render
//! loop: render-order dispatch, a signal-driven out-of-band flush, and a
//! final `writeAll` once the render completes.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use core_rt::integrator::TraceConfig;
use core_rt::render::{render, AmbientOcclusionSettings, RenderOrder, RenderSettings, FLUSH_REQUESTED};

/// Offline, physically based Monte Carlo path tracer.
#[derive(Parser, Debug)]
#[command(name = "trace_scene", version, about)]
struct Cli {
    /// Scene description file (ron format).
    scene: PathBuf,

    /// Directory AOV images are written to.
    #[arg(short = 'O', long = "output", default_value = "out")]
    output: PathBuf,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Seconds between automatic AOV flushes; 0 disables periodic flush.
    #[arg(short = 'f', long = "flushtimeout", default_value_t = 0)]
    flush_timeout: u64,

    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,

    #[arg(short = 's', long = "spp", default_value_t = 1)]
    spp: u32,

    #[arg(short = 'e', long = "epsilon", default_value_t = 1e-4)]
    epsilon: f32,

    #[arg(short = 'd', long = "maxdepth", default_value_t = 10)]
    max_depth: u32,

    /// Sensor/jitter scale; reserved for depth-of-field tuning.
    #[arg(short = 'p', long = "sensorscale", default_value_t = 1.0)]
    sensor_scale: f32,

    /// Russian-roulette termination probability, in [0,1].
    #[arg(short = 'r', long = "rr", default_value_t = 0.1)]
    rr: f32,

    /// Disable stochastic Fresnel splitting for refractive interfaces.
    #[arg(short = 'R', long = "nomontecarlorefraction")]
    no_monte_carlo_refraction: bool,

    #[arg(short = 'o', long = "renderorder", default_value = "default")]
    render_order: String,

    /// Disable cosine-weighted importance sampling for diffuse bounces.
    #[arg(short = 'C', long = "nosamplecosine")]
    no_sample_cosine: bool,

    /// Disable Phong-lobe importance sampling for glossy bounces.
    #[arg(short = 'X', long = "nosamplespecular")]
    no_sample_specular: bool,

    /// Compute the ambient occlusion AOV.
    #[arg(short = 'a', long = "ao")]
    ao: bool,

    /// Use cosine-weighted hemisphere sampling for ambient occlusion.
    #[arg(short = 'c', long = "aocosine")]
    ao_cosine: bool,

    #[arg(short = 'S', long = "aosamples", default_value_t = 10)]
    ao_samples: u32,

    #[arg(long = "seed", default_value_t = 1)]
    seed: u64,

    /// Overrides the scene's environment map with a lat/lon image (PNG or
    /// HDR), imported outside the core as an out-of-core collaborator
    /// (spec.md §1).
    #[arg(long = "envmap")]
    env_map: Option<PathBuf>,

    /// Scale factor applied to the overriding environment map's radiance.
    #[arg(long = "envmapscale", default_value_t = 1.0)]
    env_map_scale: f32,
}

/// Decodes a lat/lon environment image into a [`core_rt::envmap::EnvironmentMap`].
/// Decoding itself (PNG/HDR) is the CLI's job, not the core's (spec.md §1).
fn load_env_map(path: &std::path::Path, scale: f32) -> anyhow::Result<core_rt::envmap::EnvironmentMap> {
    let img = image::open(path)?.into_rgb32f();
    let (width, height) = (img.width() as usize, img.height() as usize);
    let mut data = Vec::with_capacity(width * height * 3);
    for pixel in img.pixels() {
        data.extend_from_slice(&pixel.0);
    }
    let texture = core_rt::texture::Texture::new(width, height, 3, core_rt::texture::WrapMode::Repeat, data);
    let map = core_rt::envmap::LatLonEnvironmentMap::build(texture, width, height, scale);
    Ok(core_rt::envmap::EnvironmentMap::LatLon(map))
}

fn parse_render_order(raw: &str) -> anyhow::Result<RenderOrder> {
    match raw {
        "default" | "tiled" => Ok(RenderOrder::Tiled),
        "raster" => Ok(RenderOrder::Raster),
        "progressive" => Ok(RenderOrder::Progressive),
        other => anyhow::bail!("unknown render order '{other}' (expected raster, tiled, or progressive)"),
    }
}

/// Spawns the periodic flush timer backing `--flushtimeout`. Grounded on
/// `app/trace_scene.cpp`'s `alarm(flushTimeout)` re-arming on every
/// `SIGALRM`; Rust has no portable `alarm(2)`, so a sleeping background
/// thread drives the same flag the signal handlers set (SPEC_FULL.md
/// §FULL-4.10 "non-Unix targets" fallback, used here unconditionally for
/// portability).
fn spawn_flush_timer(period: std::time::Duration) {
    std::thread::spawn(move || loop {
        std::thread::sleep(period);
        FLUSH_REQUESTED.store(true, Ordering::SeqCst);
    });
}

fn install_signal_handlers() -> anyhow::Result<()> {
    // SIGUSR1/SIGALRM request an out-of-band AOV flush at the next
    // convenient point; SIGFPE is only logged, matching
    // `app/trace_scene.cpp`'s handler (floating point traps are not fatal
    // to this renderer: NaN/Inf samples are warned about and accumulated
    // anyway, never asserted on).
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGUSR1, || {
            FLUSH_REQUESTED.store(true, Ordering::SeqCst);
        })?;
        signal_hook::low_level::register(signal_hook::consts::SIGALRM, || {
            FLUSH_REQUESTED.store(true, Ordering::SeqCst);
        })?;
        signal_hook::low_level::register(signal_hook::consts::SIGFPE, || {
            log::warn!("SIGFPE received; continuing without flushing");
        })?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    install_signal_handlers()?;

    let render_order = parse_render_order(&cli.render_order)?;
    if cli.flush_timeout > 0 {
        spawn_flush_timer(std::time::Duration::from_secs(cli.flush_timeout));
    }

    let mut scene = core_rt::scene_file::load(&cli.scene)?;
    if cli.sensor_scale != 1.0 {
        scene.sensor = scene.sensor.scaled(cli.sensor_scale);
    }
    if let Some(path) = &cli.env_map {
        scene.environment_map = load_env_map(path, cli.env_map_scale)?;
    }

    let settings = RenderSettings {
        samples_per_pixel: cli.spp,
        threads: cli.threads,
        order: render_order,
        trace: TraceConfig {
            max_depth: cli.max_depth,
            epsilon: cli.epsilon,
            rr_termination_chance: cli.rr,
            rr_start_depth: 3,
            monte_carlo_refraction: !cli.no_monte_carlo_refraction,
            sample_cosine: !cli.no_sample_cosine,
            sample_specular: !cli.no_sample_specular,
        },
        ambient_occlusion: cli.ao.then_some(AmbientOcclusionSettings {
            samples: cli.ao_samples,
            cosine_weighted: cli.ao_cosine,
        }),
        seed: cli.seed,
    };

    log::info!(
        "rendering {}x{} at {} spp with {} threads",
        scene.sensor.pixel_width,
        scene.sensor.pixel_height,
        settings.samples_per_pixel,
        settings.threads
    );

    let artifacts = render(&scene, &settings);
    artifacts.write_all(&cli.output, "trace_")?;

    log::info!("wrote AOVs to {}", cli.output.display());
    Ok(())
}
