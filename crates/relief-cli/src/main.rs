//! relief — height scanner command line.
//!
//! Sweeps a grid with the motion stage, samples the laser rangefinder at
//! every point, and writes the sample table plus the triangulated surface.
//! Any failure is terminal: report, exit non-zero, rerun.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use relief_core::config::ReliefConfig;
use relief_devices::gatt::LinkConfig;
use relief_devices::rangefinder::Rangefinder;
use relief_devices::sim::SimBench;
use relief_scan::export::{write_mesh, write_table};
use relief_scan::{build_mesh, run_scan, ScanBounds};

// ── Options ───────────────────────────────────────────────────────────────────

struct ScanOpts {
    simulate: bool,
    table: Option<PathBuf>,
    mesh: Option<PathBuf>,
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_scan(config: ReliefConfig, opts: ScanOpts) -> Result<()> {
    let bounds = ScanBounds {
        x_min: config.scan.x_min,
        x_max: config.scan.x_max,
        y_min: config.scan.y_min,
        y_max: config.scan.y_max,
        step: config.scan.step,
    };
    bounds.validate().context("invalid scan bounds")?;

    if !opts.simulate {
        // The stage client is ready to go over HTTP, but the rangefinder
        // link needs a platform GATT backend behind
        // relief_devices::gatt::GattTransport, and none is linked into this
        // binary.
        bail!(
            "no GATT transport backend is linked into this build; \
             provide one for your platform or run with --simulate"
        );
    }

    let bench = SimBench::new(demo_surface);
    let mut stage = bench.stage();
    let link = LinkConfig {
        device_name: config.rangefinder.device_name.clone(),
        service_uuid: config.rangefinder.service_uuid.clone(),
        characteristic_uuid: config.rangefinder.characteristic_uuid.clone(),
    };
    let mut rangefinder = Rangefinder::new(bench.transport(), link)
        .with_response_timeout(Duration::from_secs(config.rangefinder.response_timeout_secs));

    rangefinder
        .connect()
        .await
        .context("rangefinder connection failed")?;
    rangefinder
        .turn_laser_on()
        .await
        .context("turning the laser on failed")?;

    let scan = run_scan(&mut rangefinder, &mut stage, bounds, config.scan.feed_rate).await;
    rangefinder.disconnect();
    let grid = scan.context("scan aborted")?;

    let table_path = opts.table.unwrap_or(config.export.table_path);
    let mesh_path = opts.mesh.unwrap_or(config.export.mesh_path);

    let triangles = build_mesh(&grid);
    write_table(&grid, &table_path)
        .with_context(|| format!("writing {}", table_path.display()))?;
    write_mesh(&triangles, &mesh_path)
        .with_context(|| format!("writing {}", mesh_path.display()))?;

    println!(
        "Scanned {} points, wrote {} and {} ({} triangles).",
        grid.len(),
        table_path.display(),
        mesh_path.display(),
        triangles.len()
    );
    Ok(())
}

fn cmd_print_config(config: &ReliefConfig) -> Result<()> {
    let text = toml::to_string_pretty(config).context("failed to serialize config")?;
    print!("{text}");
    Ok(())
}

/// Surface used by `--simulate`: a gentle double ripple under the scan head.
fn demo_surface(x: f64, y: f64) -> f64 {
    50.0 - 2.0 * ((x / 15.0).sin() + (y / 15.0).sin())
}

fn print_usage() {
    println!("Usage: relief [options] <command>");
    println!();
    println!("Commands:");
    println!("  scan           Run a grid scan and write both exports");
    println!("  print-config   Show the effective configuration");
    println!();
    println!("Options:");
    println!("  --config <path>   Config file (default: $RELIEF_CONFIG or XDG path)");
    println!("  --simulate        Run against simulated devices");
    println!("  --table <path>    Sample table destination (default from config)");
    println!("  --mesh <path>     Surface destination (default from config)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut opts = ScanOpts {
        simulate: false,
        table: None,
        mesh: None,
    };
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).context("--config requires a path")?.into());
            }
            "--table" => {
                i += 1;
                opts.table = Some(args.get(i).context("--table requires a path")?.into());
            }
            "--mesh" => {
                i += 1;
                opts.mesh = Some(args.get(i).context("--mesh requires a path")?.into());
            }
            "--simulate" => opts.simulate = true,
            other => remaining.push(other),
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => ReliefConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ReliefConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            ReliefConfig::default()
        }),
    };

    match remaining.as_slice() {
        ["scan"] => cmd_scan(config, opts).await,
        ["print-config"] => cmd_print_config(&config),
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
