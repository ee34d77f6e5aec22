//! Digitizer daemon CLI
//!
//! Runs the processing core over a synthetic touch and stylus session,
//! logging contacts and stylus samples or collecting calibration data.

use clap::Parser;
use digitizer_core::{
    app::{EventSink, FrameProcessor, LogSink, Runner, RunnerError},
    calibrate::CalibrationSink,
    config::FileConfig,
    metrics::{MetricsRegistry, MetricsSnapshot},
    source::SyntheticSource,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Events between metrics updates.
const METRICS_INTERVAL: u64 = 100;

#[derive(Debug, Parser)]
#[command(name = "digitizerd", version, about = "Touch and stylus processing daemon")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of events to process (0 runs until interrupted)
    #[arg(short, long)]
    frames: Option<u64>,

    /// Collect contact sizes instead of reporting contacts
    #[arg(long)]
    calibrate: bool,

    /// Port for the Prometheus endpoint (0 disables it)
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Digitizer core v{}", digitizer_core::VERSION);

    let mut file = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(frames) = args.frames {
        file.runner.event_count = frames;
    }
    if let Some(port) = args.metrics_port {
        file.metrics.port = port;
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            warn!("Failed to install signal handler: {}", e);
        }
    }

    let result = if args.calibrate {
        let diagonal = file.session().diagonal();
        run(&file, CalibrationSink::new(diagonal), &stop).map(|processor| {
            match processor.sink().summary() {
                Some(summary) => {
                    println!("{}", summary);
                    let touch = summary.suggest(&file.touch);
                    println!(
                        "Suggested: size_min = {}, size_max = {}, aspect_max = {}",
                        touch.size_min, touch.size_max, touch.aspect_max
                    );
                }
                None => println!("No stable contacts recorded"),
            }
        })
    } else {
        run(&file, LogSink, &stop).map(|_| ())
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run<S: EventSink>(
    file: &FileConfig,
    sink: S,
    stop: &AtomicBool,
) -> Result<FrameProcessor<S>, RunnerError> {
    let session = file.session();
    let source = SyntheticSource::new(session.stylus.default_columns, session.stylus.default_rows);
    let runner = Runner::new(session, file.runner.clone(), source);

    let registry = match MetricsRegistry::new() {
        Ok(registry) => Some(registry),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    #[cfg(feature = "metrics")]
    if file.metrics.port != 0 {
        if let Some(registry) = registry {
            let state = serve_metrics(file.metrics.port, registry);
            let mut seen = 0u64;
            return runner.run_with(sink, stop, |processor| {
                seen += 1;
                if seen % METRICS_INTERVAL == 0 {
                    state
                        .blocking_write()
                        .update(&MetricsSnapshot::from_stats(processor.stats()));
                }
            });
        }
        return runner.run(sink, stop);
    }

    let mut seen = 0u64;
    let processor = runner.run_with(sink, stop, |processor| {
        seen += 1;
        if seen % METRICS_INTERVAL == 0 {
            if let Some(registry) = &registry {
                registry.update(&MetricsSnapshot::from_stats(processor.stats()));
            }
        }
    })?;

    if let Some(registry) = &registry {
        registry.update(&MetricsSnapshot::from_stats(processor.stats()));
        if let Ok(text) = registry.encode() {
            tracing::debug!("Final metrics:\n{}", text);
        }
    }
    Ok(processor)
}

#[cfg(feature = "metrics")]
fn serve_metrics(
    port: u16,
    registry: MetricsRegistry,
) -> Arc<tokio::sync::RwLock<digitizer_core::metrics::MetricsState>> {
    use digitizer_core::metrics::{MetricsServer, MetricsServerConfig};

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Failed to start metrics runtime: {}", e);
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });

    state
}
