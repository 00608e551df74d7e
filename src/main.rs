//! Proctor Agent CLI
//!
//! Replays recorded classifier output through the proctoring pipeline,
//! scores stored event logs, and hosts the storage backend.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use proctor_agent::{
    classifier::{FrameClassifier, Recording, ScriptedClassifier},
    clock::{ManualClock, SystemClock},
    core::events::EventRecord,
    score,
    sink::{EventSink, NullSink, QueuedSink},
    transparency::create_shared_log_with_persistence,
    Config, IntegrityReport, Proctor, SessionController, SharedTransparencyLog,
    MONITORING_NOTICE, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "gateway")]
use proctor_agent::{GatewayClient, GatewayConfig};

#[derive(Parser)]
#[command(name = "proctor")]
#[command(version = VERSION)]
#[command(about = "Camera-driven interview integrity monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded session through the detectors and print its report
    Replay {
        /// Recording of per-frame classifier output (JSON)
        recording: PathBuf,

        /// Candidate name for the session
        #[arg(long)]
        candidate: String,

        /// Pace frames on the wall clock instead of virtual time
        #[arg(long)]
        realtime: bool,

        /// Storage backend to mirror events to (requires gateway feature)
        #[arg(long)]
        backend: Option<String>,

        /// Where to write the report JSON
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Score a stored event log
    Score {
        /// JSON array of events as served by the storage backend
        events: PathBuf,

        /// Session duration in seconds
        #[arg(long, default_value = "0")]
        duration: u64,

        /// Candidate name shown in the report
        #[arg(long, default_value = "unknown")]
        candidate: String,
    },

    /// Run the storage backend (requires server feature)
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,
    },

    /// Show configuration
    Config,

    /// Display the notice shown to candidates
    Notice,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("proctor_agent=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            recording,
            candidate,
            realtime,
            backend,
            output,
        } => cmd_replay(&recording, &candidate, realtime, backend, output).await,
        Commands::Score {
            events,
            duration,
            candidate,
        } => cmd_score(&events, duration, &candidate),
        Commands::Serve { port } => cmd_serve(port).await,
        Commands::Config => {
            cmd_config();
            Ok(())
        }
        Commands::Notice => {
            println!("{MONITORING_NOTICE}");
            Ok(())
        }
    }
}

async fn cmd_replay(
    recording_path: &Path,
    candidate: &str,
    realtime: bool,
    backend: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let recording = Recording::load(recording_path)
        .with_context(|| format!("reading recording {}", recording_path.display()))?;

    println!("Proctor Agent v{VERSION}");
    println!();
    println!("Replaying {} frame(s)", recording.frames.len());
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!(
        "  Look-away threshold: {}s",
        config.tracker.look_away.as_secs()
    );
    println!(
        "  Face-absence threshold: {}s",
        config.tracker.face_absence.as_secs()
    );
    println!();

    let stats = create_shared_log_with_persistence(config.data_path.join("transparency.json"));
    let (sink, worker) = open_sink(backend.or_else(|| config.backend_url.clone()), &stats)?;

    let report = if realtime {
        replay_realtime(&config, recording, candidate, sink.clone(), stats.clone()).await?
    } else {
        replay_virtual(&config, recording, candidate, sink.clone(), stats.clone())?
    };

    if let Some((queued, handle)) = worker {
        queued.close();
        if let Err(e) = handle.await {
            eprintln!("Warning: Event sink worker failed: {e}");
        }
    }

    println!();
    println!("{}", report.render(candidate));

    let output = output.unwrap_or_else(|| {
        config
            .export_path
            .join(format!("report-{}.json", Utc::now().timestamp_millis()))
    });
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&output, json).with_context(|| format!("writing {}", output.display()))?;
    println!("Report written to {output:?}");

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }
    println!();
    println!("{}", stats.summary());

    Ok(())
}

/// Feed every frame through the controller on a virtual clock, one tick
/// apart.
fn replay_virtual(
    config: &Config,
    recording: Recording,
    candidate: &str,
    sink: Arc<dyn EventSink>,
    stats: SharedTransparencyLog,
) -> anyhow::Result<IntegrityReport> {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut controller = SessionController::new(config, clock.clone())
        .with_sink(sink)
        .with_stats(stats.clone());
    controller.on_event(|event| println!("{}", event.display_line()));

    let interview_id = controller.start(candidate)?;
    let step = config.tick_step();

    for frame in &recording.frames {
        clock.advance(step);
        stats.record_tick();
        controller.observe(&interview_id, recording.frame_size, frame);
    }

    controller.stop();
    Ok(controller.report()?)
}

/// Drive the sampling loop on the wall clock until the recording runs out
/// or Ctrl+C is pressed.
async fn replay_realtime(
    config: &Config,
    recording: Recording,
    candidate: &str,
    sink: Arc<dyn EventSink>,
    stats: SharedTransparencyLog,
) -> anyhow::Result<IntegrityReport> {
    let backend = Arc::new(ScriptedClassifier::new(recording));
    let controller = SessionController::new(config, Arc::new(SystemClock))
        .with_sink(sink)
        .with_stats(stats);
    let mut proctor = Proctor::new(
        controller,
        FrameClassifier::from_backend(backend.clone()),
        config.tick_interval,
    );
    proctor.on_event(|event| println!("{}", event.display_line()));

    proctor.start_session(candidate).await?;
    println!("Press Ctrl+C to stop");
    println!();

    let mut poll = tokio::time::interval(config.tick_interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick() => {
                if backend.has_run_out() {
                    break;
                }
            }
        }
    }

    proctor.stop_session();
    Ok(proctor.generate_report()?)
}

type SinkWorker = Option<(Arc<QueuedSink>, JoinHandle<()>)>;

#[cfg(feature = "gateway")]
fn open_sink(
    url: Option<String>,
    stats: &SharedTransparencyLog,
) -> anyhow::Result<(Arc<dyn EventSink>, SinkWorker)> {
    let Some(url) = url else {
        let sink: Arc<dyn EventSink> = Arc::new(NullSink);
        return Ok((sink, None));
    };

    let client = GatewayClient::new(GatewayConfig::new(url.as_str()))?;
    println!("  Mirroring events to {url}");
    let (queued, handle) = QueuedSink::spawn(client, Some(stats.clone()));
    let sink: Arc<dyn EventSink> = queued.clone();
    Ok((sink, Some((queued, handle))))
}

#[cfg(not(feature = "gateway"))]
fn open_sink(
    url: Option<String>,
    _stats: &SharedTransparencyLog,
) -> anyhow::Result<(Arc<dyn EventSink>, SinkWorker)> {
    if url.is_some() {
        eprintln!("Warning: backend ignored (gateway feature not enabled at compile time)");
    }
    let sink: Arc<dyn EventSink> = Arc::new(NullSink);
    Ok((sink, None))
}

fn cmd_score(path: &Path, duration: u64, candidate: &str) -> anyhow::Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<EventRecord> = serde_json::from_str(&content)?;

    let mut events = Vec::with_capacity(records.len());
    for record in &records {
        match record.to_event() {
            Some(event) => events.push(event),
            None => eprintln!("Warning: Skipping unrecognized event: {}", record.message),
        }
    }

    let report = score(&events, duration);
    println!("{}", report.render(candidate));
    Ok(())
}

#[cfg(feature = "server")]
async fn cmd_serve(port: u16) -> anyhow::Result<()> {
    use proctor_agent::server::{run, ServerConfig};

    let (addr, shutdown_tx) = run(ServerConfig::new(port)).await?;
    println!("Storage server running on http://{addr}");
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    Ok(())
}

#[cfg(not(feature = "server"))]
async fn cmd_serve(_port: u16) -> anyhow::Result<()> {
    anyhow::bail!("server feature not enabled at compile time")
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
