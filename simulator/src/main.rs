use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use radarcore::cognitive::CognitiveController;
use radarcore::detection::{CfarDetector, ThresholdPolicy, DEFAULT_THRESHOLD_DB};
use radarcore::prelude::{RadarTask, StageReport};
use radarcore::sim::{EchoSynthesizer, SceneConfig, SceneGenerator};
use radarcore::store::RadarStore;
use radarcore::tracking::TrackerMethod;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Cognitive pulse-radar workflow driver")]
struct Args {
    /// Shared SQLite store for all pipeline tables
    #[arg(long, default_value = "traffic_radar.db")]
    db: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Fixed,
    Pfa,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Monopulse,
    Sequential,
    Conical,
}

impl From<MethodArg> for TrackerMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Monopulse => TrackerMethod::Monopulse,
            MethodArg::Sequential => TrackerMethod::Sequential,
            MethodArg::Conical => TrackerMethod::Conical,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Append simulated ground-truth trajectories to TargetData
    GenerateTargets {
        #[arg(long, default_value_t = 2)]
        targets: usize,
        /// Scene duration in seconds
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        /// Sample interval in seconds
        #[arg(long, default_value_t = 0.1)]
        dt: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Rebuild RadarDetections from the accumulated ground truth
    SynthesizeEchoes {
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Run adaptive CFAR over the echo table into Detections_CFAR
    RunCfar {
        #[arg(long, default_value_t = 8)]
        window: usize,
        #[arg(long, default_value_t = 2)]
        guard: usize,
        #[arg(long, value_enum, default_value = "fixed")]
        policy: PolicyArg,
        /// Fallback offset in dB when no adaptive state exists (fixed policy)
        #[arg(long, default_value_t = DEFAULT_THRESHOLD_DB)]
        threshold: f64,
        /// Desired probability of false alarm (pfa policy)
        #[arg(long, default_value_t = 1e-4)]
        pfa: f64,
    },
    /// Run the cognitive feedback loop, appending to RadarConfig
    RunCognitiveCycle {
        #[arg(long, default_value_t = 10)]
        iterations: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Run one angle tracker over the CFAR detections
    RunTracker {
        #[arg(long, value_enum)]
        method: MethodArg,
    },
    /// Run every stage in dependency order
    RunPipeline {
        /// Load stage parameters from a YAML workflow file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn print_report(stage: &str, report: &StageReport) {
    println!("{stage} -> {} rows", report.rows_written);
    if let Some(true) = report.fallback {
        println!("{stage} used the top-K fallback (no CFAR detections)");
    }
    for note in &report.notes {
        println!("{stage}: {note}");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut store = RadarStore::open(&args.db)
        .with_context(|| format!("opening store {}", args.db.display()))?;

    match args.command {
        Command::GenerateTargets {
            targets,
            duration,
            dt,
            seed,
        } => {
            let config = SceneConfig {
                n_targets: targets,
                t_end: duration,
                dt,
                seed,
                ..Default::default()
            };
            let report = SceneGenerator::new(config)
                .run(&mut store)
                .context("generating targets")?;
            print_report("generate-targets", &report);
        }
        Command::SynthesizeEchoes { seed } => {
            let report = EchoSynthesizer::new(seed)
                .run(&mut store)
                .context("synthesizing echoes")?;
            print_report("synthesize-echoes", &report);
        }
        Command::RunCfar {
            window,
            guard,
            policy,
            threshold,
            pfa,
        } => {
            let policy = match policy {
                PolicyArg::Fixed => ThresholdPolicy::FixedOffset {
                    default_db: threshold,
                },
                PolicyArg::Pfa => ThresholdPolicy::PfaDerived { pfa },
            };
            let report = CfarDetector::new(window, guard, policy)
                .run(&mut store)
                .context("running CFAR detection")?;
            print_report("run-cfar", &report);
        }
        Command::RunCognitiveCycle { iterations, seed } => {
            let report = CognitiveController::new(iterations, seed)
                .run(&mut store)
                .context("running cognitive cycles")?;
            print_report("run-cognitive-cycle", &report);
        }
        Command::RunTracker { method } => {
            let method = TrackerMethod::from(method);
            let report = method
                .run(&mut store)
                .with_context(|| format!("running {method} tracker"))?;
            print_report(&format!("run-tracker {method}"), &report);
        }
        Command::RunPipeline { config } => {
            let workflow_config = if let Some(path) = config {
                WorkflowConfig::load(path)?
            } else {
                WorkflowConfig::default()
            };
            let summary = Runner::new(workflow_config)
                .execute(&mut store)
                .context("executing pipeline")?;

            println!(
                "Pipeline run -> targets {}, echoes {}, cycles {}, detections {} (fallback {})",
                summary.targets_appended,
                summary.echoes_written,
                summary.cognitive_cycles,
                summary.detections_written,
                summary.detection_fallback
            );
            for (method, rows) in &summary.tracking_rows {
                println!("tracking {method} -> {rows} rows");
            }

            let report_path = PathBuf::from("tools/data/pipeline_summary.log");
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(report_path)?;
            let line = serde_json::to_string(&summary).context("serializing summary")?;
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
        }
    }

    Ok(())
}
