use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, Utc};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use aeris_events::EventRecord;
use aeris_logging::{JsonlLogger, LogLevel, LogRecord};
use aeris_risk::{
    telemetry::EventSink,
    training::{
        artifacts::ModelArtifacts,
        dataset::{TrainingSet, EXPLOSION_PARAMETERS},
        TrainingConfig, TrainingPipeline,
    },
    MonitoringRuntime, RiskTelemetry, SensorReading,
};

#[derive(Parser, Debug)]
#[command(name = "riskctl", version, about = "AERIS facility risk scoring toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trains model artifacts from a historical dataset.
    Train(TrainArgs),
    /// Scores one reading JSON file against trained artifacts.
    Score(ScoreArgs),
    /// Generates synthetic readings and scores them.
    Simulate(SimulateArgs),
    /// Lists recent training jobs.
    Jobs {
        /// Number of entries to display.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "logs/jobs/index.jsonl")]
        manifest: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct TrainArgs {
    /// JSONL dataset of historical records; synthetic data when omitted.
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Number of synthetic records when no dataset is given.
    #[arg(long, default_value_t = 500)]
    synthetic_samples: usize,
    #[arg(long, default_value = "models")]
    out: PathBuf,
    #[arg(long, default_value_t = 200)]
    epochs: usize,
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f32,
    #[arg(long, default_value_t = 32)]
    hidden_dim: usize,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    #[arg(long, default_value = "logs/jobs/index.jsonl")]
    manifest: PathBuf,
    #[arg(long)]
    event_log: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ScoreArgs {
    #[arg(long, default_value = "models/artifacts.json")]
    artifacts: PathBuf,
    /// Reading JSON file matching the sensor input schema.
    reading: PathBuf,
    /// Optional JSON object of limit overrides merged into the table.
    #[arg(long)]
    thresholds: Option<PathBuf>,
    /// Pretty-print the verdict.
    #[arg(long)]
    pretty: bool,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    #[arg(long, default_value = "models/artifacts.json")]
    artifacts: PathBuf,
    #[arg(long, default_value_t = 5)]
    count: usize,
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct JobManifestEntry {
    job_id: String,
    submitted_at: DateTime<Utc>,
    dataset: Option<PathBuf>,
    out: PathBuf,
    epochs: usize,
    log_path: PathBuf,
    status: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Train(args) => handle_train(&args),
        Commands::Score(args) => handle_score(&args),
        Commands::Simulate(args) => handle_simulate(&args),
        Commands::Jobs { limit, manifest } => {
            for entry in read_manifest(&manifest)?.into_iter().rev().take(limit) {
                println!(
                    "{} | {} | {} | epochs={} | {}",
                    entry.job_id,
                    entry.status,
                    entry.submitted_at,
                    entry.epochs,
                    entry.out.display()
                );
            }
            Ok(())
        }
    }
}

fn handle_train(args: &TrainArgs) -> Result<()> {
    let log_path = compute_log_path(&args.log_dir)?;
    let entry = JobManifestEntry {
        job_id: format!("train-{}", Uuid::new_v4()),
        submitted_at: Utc::now(),
        dataset: args.dataset.clone(),
        out: args.out.clone(),
        epochs: args.epochs,
        log_path: log_path.clone(),
        status: "running".into(),
    };
    append_manifest(&args.manifest, &entry)?;
    log_job_event(
        &entry.log_path,
        LogLevel::Info,
        "job started",
        json!({ "job_id": entry.job_id, "epochs": entry.epochs }),
    )?;

    let mut telemetry = RiskTelemetry::builder().with_log_file(&log_path)?;
    if let Some(event_log) = &args.event_log {
        telemetry = telemetry.with_event_file(event_log)?;
    }
    let telemetry = telemetry.build();

    let set = match &args.dataset {
        Some(path) => TrainingSet::load_jsonl(path)
            .with_context(|| format!("loading dataset {}", path.display()))?,
        None => TrainingSet::synthetic(args.synthetic_samples, args.seed),
    };
    let config = TrainingConfig {
        hidden_dim: args.hidden_dim,
        epochs: args.epochs,
        learning_rate: args.learning_rate,
        seed: args.seed,
        ..TrainingConfig::default()
    };
    let pipeline = TrainingPipeline::new(config);

    match pipeline.run_with_telemetry(&set, &args.out, Some(&telemetry)) {
        Ok(report) => {
            update_status(&args.manifest, &entry.job_id, "completed")?;
            log_job_event(
                &entry.log_path,
                LogLevel::Info,
                "job completed",
                json!({ "job_id": entry.job_id, "train_loss": report.train_loss }),
            )?;
            publish_job_event(args.event_log.as_deref(), "training.job_completed", &entry)?;
            println!("{}", report.summary());
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            update_status(&args.manifest, &entry.job_id, "failed")?;
            log_job_event(
                &entry.log_path,
                LogLevel::Error,
                "job failed",
                json!({ "job_id": entry.job_id, "error": err.to_string() }),
            )?;
            publish_job_event(args.event_log.as_deref(), "training.job_failed", &entry)?;
            Err(err)
        }
    }
}

fn handle_score(args: &ScoreArgs) -> Result<()> {
    let artifacts = ModelArtifacts::load(&args.artifacts)
        .with_context(|| format!("loading artifacts {}", args.artifacts.display()))?;
    let runtime = MonitoringRuntime::new(artifacts);
    if let Some(path) = &args.thresholds {
        let overrides: IndexMap<String, f32> = serde_json::from_str(
            &fs::read_to_string(path)
                .with_context(|| format!("reading thresholds {}", path.display()))?,
        )?;
        runtime.thresholds().merge_update(overrides)?;
    }
    let reading: SensorReading = serde_json::from_str(
        &fs::read_to_string(&args.reading)
            .with_context(|| format!("reading {}", args.reading.display()))?,
    )?;
    let verdict = runtime.score(&reading)?;
    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        println!("{}", serde_json::to_string(&verdict)?);
    }
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<()> {
    let artifacts = ModelArtifacts::load(&args.artifacts)
        .with_context(|| format!("loading artifacts {}", args.artifacts.display()))?;
    let runtime = MonitoringRuntime::new(artifacts);
    let set = TrainingSet::synthetic(args.count, args.seed);
    for record in &set.records {
        let reading = reading_from_values(&record.city, &record.values);
        let verdict = runtime.score(&reading)?;
        println!(
            "{} | {} | alerts={} findings={} explosion_risk={:.3}",
            record.city,
            verdict.risk_status,
            verdict.alerts.len(),
            verdict.explosion_risks.len(),
            verdict.predictions.explosion_risk
        );
    }
    Ok(())
}

/// Splits a flat parameter map into the reading input schema.
fn reading_from_values(city: &str, values: &IndexMap<String, f32>) -> SensorReading {
    let mut pollutants = IndexMap::new();
    let mut explosion_parameters = IndexMap::new();
    for (name, value) in values {
        if EXPLOSION_PARAMETERS.contains(&name.as_str()) {
            explosion_parameters.insert(name.clone(), *value);
        } else {
            pollutants.insert(name.clone(), *value);
        }
    }
    SensorReading {
        city: city.to_string(),
        pollutants,
        explosion_parameters,
    }
}

fn compute_log_path(base: &Path) -> Result<PathBuf> {
    let now = Local::now();
    let dir = base
        .join(format!("{:04}", now.year()))
        .join(format!("{:02}", now.month()))
        .join(format!("{:02}", now.day()));
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!(
        "train-{}.log.jsonl",
        Utc::now().format("%Y%m%d-%H%M%S")
    )))
}

fn append_manifest(path: &Path, entry: &JobManifestEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening manifest {}", path.display()))?;
    serde_json::to_writer(&mut file, entry)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn read_manifest(path: &Path) -> Result<Vec<JobManifestEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}

fn update_status(path: &Path, job_id: &str, status: &str) -> Result<()> {
    let mut entries = read_manifest(path)?;
    let mut changed = false;
    for entry in &mut entries {
        if entry.job_id == job_id {
            entry.status = status.to_string();
            changed = true;
        }
    }
    if !changed {
        return Ok(());
    }
    let mut file = File::create(path)?;
    for entry in entries {
        serde_json::to_writer(&mut file, &entry)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn log_job_event(
    path: &Path,
    level: LogLevel,
    message: &str,
    fields: serde_json::Value,
) -> Result<()> {
    let logger = JsonlLogger::create(path)?;
    logger.log(&LogRecord::new("riskctl", level, message).with_fields(fields))
}

fn publish_job_event(
    event_log: Option<&Path>,
    event_type: &str,
    entry: &JobManifestEntry,
) -> Result<()> {
    if let Some(path) = event_log {
        let sink = EventSink::new(path)?;
        sink.publish(EventRecord::new(
            "riskctl",
            event_type,
            json!({ "job_id": entry.job_id, "out": entry.out, "epochs": entry.epochs }),
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_round_trips_and_updates() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("jobs/index.jsonl");
        let entry = JobManifestEntry {
            job_id: "train-test".into(),
            submitted_at: Utc::now(),
            dataset: None,
            out: PathBuf::from("models"),
            epochs: 10,
            log_path: dir.path().join("job.log"),
            status: "running".into(),
        };
        append_manifest(&manifest, &entry).unwrap();
        update_status(&manifest, "train-test", "completed").unwrap();
        let entries = read_manifest(&manifest).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "completed");
    }

    #[test]
    fn readings_split_by_parameter_family() {
        let values = IndexMap::from([
            ("Carbon Monoxide".to_string(), 2.0f32),
            ("Methane".to_string(), 4500.0),
        ]);
        let reading = reading_from_values("Chicago", &values);
        assert!(reading.pollutants.contains_key("Carbon Monoxide"));
        assert!(reading.explosion_parameters.contains_key("Methane"));
    }
}
