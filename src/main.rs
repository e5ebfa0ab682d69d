//! Agent entrypoint: tail the audit log, score each tumbling window with the
//! ensemble, persist results for the dashboard. Startup failures (missing
//! model artifacts, broken syscall table) abort with a diagnostic before the
//! loop; steady-state failures are logged and ingestion continues.

use overwatch_agent::{
    config::AgentConfig,
    ensemble::EnsembleClassifier,
    features::{FeatureExtractor, SyscallTable},
    logging::StructuredLogger,
    storage::EventStore,
    tail::LogFollower,
    window::WindowAggregator,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

fn run_loop(
    aggregator: &mut WindowAggregator,
    follower: &mut LogFollower,
    extractor: &FeatureExtractor,
    classifier: &EnsembleClassifier,
    store: &EventStore,
    stop: &AtomicBool,
) {
    while let Some(lines) = aggregator.next_batch(follower, stop) {
        if lines.is_empty() {
            // Quiet window: flushed on schedule, never scored.
            continue;
        }
        let ts = chrono::Utc::now().timestamp_millis();
        let vector = extractor.process_window(&lines, ts);
        let result = match classifier.classify(&vector) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, lines = lines.len(), "window classification failed");
                continue;
            }
        };
        info!(
            verdict = result.verdict.as_str(),
            combined_prob = result.combined_prob,
            syscall_rate = vector.get("syscall_rate").unwrap_or(0.0),
            churn_rate = vector.get("file_churn_rate").unwrap_or(0.0),
            "window scored"
        );
        if let Err(e) = store.record(&result, &vector) {
            warn!(error = %e, "persist failed");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("OVERWATCH_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = AgentConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(audit_log = ?config.audit_log_path, "overwatch agent starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let store_path = config.data_dir.join("events.db");
    let secret = b"device-secret-placeholder"; // In production: from Secure Enclave / Keystore
    let store = EventStore::open(&store_path, secret)?;

    let table = match &config.syscall_table_path {
        Some(path) => match SyscallTable::load(path) {
            Ok(t) => t,
            Err(e) => {
                error!(path = %path.display(), error = %e, "syscall table load failed");
                return Err(e);
            }
        },
        None => SyscallTable::x86_64(),
    };
    info!(arch = %table.arch, version = %table.version, "syscall table ready");

    let classifier = match EnsembleClassifier::load(&config.model_dir, &config.ensemble) {
        Ok(c) => c,
        Err(e) => {
            error!(
                model_dir = ?config.model_dir,
                error = %e,
                "model artifacts unavailable; train and export them first"
            );
            return Err(e);
        }
    };

    let extractor = FeatureExtractor::new(table);
    let mut follower = LogFollower::new(
        &config.audit_log_path,
        Duration::from_millis(config.follow.idle_millis),
    );
    let mut aggregator = WindowAggregator::new(Duration::from_millis(config.window.window_millis));

    static STOP: AtomicBool = AtomicBool::new(false);
    let _ = ctrlc::set_handler(|| {
        STOP.store(true, Ordering::Relaxed);
    });

    info!(
        window_millis = config.window.window_millis,
        "entering detection loop (Ctrl+C to stop)"
    );
    run_loop(
        &mut aggregator,
        &mut follower,
        &extractor,
        &classifier,
        &store,
        &STOP,
    );

    // Partial window is discarded on stop; dropping the follower releases
    // the file handle.
    info!("overwatch agent stopping");
    Ok(())
}
