//! Integration tests: config load, feature extraction scenarios, voting
//! policy, schema guard, window aggregation, store roundtrip.

use overwatch_agent::{
    config::{AgentConfig, EnsembleConfig},
    ensemble::{ClassificationResult, EnsembleClassifier, ModelVotes, Verdict, COMBINED_WEIGHTS},
    features::{AuditRecord, FeatureExtractor, SyscallTable, FEATURE_NAMES},
    model::ModelSchema,
    storage::EventStore,
    tail::LineSource,
    window::WindowAggregator,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(SyscallTable::x86_64())
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn votes(boost: bool, forest: bool, anomaly: bool) -> ModelVotes {
    ModelVotes {
        boost_prob: 0.9,
        boost_label: boost,
        forest_prob: 0.2,
        forest_label: forest,
        anomaly_score: -0.1,
        anomaly_flag: anomaly,
    }
}

struct Scripted(VecDeque<String>);

impl Scripted {
    fn new(raw: &[&str]) -> Self {
        Scripted(raw.iter().map(|s| s.to_string()).collect())
    }
}

impl LineSource for Scripted {
    fn poll(&mut self) -> Option<String> {
        self.0.pop_front()
    }
}

#[test]
fn config_load_default() {
    let c = AgentConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.window.window_millis, 1000);
    assert_eq!(c.follow.idle_millis, 100);
    assert_eq!(c.ensemble.vote_weight_boost, 1.5);
    assert_eq!(c.ensemble.vote_weight_forest, 1.0);
}

#[test]
fn syscall_table_categories() {
    use overwatch_agent::features::SyscallCategory;
    let t = SyscallTable::x86_64();
    for nr in [2, 257, 85] {
        assert_eq!(t.category(nr), Some(SyscallCategory::Open));
    }
    for nr in [87, 263, 84] {
        assert_eq!(t.category(nr), Some(SyscallCategory::Unlink));
    }
    for nr in [56, 57, 58] {
        assert_eq!(t.category(nr), Some(SyscallCategory::Clone));
    }
    assert_eq!(t.category(59), Some(SyscallCategory::Exec));
    assert_eq!(t.category(41), None);
}

#[test]
fn parse_line_shapes() {
    let ex = extractor();
    assert_eq!(
        ex.parse_line(
            "type=SYSCALL msg=audit(1700000000.123:42): arch=c000003e syscall=59 success=yes exit=0"
        ),
        AuditRecord::Syscall {
            number: 59,
            success: true
        }
    );
    assert_eq!(
        ex.parse_line(
            "type=SYSCALL msg=audit(1700000000.124:43): arch=c000003e syscall=2 success=no exit=-13"
        ),
        AuditRecord::Syscall {
            number: 2,
            success: false
        }
    );
    assert_eq!(
        ex.parse_line(r#"type=PATH msg=audit(1700000000.125:44): item=0 name="/etc/passwd""#),
        AuditRecord::PathAccess {
            path: "/etc/passwd".to_string()
        }
    );
    assert_eq!(ex.parse_line("not an audit line"), AuditRecord::Other);
}

#[test]
fn window_open_heavy_scenario() {
    let batch = lines(&[
        "type=SYSCALL msg=audit(100.1:1): syscall=2 success=yes exit=3",
        "type=SYSCALL msg=audit(100.2:2): syscall=2 success=yes exit=4",
        "type=SYSCALL msg=audit(100.3:3): syscall=87 success=yes exit=0",
    ]);
    let v = extractor().process_window(&batch, 0);
    assert_eq!(v.get("syscall_rate"), Some(3.0));
    assert_eq!(v.get("open_unlink_ratio"), Some(2.0));
    assert_eq!(v.get("failed_syscall_ratio"), Some(0.0));
    assert_eq!(v.get("file_churn_rate"), Some(1.0));
    assert_eq!(v.get("process_spawn_rate"), Some(0.0));
}

#[test]
fn window_all_failed_scenario() {
    let batch: Vec<String> = (0..5)
        .map(|i| format!("type=SYSCALL msg=audit(200.{i}:{i}): syscall=41 success=no exit=-13"))
        .collect();
    let v = extractor().process_window(&batch, 0);
    assert_eq!(v.get("syscall_rate"), Some(5.0));
    assert_eq!(v.get("failed_syscall_ratio"), Some(1.0));
    assert_eq!(v.get("process_spawn_rate"), Some(0.0));
    assert_eq!(v.get("open_unlink_ratio"), Some(0.0));
}

#[test]
fn unparseable_lines_contribute_nothing() {
    let batch = lines(&[
        "",
        "completely unrelated text",
        r#"type=CWD msg=audit(1:1): cwd="/root""#,
    ]);
    let v = extractor().process_window(&batch, 0);
    assert_eq!(v.get("syscall_rate"), Some(0.0));
    assert_eq!(v.get("unique_files_accessed"), Some(0.0));
    assert_eq!(v.get("failed_syscall_ratio"), Some(0.0));
}

#[test]
fn duplicate_paths_count_once() {
    let batch = lines(&[
        r#"type=PATH msg=audit(1:1): item=0 name="/tmp/a""#,
        r#"type=PATH msg=audit(2:2): item=0 name="/tmp/a""#,
        r#"type=PATH msg=audit(3:3): item=0 name="/tmp/b""#,
    ]);
    let v = extractor().process_window(&batch, 0);
    assert_eq!(v.get("unique_files_accessed"), Some(2.0));
}

#[test]
fn ratios_stay_bounded() {
    let ex = extractor();
    let windows = [
        lines(&["type=SYSCALL msg=audit(1:1): syscall=2 success=yes exit=3"]),
        lines(&["type=SYSCALL msg=audit(1:1): syscall=2 success=no exit=-13"]),
        lines(&[
            "type=SYSCALL msg=audit(1:1): syscall=2 success=yes exit=3",
            "type=SYSCALL msg=audit(1:2): syscall=87 success=no exit=-1",
        ]),
        Vec::new(),
    ];
    for batch in &windows {
        let v = ex.process_window(batch, 0);
        let failed = v.get("failed_syscall_ratio").unwrap();
        assert!((0.0..=1.0).contains(&failed));
        assert!(v.get("open_unlink_ratio").unwrap() >= 0.0);
    }
}

#[test]
fn feature_schema_order_is_canonical() {
    let v = extractor().process_window(&[], 0);
    let expected: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
    assert_eq!(v.names, expected);
    assert_eq!(v.values.len(), v.names.len());
}

#[test]
fn combined_weights_sum_to_one() {
    let sum: f32 = COMBINED_WEIGHTS.iter().sum();
    assert!((sum - 1.0).abs() < f32::EPSILON);
}

#[test]
fn majority_vote_all_combinations() {
    for mask in 0..8u8 {
        let boost = mask & 1 != 0;
        let forest = mask & 2 != 0;
        let anomaly = mask & 4 != 0;
        let r = ClassificationResult::combine(0, votes(boost, forest, anomaly), (1.5, 1.0));
        let expected = (boost as u8 + forest as u8 + anomaly as u8) >= 2;
        assert_eq!(
            r.verdict == Verdict::Malicious,
            expected,
            "boost={boost} forest={forest} anomaly={anomaly}"
        );
    }
}

#[test]
fn soft_vote_weighted_average() {
    let r = ClassificationResult::combine(
        0,
        ModelVotes {
            boost_prob: 0.8,
            boost_label: true,
            forest_prob: 0.3,
            forest_label: false,
            anomaly_score: 0.0,
            anomaly_flag: false,
        },
        (1.5, 1.0),
    );
    let expected_vote = (0.8 * 1.5 + 0.3 * 1.0) / 2.5;
    assert!((r.vote_prob - expected_vote).abs() < 1e-6);
    let expected_combined = 0.4 * 0.8 + 0.3 * 0.3 + 0.3 * expected_vote;
    assert!((r.combined_prob - expected_combined).abs() < 1e-6);
}

#[test]
fn verdict_independent_of_combined_prob() {
    // One positive label out of three: benign verdict despite a high
    // combined probability. Both outputs are exposed and may disagree.
    let r = ClassificationResult::combine(
        0,
        ModelVotes {
            boost_prob: 0.99,
            boost_label: true,
            forest_prob: 0.97,
            forest_label: false,
            anomaly_score: 0.0,
            anomaly_flag: false,
        },
        (1.5, 1.0),
    );
    assert_eq!(r.verdict, Verdict::Benign);
    assert!(r.combined_prob > 0.9);
}

#[test]
fn combination_is_deterministic() {
    let v = votes(true, false, true);
    let a = ClassificationResult::combine(7, v, (1.5, 1.0));
    let b = ClassificationResult::combine(7, v, (1.5, 1.0));
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn schema_guard_rejects_mismatches() {
    let schema = ModelSchema {
        feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
    };
    let good: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
    assert!(schema.check(&good).is_ok());

    let mut reordered = good.clone();
    reordered.swap(0, 1);
    assert!(schema.check(&reordered).is_err());

    let mut renamed = good.clone();
    renamed[5] = "churn".to_string();
    assert!(schema.check(&renamed).is_err());

    assert!(schema.check(&good[..3].to_vec()).is_err());
}

#[test]
fn missing_artifacts_fail_load() {
    let dir = tempfile::tempdir().unwrap();
    assert!(EnsembleClassifier::load(dir.path(), &EnsembleConfig::default()).is_err());
}

#[test]
fn schema_alone_is_not_enough_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let schema = serde_json::json!({ "feature_names": FEATURE_NAMES });
    std::fs::write(dir.path().join("schema.json"), schema.to_string()).unwrap();
    assert!(EnsembleClassifier::load(dir.path(), &EnsembleConfig::default()).is_err());
}

#[test]
fn quiet_window_flushes_empty() {
    let mut agg = WindowAggregator::new(Duration::from_millis(20));
    let mut src = Scripted::new(&[]);
    let stop = AtomicBool::new(false);
    let batch = agg.next_batch(&mut src, &stop).unwrap();
    assert!(batch.is_empty());
}

#[test]
fn window_collects_lines_then_resets() {
    let mut agg = WindowAggregator::new(Duration::from_millis(20));
    let mut src = Scripted::new(&["a", "b"]);
    let stop = AtomicBool::new(false);
    let first = agg.next_batch(&mut src, &stop).unwrap();
    assert_eq!(first, vec!["a".to_string(), "b".to_string()]);
    let second = agg.next_batch(&mut src, &stop).unwrap();
    assert!(second.is_empty(), "buffer must reset between windows");
}

#[test]
fn stop_discards_partial_window() {
    let mut agg = WindowAggregator::new(Duration::from_secs(3600));
    let mut src = Scripted::new(&["pending"]);
    let stop = AtomicBool::new(true);
    assert!(agg.next_batch(&mut src, &stop).is_none());
}

#[test]
fn window_log_event_serializes_to_one_json_line() {
    use overwatch_agent::logging::{StructuredLogger, WindowLogEvent};
    let event = WindowLogEvent {
        ts: "2026-08-06T00:00:00Z".to_string(),
        level: "info",
        target: "overwatch_agent",
        message: "window scored",
        verdict: Some("malicious"),
        combined_prob: Some(0.87),
        syscall_rate: Some(412.0),
        churn_rate: Some(35.0),
        error: None,
    };
    let mut out = Vec::new();
    StructuredLogger::emit_json(&event, &mut out);
    let line = String::from_utf8(out).unwrap();
    assert_eq!(line.matches('\n').count(), 1);
    let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(parsed["verdict"], "malicious");
    assert!(parsed.get("error").is_none(), "None fields are omitted");
}

#[test]
fn store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = EventStore::open(&dir.path().join("events.db"), b"test-secret").unwrap();
    let batch = lines(&[
        "type=SYSCALL msg=audit(1:1): syscall=87 success=yes exit=0",
        r#"type=PATH msg=audit(1:2): item=0 name="/tmp/victim""#,
    ]);
    let vector = extractor().process_window(&batch, 42);
    let result = ClassificationResult::combine(42, votes(true, true, false), (1.5, 1.0));

    let id = store.record(&result, &vector).unwrap();

    let recent = store.recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    let (ts, verdict, prob, rate, churn) = &recent[0];
    assert_eq!(*ts, 42);
    assert_eq!(verdict, "malicious");
    assert!((prob - result.combined_prob as f64).abs() < 1e-6);
    assert_eq!(*rate, 1.0);
    assert_eq!(*churn, 1.0);

    let detail = store.get_detail(&id).unwrap().unwrap();
    assert_eq!(detail.verdict, Verdict::Malicious);
    assert!((detail.combined_prob - result.combined_prob).abs() < 1e-6);
}

#[test]
fn store_prune_by_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let store = EventStore::open(&dir.path().join("events.db"), b"test-secret").unwrap();
    let vector = extractor().process_window(&[], 0);
    for ts in [10, 20] {
        let result = ClassificationResult::combine(ts, votes(false, false, false), (1.5, 1.0));
        store.record(&result, &vector).unwrap();
    }
    assert_eq!(store.prune_before(15).unwrap(), 1);
    let recent = store.recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].0, 20);
}
