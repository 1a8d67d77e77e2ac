use std::path::Path;

use contest_bench::config::RunConfig;
use contest_bench::logging::init_logging;
use contest_bench::pipeline::LeaderboardRunner;
use contest_bench::telemetry::summarise_telemetry;
use contest_core::Snapshot;
use contest_core::model::{Competition, ExamItem, JudgeId, Round, RoundKind, ScoreRecord};
use tempfile::tempdir;

fn structured_config(output_dir: &Path) -> RunConfig {
    let yaml = format!(
        r#"
run_id: "fallback_run"
source:
  synthetic:
    seed: 1
    contestants: 5
    judges: 1
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
logging:
  enable_structured: true
  tracing_level: "info"
"#,
        jsonl = output_dir.join("leaderboard.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );
    let mut cfg: RunConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn round(id: &str, order: u32, kind: RoundKind) -> Round {
    Round {
        id: id.into(),
        name: id.to_string(),
        order,
        kind,
    }
}

/// Qualifier scores only. With no executive panel nothing is written back
/// into TOP4, so the chained TOP2 selection finds nobody eligible.
fn unscored_elimination_snapshot() -> Snapshot {
    let mut competition = Competition::new("CT010", "Invitational");
    competition.contestants = ["NV1", "NV2", "NV3", "NV4", "NV5"]
        .into_iter()
        .map(Into::into)
        .collect();
    competition.rounds = vec![
        round("R1", 1, RoundKind::Ordinary),
        round("TOP4", 2, RoundKind::ExecutiveCutoff { top_limit: 4 }),
        round("TOP2", 3, RoundKind::ExecutiveCutoff { top_limit: 2 }),
    ];
    competition.items = vec![
        ExamItem::points("R1-A", "R1", 100),
        ExamItem::points("TOP4-PANEL", "TOP4", 100),
        ExamItem::points("TOP2-PANEL", "TOP2", 100),
    ];

    let mut snapshot = Snapshot::new(competition);
    for (contestant, points) in [("NV1", 55.0), ("NV2", 80.0), ("NV3", 65.0), ("NV4", 30.0), ("NV5", 90.0)] {
        snapshot.upsert_score(ScoreRecord {
            contestant: contestant.into(),
            judge: JudgeId::from("GK1"),
            item: "R1-A".into(),
            round: "R1".into(),
            points,
            elapsed_seconds: None,
        });
    }
    snapshot
}

#[test]
fn empty_chained_cutoff_fallback_is_logged() {
    let dir = tempdir().expect("temp dir");
    let config = structured_config(dir.path());
    let outputs = config.resolved_outputs();
    let guard = init_logging(&config.logging, &outputs, &config.run_id)
        .expect("logging starts")
        .expect("structured logging enabled");
    let telemetry_path = guard.telemetry_path.clone();

    let runner = LeaderboardRunner::with_snapshot(config, outputs, unscored_elimination_snapshot());
    let summary = runner.run().expect("leaderboard completes");
    assert_eq!(summary.cutoff_fallbacks, 1);
    assert_eq!(summary.stage_failures, 0);
    assert_eq!(summary.telemetry_path.as_deref(), Some(telemetry_path.as_path()));

    // Dropping the guard flushes the background writer.
    drop(guard);
    let telemetry = summarise_telemetry(&telemetry_path).expect("telemetry summarised");
    assert_eq!(telemetry.cutoff.fallbacks, 1);
    assert_eq!(telemetry.cutoff.fallback_rounds, vec!["TOP2".to_string()]);
    assert_eq!(telemetry.cutoff.selections, 2);
    assert_eq!(telemetry.unreadable_lines, 0);
    assert_eq!(telemetry.stage_events.get("cutoff"), Some(&2));
}
