use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use contest_core::model::{Competition, ExamItem, JudgeId, Round, RoundKind, ScoreRecord};
use contest_core::{Scope, Snapshot, rank_totals, select_cutoff_for_round};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn field(contestants: usize, seed: u64) -> Snapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut competition = Competition::new("CT-BENCH", "Bench");
    competition.contestants = (0..contestants)
        .map(|index| format!("NV{index:05}").into())
        .collect();
    competition.rounds = vec![
        Round {
            id: "R1".into(),
            name: "Qualifier".into(),
            order: 1,
            kind: RoundKind::Ordinary,
        },
        Round {
            id: "TOP".into(),
            name: "Top 32".into(),
            order: 2,
            kind: RoundKind::ExecutiveCutoff { top_limit: 32 },
        },
    ];
    competition.items = (0..5)
        .map(|item| ExamItem::points(format!("BT{item}"), "R1", 100))
        .collect();

    let mut snapshot = Snapshot::new(competition);
    for index in 0..contestants {
        for item in 0..5 {
            for judge in 0..3 {
                snapshot.upsert_score(ScoreRecord {
                    contestant: format!("NV{index:05}").into(),
                    judge: JudgeId::new(format!("GK{judge}")),
                    item: format!("BT{item}").into(),
                    round: "R1".into(),
                    points: f64::from(rng.gen_range(0..=100u32)),
                    elapsed_seconds: Some(rng.gen_range(30..=600)),
                });
            }
        }
    }
    snapshot
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");

    for contestants in [100usize, 1_000] {
        let snapshot = field(contestants, 42);
        group.bench_function(format!("rank_totals_{contestants}"), |b| {
            b.iter(|| rank_totals(&snapshot, &Scope::Competition))
        });
        group.bench_function(format!("first_stage_cutoff_{contestants}"), |b| {
            b.iter_batched(
                || snapshot.clone(),
                |snapshot| select_cutoff_for_round(&snapshot, &"TOP".into()),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ranking);
criterion_main!(benches);
