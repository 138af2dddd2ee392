// Criterion benchmarks for the Diana profile engine

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use diana_engine::core::schema::{self, FieldDomain};
use diana_engine::core::{
    category_progress, completion_score, next_question, AnswerExtractor, DialogueEngine,
    Extraction, ExtractionContext, ExtractorError, TurnInput,
};
use diana_engine::models::{AskedStatus, Ledger, LedgerEntry, Profile};

/// Profile with the first `filled` catalog fields answered
fn partially_filled(filled: usize) -> Profile {
    let mut profile = Profile::default();
    for spec in schema::fields().iter().take(filled) {
        let raw = match spec.domain {
            FieldDomain::Enum(tokens) => serde_json::json!(tokens[0]),
            FieldDomain::Integer { min, .. } => serde_json::json!(min),
            FieldDomain::FreeText => serde_json::json!("benchmark answer"),
            FieldDomain::StringArray => serde_json::json!(["one", "two"]),
        };
        let value = diana_engine::core::normalize_value(spec, &raw).unwrap();
        profile.set(spec.id, value).unwrap();
    }
    profile
}

fn ledger_for(profile: &Profile) -> Ledger {
    let mut ledger = Ledger::new();
    for spec in schema::fields() {
        if profile.is_filled(spec.id) {
            ledger.upsert(LedgerEntry {
                field_id: spec.id,
                status: AskedStatus::Answered,
                misses: 0,
                asked_at: chrono::Utc::now(),
            });
        }
    }
    ledger
}

fn bench_completion_score(c: &mut Criterion) {
    let profile = partially_filled(20);

    c.bench_function("completion_score", |b| {
        b.iter(|| completion_score(black_box(&profile)));
    });
}

fn bench_next_question(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_question");

    for filled in [0, 10, 20, 40].iter() {
        let profile = partially_filled(*filled);
        let ledger = ledger_for(&profile);

        group.bench_with_input(BenchmarkId::new("filled", filled), filled, |b, _| {
            b.iter(|| next_question(black_box(&profile), black_box(&ledger)));
        });
    }

    group.finish();
}

fn bench_category_progress(c: &mut Criterion) {
    let profile = partially_filled(20);
    let ledger = ledger_for(&profile);

    c.bench_function("category_progress", |b| {
        b.iter(|| category_progress(black_box(&profile), black_box(&ledger)));
    });
}

/// Extractor answering the open question instantly, to measure pure
/// orchestration overhead
struct InstantExtractor;

#[async_trait]
impl AnswerExtractor for InstantExtractor {
    async fn extract(&self, ctx: ExtractionContext<'_>) -> Result<Extraction, ExtractorError> {
        let updates = match ctx.target {
            Some(target) => {
                let raw = match schema::spec(target).domain {
                    FieldDomain::Enum(tokens) => serde_json::json!(tokens[0]),
                    FieldDomain::Integer { min, .. } => serde_json::json!(min),
                    FieldDomain::FreeText => serde_json::json!("benchmark answer"),
                    FieldDomain::StringArray => serde_json::json!(["one", "two"]),
                };
                vec![(target, raw)]
            }
            None => vec![],
        };
        Ok(Extraction {
            updates,
            reply: None,
        })
    }
}

fn bench_full_turn(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let engine = DialogueEngine::with_defaults();

    let profile = partially_filled(10);
    let mut ledger = ledger_for(&profile);
    ledger.upsert(LedgerEntry {
        field_id: schema::fields()[10].id,
        status: AskedStatus::Pending,
        misses: 0,
        asked_at: chrono::Utc::now(),
    });

    c.bench_function("full_turn_scripted_extractor", |b| {
        b.iter(|| {
            let input = TurnInput {
                profile: profile.clone(),
                ledger: ledger.clone(),
                history: vec![],
                message: "here you go".to_string(),
            };
            runtime
                .block_on(engine.run_turn(black_box(input), &InstantExtractor))
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_completion_score,
    bench_next_question,
    bench_category_progress,
    bench_full_turn
);

criterion_main!(benches);
