//! Integration tests for the engine against in-memory and flaky datasets.

use docflow_document::{Document, Value};
use docflow_engine::operators::{
    CentroidOperator, FieldSetOperator, LexiconSentimentOperator, VectorNormalizeOperator,
};
use docflow_engine::{
    Cursor, Dataset, DatasetError, Engine, EngineConfig, EngineError, EngineState, Filter,
    MemoryDataset, Operator, OperatorError, OperatorResult, RetryConfig,
};
use docflow_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

fn retry(max_retries: u32) -> RetryConfig {
    RetryConfig::new(max_retries).with_backoff(Duration::ZERO)
}

fn config() -> EngineConfig {
    EngineConfig::new().with_retry(retry(3))
}

fn static_dataset(n: usize) -> MemoryDataset {
    MemoryDataset::with_documents("static", static_documents(n))
}

/// Counts hook calls and optionally fails the transform.
#[derive(Default)]
struct Hooked {
    pre: usize,
    post: usize,
    fail: bool,
}

impl Operator for Hooked {
    fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
        if self.fail {
            return Err(OperatorError::custom("model exploded"));
        }
        for document in &mut documents {
            document.set("hooked", true);
        }
        Ok(documents)
    }

    fn pre_hooks(&mut self, _dataset: &dyn Dataset) -> OperatorResult<()> {
        self.pre += 1;
        Ok(())
    }

    fn post_hooks(&mut self, _dataset: &dyn Dataset) -> OperatorResult<()> {
        self.post += 1;
        Ok(())
    }
}

// ============================================================================
// Pagination
// ============================================================================

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn every_document_is_yielded_once(n in 0usize..40, chunksize in 1usize..12) {
        let dataset = static_dataset(n);
        let mut engine =
            Engine::new(&dataset, Hooked::default(), config().with_chunksize(chunksize)).unwrap();
        prop_assert_eq!(engine.num_chunks(), n.div_ceil(chunksize));

        let chunks: Vec<Vec<Document>> = engine.iterate().map(|c| c.unwrap()).collect();
        prop_assert_eq!(chunks.len(), n.div_ceil(chunksize));
        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= chunksize));

        let seen: Vec<String> = chunks.iter().flat_map(|c| ids(c)).collect();
        prop_assert_eq!(seen, ids(&static_documents(n)));
        // One extra fetch observes exhaustion.
        prop_assert_eq!(dataset.fetch_calls(), chunks.len() + 1);
    }
}

#[test]
fn whole_dataset_is_one_chunk() {
    let dataset = static_dataset(17);
    let mut engine = Engine::new(&dataset, Hooked::default(), config().whole_dataset()).unwrap();
    let sizes: Vec<usize> = engine.iterate().map(|c| c.unwrap().len()).collect();
    assert_eq!(sizes, vec![17]);
}

#[test]
fn resumes_from_cursor() {
    let dataset = static_dataset(10);
    let mut engine = Engine::new(
        &dataset,
        Hooked::default(),
        config().with_chunksize(4).with_after_id(Cursor::after("5")),
    )
    .unwrap();
    let seen: Vec<String> = engine.iterate().flat_map(|c| ids(&c.unwrap())).collect();
    assert_eq!(seen, vec!["6", "7", "8", "9"]);
    assert_eq!(engine.after_id(), Some(&Cursor::after("9")));
}

#[test]
fn select_fields_are_projected() {
    let dataset = static_dataset(3);
    let mut engine =
        Engine::new(&dataset, Hooked::default(), config().with_select_fields(["text"])).unwrap();
    let chunk = engine.next_chunk().unwrap().unwrap();
    assert_eq!(chunk[0].keys(), vec!["_id", "text"]);
}

// ============================================================================
// Diffs and idempotence
// ============================================================================

#[test]
fn second_pass_uploads_nothing() {
    let dataset = static_dataset(12);

    let mut first = Engine::new(&dataset, FieldSetOperator::new("new_field", 3), config()).unwrap();
    let report = first.call().unwrap();
    assert_eq!(report.documents_changed, 12);
    let updates_after_first = dataset.update_calls();
    assert_eq!(updates_after_first, 2);

    let mut second =
        Engine::new(&dataset, FieldSetOperator::new("new_field", 3), config()).unwrap();
    let report = second.call().unwrap();
    assert_eq!(report.chunks, 2);
    assert_eq!(report.documents_changed, 0);
    assert_eq!(dataset.update_calls(), updates_after_first);
}

#[test]
fn only_changed_fields_are_uploaded() {
    let dataset = FlakyDataset::new(static_dataset(2));
    let mut engine =
        Engine::new(&dataset, FieldSetOperator::new("meta.flag", true), config()).unwrap();

    let chunk = engine.next_chunk().unwrap().unwrap();
    let updates = engine.transform_chunk(&chunk).unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].keys(), vec!["_id", "meta.flag"]);
    assert_eq!(updates[0].get("meta.index"), None);

    engine.update_chunk(&updates).unwrap();
    let stored = dataset.inner().get("0").unwrap();
    assert_eq!(stored.get("meta.index"), Some(&Value::Integer(0)));
    assert_eq!(stored.get("meta.flag"), Some(&Value::Bool(true)));
}

#[test]
fn vector_drift_within_tolerance_is_ignored() {
    let dataset = static_dataset(5);
    let mut first =
        Engine::new(&dataset, VectorNormalizeOperator::new("sample_vector_"), config()).unwrap();
    assert_eq!(first.call().unwrap().documents_changed, 5);

    // Nudge the stored outputs by less than the tolerance.
    for mut document in dataset.documents() {
        let nudged: Vec<f64> = document
            .get("sample_vector__normalized_vector_")
            .and_then(Value::as_vector)
            .unwrap()
            .into_iter()
            .map(|x| x + 1e-7)
            .collect();
        document.set("sample_vector__normalized_vector_", nudged);
        dataset.update_documents(&[document]).unwrap();
    }

    let mut second =
        Engine::new(&dataset, VectorNormalizeOperator::new("sample_vector_"), config()).unwrap();
    assert_eq!(second.call().unwrap().documents_changed, 0);
}

#[test]
fn empty_update_makes_no_call() {
    let dataset = FlakyDataset::new(static_dataset(1));
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();
    assert_eq!(engine.update_chunk(&[]).unwrap(), None);
    assert_eq!(dataset.update_attempts(), 0);
}

#[test]
fn sentiment_workflow_end_to_end() {
    let dataset = MemoryDataset::with_documents(
        "reviews",
        vec![
            document(serde_json::json!({"_id": "a", "review": "great food, love it"})),
            document(serde_json::json!({"_id": "b", "review": "awful and broken"})),
            document(serde_json::json!({"_id": "c"})),
        ],
    );
    let mut engine = Engine::new(
        &dataset,
        LexiconSentimentOperator::new("review"),
        config()
            .with_filter(Filter::exists("review"))
            .with_select_fields(["review"]),
    )
    .unwrap();
    assert_eq!(engine.size(), 2);

    let report = engine.call().unwrap();
    assert_eq!(report.documents_changed, 2);
    assert_eq!(
        text_at(&dataset.get("a").unwrap(), "_sentiment_.review.lexicon.label"),
        "positive"
    );
    assert_eq!(
        text_at(&dataset.get("b").unwrap(), "_sentiment_.review.lexicon.label"),
        "negative"
    );
    assert!(!dataset.get("c").unwrap().contains("_sentiment_"));
}

#[test]
fn centroids_are_inserted_after_the_run() {
    let dataset = static_dataset(6);
    let operator = CentroidOperator::new(
        "sample_vector_",
        vec![vec![0.0; VECTOR_DIMENSION], vec![10.0; VECTOR_DIMENSION]],
    )
    .unwrap();
    let mut engine = Engine::new(&dataset, operator, config()).unwrap();
    engine.call().unwrap();

    assert_eq!(engine.operator().counts().iter().sum::<usize>(), 6);
    assert_eq!(
        dataset.centroids("sample_vector_", "fixed-2").map(|c| c.len()),
        Some(2)
    );
    assert_eq!(
        text_at(&dataset.get("0").unwrap(), "_cluster_.sample_vector_.fixed-2"),
        "cluster_0"
    );
}

// ============================================================================
// Retries
// ============================================================================

#[test]
fn fetch_succeeds_on_last_allowed_retry() {
    let dataset = FlakyDataset::new(static_dataset(3)).fail_fetches(3);
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();

    let chunk = engine.next_chunk().unwrap().unwrap();
    assert_eq!(chunk.len(), 3);
    assert_eq!(dataset.fetch_attempts(), 4);
    assert_eq!(engine.stats().retries, 3);
}

#[test]
fn fetch_gives_up_after_max_retries() {
    let dataset = FlakyDataset::new(static_dataset(3)).fail_fetches(4);
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();

    let err = engine.next_chunk().unwrap().unwrap_err();
    assert!(err.is_retries_exhausted());
    assert!(matches!(
        err,
        EngineError::MaxRetriesExceeded {
            operation: "fetch",
            attempts: 4,
            ..
        }
    ));
    assert_eq!(dataset.fetch_attempts(), 4);
    assert_eq!(engine.state(), EngineState::Done);
    assert!(engine.next_chunk().is_none());
    assert_eq!(dataset.fetch_attempts(), 4);
}

#[test]
fn non_transient_fetch_error_is_fatal() {
    let dataset = FlakyDataset::new(static_dataset(3)).fail_fetches_with(1, || {
        DatasetError::Server {
            status: 400,
            message: "bad filter".into(),
        }
    });
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();

    let err = engine.next_chunk().unwrap().unwrap_err();
    assert!(matches!(err, EngineError::Dataset(DatasetError::Server { status: 400, .. })));
    assert_eq!(dataset.fetch_attempts(), 1);
}

#[test]
fn update_retries_any_error() {
    let dataset = FlakyDataset::new(static_dataset(2))
        .fail_updates_with(3, || DatasetError::Protocol("garbled".into()));
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();
    let report = engine.call().unwrap();
    assert_eq!(report.documents_changed, 2);
    assert_eq!(dataset.update_attempts(), 4);

    let dataset = FlakyDataset::new(static_dataset(2)).fail_updates(4);
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();
    let err = engine.call().unwrap_err();
    assert!(matches!(
        err,
        EngineError::MaxRetriesExceeded {
            operation: "update",
            attempts: 4,
            ..
        }
    ));
}

#[test]
fn retry_counter_resets_after_success() {
    // Two fetch failures then two update failures: four retries in total,
    // never more than two in a row.
    let dataset = FlakyDataset::new(static_dataset(4))
        .fail_fetches(2)
        .fail_updates(2);
    let mut engine =
        Engine::new(&dataset, Hooked::default(), EngineConfig::new().with_retry(retry(2))).unwrap();
    let report = engine.call().unwrap();
    assert_eq!(report.documents_changed, 4);
    assert_eq!(engine.stats().retries, 4);
}

#[test]
fn zero_retries_fail_on_first_error() {
    let dataset = FlakyDataset::new(static_dataset(1)).fail_fetches(1);
    let mut engine =
        Engine::new(&dataset, Hooked::default(), EngineConfig::new().with_retry(retry(0))).unwrap();
    let err = engine.call().unwrap_err();
    assert!(matches!(err, EngineError::MaxRetriesExceeded { attempts: 1, .. }));
}

// ============================================================================
// Validation and hooks
// ============================================================================

#[test]
fn validation_happens_before_any_fetch() {
    let dataset = FlakyDataset::new(static_dataset(3));
    let err = Engine::new(
        &dataset,
        Hooked::default(),
        config().with_select_fields(["text", "missing_field"]),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(dataset.fetch_attempts(), 0);

    // Parent paths and reserved fields are accepted.
    assert!(Engine::new(
        &dataset,
        Hooked::default(),
        config().with_select_fields(["meta", "_id", "insert_date_"]),
    )
    .is_ok());
}

#[test]
fn hooks_wrap_the_run() {
    let dataset = static_dataset(3);
    let mut engine = Engine::new(&dataset, Hooked::default(), config()).unwrap();
    engine.call().unwrap();
    assert_eq!(engine.operator().pre, 1);
    assert_eq!(engine.operator().post, 1);
}

#[test]
fn transform_error_skips_post_hooks() {
    let dataset = FlakyDataset::new(static_dataset(3));
    let operator = Hooked {
        fail: true,
        ..Hooked::default()
    };
    let mut engine = Engine::new(&dataset, operator, config()).unwrap();

    let err = engine.call().unwrap_err();
    assert!(matches!(err, EngineError::Transform(OperatorError::Custom(_))));
    assert_eq!(engine.operator().pre, 1);
    assert_eq!(engine.operator().post, 0);
    assert_eq!(dataset.update_attempts(), 0);
    // Transform errors are never retried.
    assert_eq!(dataset.fetch_attempts(), 1);
}

// ============================================================================
// Worker sharding
// ============================================================================

#[test]
fn workers_partition_the_dataset() {
    let dataset = MemoryDataset::with_documents("shared", mock_documents(40));
    let total = 3;

    for worker in 1..=total {
        let mut engine = Engine::new(
            &dataset,
            FieldSetOperator::new(format!("worker_{worker}"), true),
            config().with_chunksize(5).with_workers(worker, total),
        )
        .unwrap();
        engine.call().unwrap();
    }

    let mut per_worker: HashMap<u32, usize> = HashMap::new();
    for document in dataset.documents() {
        let owners: Vec<u32> = (1..=total)
            .filter(|w| document.contains(&format!("worker_{w}")))
            .collect();
        assert_eq!(owners.len(), 1, "document {:?}", document.id());
        *per_worker.entry(owners[0]).or_default() += 1;
    }
    assert_eq!(per_worker.values().sum::<usize>(), 40);
}

#[test]
fn fetches_carry_worker_number_and_partition_filter() {
    let dataset = FlakyDataset::new(static_dataset(6));
    let mut engine = Engine::new(&dataset, Hooked::default(), config().with_workers(2, 2)).unwrap();
    engine.call().unwrap();

    let request = &dataset.fetch_requests()[0];
    assert_eq!(request.worker_number, Some(2));
    assert_eq!(request.filters, vec![Filter::match_modulo("_id", 2, 0)]);
    assert_eq!(engine.stats().documents_fetched, 3);
}
