//! End-to-end ensemble pipeline tests: model pool → aggregation →
//! resolution → evaluation → reweighting → persistence.

use std::collections::BTreeMap;

use ensemble_coordination::{
    load_snapshot, save_snapshot, Ballot, BatchPredictions, DynamicWeightAdjuster,
    EnsembleConfig, EnsembleCoordinator, EnsembleError, EnsembleEvent, EnsembleResult, EventBus,
    Features, Label, ModelOutput, ModelPool, OutputFormat, PredictionRound, Predictor,
    Resolution, SharedWeightAdjuster, VotingStrategy,
};

/// Predicts a fixed label with a fixed confidence
struct Constant {
    name: &'static str,
    label: &'static str,
    confidence: f64,
}

impl Predictor for Constant {
    fn name(&self) -> &str {
        self.name
    }

    fn predict(&self, _data: &Features) -> EnsembleResult<ModelOutput> {
        Ok(ModelOutput::single(self.label).with_confidence(self.confidence))
    }
}

/// Always fails to predict
struct Broken;

impl Predictor for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn predict(&self, _data: &Features) -> EnsembleResult<ModelOutput> {
        Err(EnsembleError::invalid_input("feature vector has wrong width"))
    }
}

/// Echoes the `labels` array of its input as a batch prediction
struct Echo(&'static str);

impl Predictor for Echo {
    fn name(&self) -> &str {
        self.0
    }

    fn predict(&self, data: &Features) -> EnsembleResult<ModelOutput> {
        let labels = data
            .get(self.0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| EnsembleError::invalid_input("no predictions for model"))?
            .iter()
            .filter_map(|v| v.as_i64())
            .map(Label::Int)
            .collect();
        Ok(ModelOutput::new(labels))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ensemble_coordination=debug")
        .with_test_writer()
        .try_init();
}

fn quiet_config() -> EnsembleConfig {
    EnsembleConfig {
        attach_timestamp: false,
        ..Default::default()
    }
}

#[test]
fn test_pool_round_survives_failing_model() {
    init_tracing();
    let pool = ModelPool::new()
        .with_model(Box::new(Constant { name: "svm", label: "A", confidence: 0.6 }))
        .unwrap()
        .with_model(Box::new(Broken))
        .unwrap()
        .with_model(Box::new(Constant { name: "rf", label: "A", confidence: 0.3 }))
        .unwrap()
        .with_model(Box::new(Constant { name: "bert", label: "B", confidence: 0.1 }))
        .unwrap();

    let bus = EventBus::new().shared();
    let mut rx = bus.subscribe();
    let coordinator = EnsembleCoordinator::new(EnsembleConfig::default())
        .unwrap()
        .with_event_bus(bus);

    let result = coordinator.run_round(&pool, &Features::Null).unwrap();
    assert_eq!(result.aggregation.result, Label::from("A"));
    assert!((result.aggregation.details.get(&Label::from("A")).unwrap() - 0.9).abs() < 1e-9);
    assert!((result.aggregation.details.get(&Label::from("B")).unwrap() - 0.1).abs() < 1e-9);
    assert!(result.timestamp.is_some());

    let models = result.models.unwrap();
    assert_eq!(models.len(), 3);
    assert!(!models.contains_key("broken"));

    match rx.try_recv().unwrap() {
        EnsembleEvent::ModelExcluded { model, .. } => assert_eq!(model, "broken"),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(rx.try_recv().unwrap().event_type(), "round_aggregated");
}

#[test]
fn test_batch_evaluation_feeds_next_round() {
    init_tracing();
    let pool = ModelPool::new()
        .with_model(Box::new(Echo("good")))
        .unwrap()
        .with_model(Box::new(Echo("bad")))
        .unwrap();
    let data: Features = serde_json::json!({ "good": [0, 1, 1, 0], "bad": [1, 0, 0, 1] });
    let truth = vec![Label::Int(0), Label::Int(1), Label::Int(1), Label::Int(0)];

    let coordinator = EnsembleCoordinator::new(quiet_config()).unwrap();
    let collected = coordinator.collect_batch(&pool, &data);
    assert!(collected.excluded.is_empty());

    let reports = coordinator
        .evaluate_and_reweight(&truth, &collected.batch)
        .unwrap();
    assert_eq!(reports["good"].accuracy, 1.0);
    assert_eq!(reports["bad"].accuracy, 0.0);

    // the good model now outweighs the bad one in a head-to-head vote
    let weighed = coordinator.weigh_ballots(&[Ballot::new("bad", "X"), Ballot::new("good", "Y")]);
    let result = coordinator.aggregate("next", &weighed).unwrap();
    assert_eq!(result.aggregation.result, Label::from("Y"));
}

#[test]
fn test_three_model_round_document() {
    let round: PredictionRound = serde_json::from_str(
        r#"{
            "id": "batch-1",
            "batch": {
                "ModelA": [0, 1, 1, 0],
                "ModelB": [0, 1, 0, 0],
                "ModelC": [0, 0, 1, 0]
            },
            "ground_truth": [0, 1, 1, 0]
        }"#,
    )
    .unwrap();

    let config = EnsembleConfig {
        disagreement_threshold: 0.6,
        ..quiet_config()
    };
    let coordinator = EnsembleCoordinator::new(config).unwrap();
    let report = coordinator.process_round(&round).unwrap();

    let resolutions = report.resolutions.clone().unwrap();
    assert_eq!(
        resolutions,
        vec![
            Resolution::Consensus(Label::Int(0)),
            Resolution::Consensus(Label::Int(1)),
            Resolution::Consensus(Label::Int(1)),
            Resolution::Consensus(Label::Int(0)),
        ]
    );
    assert!(report.aggregation.is_none());
    assert_eq!(report.weights.len(), 3);
    assert!(report.weights["ModelA"] > report.weights["ModelB"]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["resolutions"], serde_json::json!([0, 1, 1, 0]));

    let text = report.to_plain_text();
    assert!(text.contains("Resolutions: 0, 1, 1, 0\n"));
    assert!(text.contains("Metrics:\n  ModelA: accuracy=1.00"));
    assert_eq!(OutputFormat::Text.to_string(), "text");
}

#[test]
fn test_consensus_missed_event() {
    let bus = EventBus::new().shared();
    let mut rx = bus.subscribe();
    let config = EnsembleConfig {
        disagreement_threshold: 0.7,
        ..quiet_config()
    };
    let coordinator = EnsembleCoordinator::new(config).unwrap().with_event_bus(bus);

    let mut batch = BatchPredictions::new();
    batch.insert("a".to_string(), vec![Label::Int(0), Label::Int(1)]);
    batch.insert("b".to_string(), vec![Label::Int(0), Label::Int(0)]);
    batch.insert("c".to_string(), vec![Label::Int(0), Label::Int(1)]);

    let resolved = coordinator.resolve_batch("r-9", &batch).unwrap();
    assert_eq!(resolved[1], Resolution::NoConsensus);

    match rx.try_recv().unwrap() {
        EnsembleEvent::ConsensusMissed { round_id, items, threshold, .. } => {
            assert_eq!(round_id, "r-9");
            assert_eq!(items, vec![1]);
            assert_eq!(threshold, 0.7);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_weights_survive_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights").join("snapshot.json");

    let coordinator = EnsembleCoordinator::new(quiet_config()).unwrap();
    let mut batch = BatchPredictions::new();
    let labels = |xs: [i64; 5]| xs.into_iter().map(Label::Int).collect::<Vec<_>>();
    batch.insert("svm".to_string(), labels([0, 1, 0, 0, 1]));
    let truth = labels([0, 1, 1, 0, 1]);
    coordinator.evaluate_and_reweight(&truth, &batch).unwrap();

    save_snapshot(&coordinator.weights().snapshot(), &path).unwrap();
    let restored = load_snapshot(&path).unwrap();
    assert!((restored.weights["svm"] - (0.99 + 0.1 * 0.8)).abs() < 1e-9);

    let resumed = EnsembleCoordinator::new(quiet_config())
        .unwrap()
        .with_weights(SharedWeightAdjuster::new(DynamicWeightAdjuster::from_snapshot(&restored)));
    assert_eq!(resumed.weights().get_weights(), restored.weights);
}

#[test]
fn test_majority_round_ignores_learned_weights() {
    let mut seeded = BTreeMap::new();
    seeded.insert("b".to_string(), 100.0);
    let weights: SharedWeightAdjuster =
        DynamicWeightAdjuster::default().with_initial_weights(seeded).into();

    let config = EnsembleConfig {
        strategy: VotingStrategy::Majority,
        ..quiet_config()
    };
    let coordinator = EnsembleCoordinator::new(config).unwrap().with_weights(weights);
    let round = PredictionRound {
        ballots: vec![Ballot::new("a", "A"), Ballot::new("b", "B"), Ballot::new("c", "A")],
        ..Default::default()
    };

    let report = coordinator.process_round(&round).unwrap();
    let aggregation = report.aggregation.unwrap();
    assert_eq!(aggregation.aggregation.result, Label::from("A"));
    assert_eq!(aggregation.models.unwrap()["b"], 100.0);
    assert!(!report.round_id.is_empty());
}

#[test]
fn test_zero_confidence_round_fails() {
    let coordinator = EnsembleCoordinator::new(quiet_config()).unwrap();
    let err = coordinator
        .aggregate(
            "zero",
            &[Ballot::new("a", "A").with_confidence(0.0), Ballot::new("b", "B").with_confidence(0.0)],
        )
        .unwrap_err();
    assert_eq!(err.code(), "DIVISION_BY_ZERO");
}
