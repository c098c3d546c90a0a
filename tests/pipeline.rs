use digit_nn::{
    ArchitectureConfig, AugmentPolicy, Error, InMemoryDataset, Network, OutputPaths, Pipeline,
    RawImage, RawSplit, TrainConfig, WeightSet,
};

fn config() -> ArchitectureConfig {
    ArchitectureConfig::from_json_str(
        r#"{
            "input": {"width": 4, "height": 4},
            "classes": ["0", "1", "none"],
            "layers": [
                {},
                {"size": 8, "activation": "relu"},
                {"size": 8, "activation": "relu"},
                {"activation": "softmax"}
            ]
        }"#,
    )
    .unwrap()
}

fn top_row() -> RawImage {
    let mut pixels = vec![0u8; 16];
    pixels[..4].fill(255);
    RawImage::new(4, 4, pixels)
}

fn diagonal() -> RawImage {
    let mut pixels = vec![0u8; 16];
    for i in 0..4 {
        pixels[i * 4 + i] = 200;
    }
    RawImage::new(4, 4, pixels)
}

fn split(images: Vec<RawImage>, labels: Vec<usize>) -> RawSplit {
    RawSplit { images, labels }
}

fn pipeline(dir: &std::path::Path) -> Pipeline {
    Pipeline::new(config())
        .with_policy(AugmentPolicy { train_synthetic: 1, test_synthetic: 1 })
        .with_training(TrainConfig::new(3, 2))
        .with_outputs(OutputPaths {
            weights: dir.join("model_weights.json"),
            examples_dir: dir.join("examples"),
        })
        .with_seed(7)
}

#[test]
fn full_run_writes_weights_and_one_example_per_class() {
    let dir = tempfile::tempdir().unwrap();
    let provider = InMemoryDataset {
        train: split(vec![top_row(), diagonal()], vec![0, 1]),
        test: split(vec![top_row(), diagonal()], vec![0, 1]),
    };

    let report = pipeline(dir.path()).run(&provider).unwrap();

    assert_eq!(report.metrics.per_epoch.len(), 3);
    assert!(report.metrics.final_test_loss.is_finite());

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.weights_path).unwrap()).unwrap();
    let mut keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["weight_0", "weight_1", "weight_2", "weight_3", "weight_4", "weight_5"]);

    let examples = dir.path().join("examples");
    for name in ["0", "1", "none"] {
        assert!(examples.join(format!("{name}.png")).is_file(), "missing {name}.png");
        assert!(examples.join(format!("{name}.json")).is_file(), "missing {name}.json");
    }
    assert_eq!(std::fs::read_dir(&examples).unwrap().count(), 6);

    let one: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(examples.join("1.json")).unwrap()).unwrap();
    assert_eq!(one["matrix"][2][2], serde_json::json!(1.0));
    assert_eq!(one["matrix"][2][3], serde_json::json!(0.0));
}

#[test]
fn saved_weights_rebuild_the_trained_network() {
    let dir = tempfile::tempdir().unwrap();
    let provider = InMemoryDataset {
        train: split(vec![top_row(), diagonal()], vec![0, 1]),
        test: split(vec![diagonal(), top_row()], vec![1, 0]),
    };

    let report = pipeline(dir.path()).run(&provider).unwrap();
    let loaded = WeightSet::load_json(&report.weights_path).unwrap();
    assert_eq!(loaded, report.weights);

    let rebuilt = Network::from_weights(&config(), &loaded).unwrap();
    let input: Vec<f64> = (0..16).map(|i| if i % 5 == 0 { 1.0 } else { 0.0 }).collect();
    assert_eq!(rebuilt.predict(&input), report.network.predict(&input));
}

#[test]
fn class_missing_from_test_split_fails_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let provider = InMemoryDataset {
        train: split(vec![top_row(), diagonal()], vec![0, 1]),
        test: split(vec![top_row()], vec![0]),
    };

    match pipeline(dir.path()).run(&provider) {
        Err(Error::NoExampleFound { class, index }) => {
            assert_eq!(class, "1");
            assert_eq!(index, 1);
        }
        other => panic!("expected NoExampleFound, got {:?}", other.map(|_| ())),
    }
    assert!(!dir.path().join("model_weights.json").exists());
    assert!(!dir.path().join("examples").exists());
}

#[test]
fn image_size_disagreeing_with_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let provider = InMemoryDataset {
        train: split(vec![RawImage::new(3, 4, vec![0; 12])], vec![0]),
        test: split(vec![top_row()], vec![0]),
    };

    match pipeline(dir.path()).run(&provider) {
        Err(Error::ConfigMismatch { field, .. }) => assert_eq!(field, "input.width"),
        other => panic!("expected ConfigMismatch, got {:?}", other.map(|_| ())),
    }
}
