// Trains the digit classifier on MNIST with an extra "none" class and
// writes model_weights.json plus one example per class under examples/.
//
// Expects config.json and the four MNIST IDX files under data/ in the
// working directory. Log verbosity follows RUST_LOG (default: info).

use std::process::ExitCode;

use log::{error, info};

use digit_nn::{ArchitectureConfig, IdxDataset, Pipeline};

const CONFIG_PATH: &str = "config.json";
const DATA_DIR: &str = "data";

fn run() -> digit_nn::Result<()> {
    let config = ArchitectureConfig::load_json(CONFIG_PATH)?;
    info!(
        "{}x{} input, {} classes, {} dense layers",
        config.input.width,
        config.input.height,
        config.num_classes(),
        config.dense_layers().len()
    );

    let report = Pipeline::new(config).run(&IdxDataset::in_dir(DATA_DIR))?;

    info!(
        "done: test accuracy {:.4}, {} tensors in {}, {} examples",
        report.metrics.final_test_accuracy,
        report.weights.len(),
        report.weights_path.display(),
        report.examples.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
