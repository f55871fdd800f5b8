use std::io;

use clap::Parser;
use log::info;
use onnx_classifier::{
    providers::TractProvider,
    service::{
        Config, InputSource, Prediction, ReportFormat, ServiceBuilder, ServiceError,
        PRECOMPUTED_IMAGE_PATH, PRECOMPUTED_MODEL_PATH,
    },
};

mod cli;
use cli::{Args, Source};
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error("Missing {0} path.\nUsage: onnx-classifier <MODEL> <IMAGE>")]
    MissingArgument(&'static str),
    #[error("{0}")]
    InputNotFound(ServiceError),
    #[error("Could not decode image -> {0}")]
    CouldNotDecodeImage(ServiceError),
    #[error("Preprocessing failure -> {0}")]
    PreprocessingFailure(ServiceError),
    #[error("Runtime failure -> {0}")]
    RuntimeFailure(ServiceError),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::InputNotFound { .. } => Self::InputNotFound(e),
            ServiceError::Decode(_) => Self::CouldNotDecodeImage(e),
            ServiceError::ExternalProcess { .. }
            | ServiceError::TensorFile(_)
            | ServiceError::InvalidTensor(_) => Self::PreprocessingFailure(e),
            e => Self::RuntimeFailure(e),
        }
    }
}

fn main() {
    if let Err(e) = exec_program() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn exec_program() -> Result<(), AppError> {
    env_logger::init();

    let args = Args::parse();

    let source = input_source(&args)?;
    let format = if args.single {
        ReportFormat::Single
    } else {
        ReportFormat::Json
    };
    let config = Config {
        top_k: args.show.into(),
    };

    info!("Source: {} -> {:?}", args.source, source);
    info!("Number of top infered class probabilities to show: {}", config.top_k);

    let service = ServiceBuilder::new()
        .config(config)
        .provider(TractProvider::new(!args.no_optimize))
        .build();

    let mut pipeline = service.pipeline();
    let predictions = pipeline.run_and_report(&source, format, io::stdout().lock());
    info!("Pipeline finished: {}", pipeline.stage());

    log_predictions(&predictions?);
    Ok(())
}

fn input_source(args: &Args) -> Result<InputSource, AppError> {
    let source = match args.source {
        Source::FileArgs => InputSource::FileArgs {
            model: args
                .model
                .clone()
                .ok_or(AppError::MissingArgument("model"))?,
            image: args
                .image
                .clone()
                .ok_or(AppError::MissingArgument("image"))?,
        },
        Source::FixedPaths => InputSource::FixedPaths,
        Source::PrecomputedTensor => InputSource::PrecomputedTensor {
            model: args
                .model
                .clone()
                .unwrap_or_else(|| PRECOMPUTED_MODEL_PATH.into()),
            image: args
                .image
                .clone()
                .unwrap_or_else(|| PRECOMPUTED_IMAGE_PATH.into()),
            tensor: args.tensor.clone(),
            command: (!args.reuse_tensor).then(|| args.preprocess_cmd.clone()),
        },
    };
    Ok(source)
}

fn log_predictions(predictions: &[Prediction]) {
    for (rank, prediction) in predictions.iter().enumerate() {
        info!(
            "{}. class: {}, confidence: {} %",
            rank + 1,
            prediction.label,
            prediction.confidence
        );
    }
}
