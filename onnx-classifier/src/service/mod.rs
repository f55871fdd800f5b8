//! Contains the service that classifies an image with an ONNX model.
//!
//! The service is created using a [`ServiceBuilder`], which can be created using [`ServiceBuilder::new`].
//!
//! Every classification goes through a [`Pipeline`], obtained with [`Service::pipeline`]:
//! the inputs are validated, the image is turned into a tensor, the model is run by the
//! configured [`Provider`] and its scores are ranked against the [`LabelTable`].
//! If you already have a prepared tensor, [`Service::run`] skips the first two steps.

mod external;
pub mod labels;
mod output;
pub mod prepare;
pub mod utility;

pub use external::{PreprocessCommand, DEFAULT_PREPROCESS_COMMAND};
pub use image::ImageError;
pub use output::{InferenceOutput, Prediction, ReportFormat, DEFAULT_TOP_K};

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info};
use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, WriteNpyError};
use strum::Display;
use thiserror::Error;

use crate::providers::{DefaultProvider, NamedTensors, Provider, ProviderError, Session};

use self::labels::LabelTable;

/// Model used by [`InputSource::FixedPaths`].
pub const FIXED_MODEL_PATH: &str = "./model.onnx";
/// Image used by [`InputSource::FixedPaths`].
pub const FIXED_IMAGE_PATH: &str = "./images.jpg";

/// Default paths of [`InputSource::PrecomputedTensor`].
pub const PRECOMPUTED_MODEL_PATH: &str = "model.onnx";
pub const PRECOMPUTED_IMAGE_PATH: &str = "input.jpg";
pub const PRECOMPUTED_TENSOR_PATH: &str = "output.npy";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("The {kind} file was not found: {}", .path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },
    #[error("Could not decode the image: {0}")]
    Decode(ImageError),
    #[error("The model returned {actual} scores but the label table has {expected} classes")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("The model returned an empty output")]
    EmptyOutput,
    #[error("The model returned a non finite score for class #{0}")]
    NonFiniteLogit(usize),
    #[error("The preprocessing command `{command}` failed ({}): {stderr}", exit_status(.status))]
    ExternalProcess {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("Could not read the tensor file: {0}")]
    TensorFile(#[from] ReadNpyError),
    #[error("Could not write the tensor file: {0}")]
    WriteTensor(#[from] WriteNpyError),
    #[error("The input tensor is invalid: {0}")]
    InvalidTensor(String),
    #[error("The used model is invalid: {0}")]
    InvalidModel(&'static str),
    #[error("The inference provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("The model produced no output named {0}")]
    OutputNotFound(String),
    #[error("Expected the scores of a single image, got an output of shape {0:?}")]
    UnexpectedBatch(Vec<usize>),
    #[error("Could not write the predictions: {0}")]
    Report(#[from] serde_json::Error),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("The pipeline was already used, it is {0}")]
    PipelineUsed(Stage),
}

fn exit_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => String::from("could not be started"),
    }
}

/// Which of the inputs of a run is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InputKind {
    Model,
    Image,
    Tensor,
}

/// Where the model and the input tensor of a run come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Paths given on the command line, the image is preprocessed in process.
    FileArgs { model: PathBuf, image: PathBuf },
    /// [`FIXED_MODEL_PATH`] and [`FIXED_IMAGE_PATH`], the image is preprocessed in process.
    FixedPaths,
    /// The tensor is read from a `.npy` file.
    ///
    /// When `command` is set it is run first to produce `tensor` from `image`,
    /// otherwise `tensor` must already exist and `image` is not used.
    PrecomputedTensor {
        model: PathBuf,
        image: PathBuf,
        tensor: PathBuf,
        command: Option<PreprocessCommand>,
    },
}

impl InputSource {
    /// The precomputed tensor source with the default paths and command.
    pub fn precomputed() -> Self {
        Self::PrecomputedTensor {
            model: PathBuf::from(PRECOMPUTED_MODEL_PATH),
            image: PathBuf::from(PRECOMPUTED_IMAGE_PATH),
            tensor: PathBuf::from(PRECOMPUTED_TENSOR_PATH),
            command: Some(PreprocessCommand::default()),
        }
    }

    pub fn model_path(&self) -> &Path {
        match self {
            Self::FileArgs { model, .. } | Self::PrecomputedTensor { model, .. } => model,
            Self::FixedPaths => Path::new(FIXED_MODEL_PATH),
        }
    }
}

/// The steps of a run. A run only moves forward, or to [`Stage::Failed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Stage {
    Idle,
    Validating,
    Preprocessing,
    Inferring,
    Ranking,
    Reporting,
    Done,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Number of predictions written by [`ReportFormat::Json`].
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceBuilder<P = DefaultProvider> {
    provider: P,
    labels: LabelTable,
    config: Config,
}

pub struct Service<P = DefaultProvider> {
    provider: P,
    labels: LabelTable,
    config: Config,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            provider: DefaultProvider::default(),
            labels: LabelTable::default(),
            config: Config::default(),
        }
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Provider> ServiceBuilder<P> {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    pub fn provider<Q: Provider>(self, provider: Q) -> ServiceBuilder<Q> {
        ServiceBuilder {
            provider,
            labels: self.labels,
            config: self.config,
        }
    }

    pub fn build(self) -> Service<P> {
        Service::new(self.provider, self.labels, self.config)
    }
}

impl<P: Provider> Service<P> {
    pub fn new(provider: P, labels: LabelTable, config: Config) -> Self {
        Self {
            provider,
            labels,
            config,
        }
    }

    pub fn current_config(&self) -> Config {
        self.config.clone()
    }

    pub fn labels(&self) -> LabelTable {
        self.labels
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// A fresh pipeline for a single run.
    pub fn pipeline(&self) -> Pipeline<'_, P> {
        Pipeline {
            service: self,
            stage: Stage::Idle,
        }
    }

    /// Classifies the input of `source` with a fresh pipeline.
    pub fn classify(&self, source: &InputSource) -> Result<InferenceOutput, ServiceError> {
        self.pipeline().run(source)
    }

    /// Runs the model on an already prepared tensor and ranks its scores.
    pub fn run(&self, model_path: &Path, input: ArrayD<f32>) -> Result<InferenceOutput, ServiceError> {
        let logits = self.infer(model_path, input)?;
        InferenceOutput::new(&logits, self.labels)
    }

    /// Loads the model, feeds `input` to its first input and returns its first output, flattened.
    fn infer(&self, model_path: &Path, input: ArrayD<f32>) -> Result<Vec<f32>, ServiceError> {
        info!(
            "Running {} with the {} provider, labels {}",
            model_path.display(),
            self.provider.name(),
            self.labels.version()
        );
        let session = self.provider.load(model_path, input.shape())?;

        let input_name = session
            .input_names()
            .first()
            .ok_or(ServiceError::InvalidModel("the model declares no input"))?
            .clone();
        let output_name = session
            .output_names()
            .first()
            .ok_or(ServiceError::InvalidModel("the model declares no output"))?
            .clone();

        let mut feeds = NamedTensors::new();
        feeds.insert(input_name, input);
        let mut results = session.run(feeds)?;

        let output = results
            .remove(&output_name)
            .ok_or(ServiceError::OutputNotFound(output_name))?;
        debug!("Output shape: {:?}", output.shape());

        // a leading batch dimension is fine as long as it holds a single image
        if output.ndim() > 1 && output.shape()[0] != 1 {
            return Err(ServiceError::UnexpectedBatch(output.shape().to_vec()));
        }
        Ok(output.iter().copied().collect())
    }
}

/// A single classification run.
///
/// The pipeline walks `Idle -> Validating -> Preprocessing -> Inferring -> Ranking`,
/// then `Reporting` if the predictions are written through it, and ends in `Done`.
/// Any error moves it to `Failed`. A pipeline cannot be run twice.
pub struct Pipeline<'s, P> {
    service: &'s Service<P>,
    stage: Stage,
}

impl<'s, P: Provider> Pipeline<'s, P> {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn run(&mut self, source: &InputSource) -> Result<InferenceOutput, ServiceError> {
        let result = self.rank(source);
        self.finish(result)
    }

    /// Runs the pipeline and writes the predictions to `writer`.
    pub fn run_and_report<W>(
        &mut self,
        source: &InputSource,
        format: ReportFormat,
        writer: W,
    ) -> Result<Vec<Prediction>, ServiceError>
    where
        W: Write,
    {
        let result = self.rank(source).and_then(|output| {
            self.advance(Stage::Reporting);
            output.report(format, self.service.config.top_k, writer)
        });
        self.finish(result)
    }

    fn rank(&mut self, source: &InputSource) -> Result<InferenceOutput, ServiceError> {
        if self.stage != Stage::Idle {
            return Err(ServiceError::PipelineUsed(self.stage));
        }

        self.advance(Stage::Validating);
        validate(source)?;

        self.advance(Stage::Preprocessing);
        let input = prepare_input(source)?;

        self.advance(Stage::Inferring);
        let logits = self.service.infer(source.model_path(), input)?;

        self.advance(Stage::Ranking);
        InferenceOutput::new(&logits, self.service.labels)
    }

    fn advance(&mut self, stage: Stage) {
        debug!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn finish<T>(&mut self, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
        match &result {
            Ok(_) => self.advance(Stage::Done),
            Err(ServiceError::PipelineUsed(_)) => (),
            Err(e) => {
                debug!("{} failed: {}", self.stage, e);
                self.stage = Stage::Failed;
            }
        }
        result
    }
}

/// Checks that every file the run needs exists, before anything is read.
fn validate(source: &InputSource) -> Result<(), ServiceError> {
    utility::ensure_exists(InputKind::Model, source.model_path())?;
    match source {
        InputSource::FileArgs { image, .. } => utility::ensure_exists(InputKind::Image, image),
        InputSource::FixedPaths => utility::ensure_exists(InputKind::Image, FIXED_IMAGE_PATH),
        InputSource::PrecomputedTensor {
            image,
            command: Some(_),
            ..
        } => utility::ensure_exists(InputKind::Image, image),
        InputSource::PrecomputedTensor {
            tensor,
            command: None,
            ..
        } => utility::ensure_exists(InputKind::Tensor, tensor),
    }
}

fn prepare_input(source: &InputSource) -> Result<ArrayD<f32>, ServiceError> {
    match source {
        InputSource::FileArgs { image, .. } => {
            info!("Preprocessing {}", image.display());
            Ok(utility::read_and_prepare_image(image)?.into_batched())
        }
        InputSource::FixedPaths => {
            info!("Preprocessing {}", FIXED_IMAGE_PATH);
            Ok(utility::read_and_prepare_image(FIXED_IMAGE_PATH)?.into_batched())
        }
        InputSource::PrecomputedTensor {
            image,
            tensor,
            command,
            ..
        } => {
            if let Some(command) = command {
                command.run(image, tensor)?;
            }
            info!("Reading the precomputed tensor {}", tensor.display());
            utility::read_tensor_file(tensor)
        }
    }
}
