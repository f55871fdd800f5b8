#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    path::{Path, PathBuf},
};

use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{ArrayD, IxDyn};
use onnx_classifier::providers::{NamedTensors, Provider, ProviderError, Session};

pub const INPUT_NAME: &str = "input";
pub const OUTPUT_NAME: &str = "output";

/// A provider that never reads the model and always answers with the same scores.
pub struct MockProvider {
    output: ArrayD<f32>,
    output_name: String,
    loads: Cell<usize>,
    runs: Cell<usize>,
    input_shape: RefCell<Option<Vec<usize>>>,
}

pub struct MockSession<'p> {
    provider: &'p MockProvider,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl MockProvider {
    /// Answers with `logits` as a `[1, N]` tensor.
    pub fn with_logits(logits: &[f32]) -> Self {
        let output = ArrayD::from_shape_vec(IxDyn(&[1, logits.len()]), logits.to_vec())
            .expect("valid shape");
        Self::with_output(output)
    }

    pub fn with_output(output: ArrayD<f32>) -> Self {
        Self {
            output,
            output_name: OUTPUT_NAME.to_string(),
            loads: Cell::new(0),
            runs: Cell::new(0),
            input_shape: RefCell::new(None),
        }
    }

    /// Produces its output under another name than the one it declares.
    pub fn with_misnamed_output(mut self) -> Self {
        self.output_name = String::from("something_else");
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    pub fn runs(&self) -> usize {
        self.runs.get()
    }

    pub fn input_shape(&self) -> Option<Vec<usize>> {
        self.input_shape.borrow().clone()
    }
}

impl<'p> Provider for &'p MockProvider {
    type Session = MockSession<'p>;

    fn name(&self) -> &str {
        "mock"
    }

    fn load(&self, _model_path: &Path, input_shape: &[usize]) -> Result<MockSession<'p>, ProviderError> {
        self.loads.set(self.loads.get() + 1);
        self.input_shape.replace(Some(input_shape.to_vec()));
        Ok(MockSession {
            provider: *self,
            input_names: vec![INPUT_NAME.to_string()],
            output_names: vec![OUTPUT_NAME.to_string()],
        })
    }
}

impl Session for MockSession<'_> {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn run(&self, feeds: NamedTensors) -> Result<NamedTensors, ProviderError> {
        let input = feeds
            .get(INPUT_NAME)
            .ok_or_else(|| ProviderError::MissingInput(INPUT_NAME.to_string()))?;
        assert_eq!(Some(input.shape().to_vec()), self.provider.input_shape());

        self.provider.runs.set(self.provider.runs.get() + 1);
        let mut outputs = NamedTensors::new();
        outputs.insert(self.provider.output_name.clone(), self.provider.output.clone());
        Ok(outputs)
    }
}

/// Writes a plain colored image, the format is chosen from the extension.
pub fn write_image(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb(color)))
        .save(&path)
        .expect("could not write test image");
    path
}

/// An empty file standing in for a model, the mock provider never reads it.
pub fn write_fake_model(dir: &Path) -> PathBuf {
    let path = dir.join("model.onnx");
    std::fs::write(&path, b"not really a model").expect("could not write fake model");
    path
}
