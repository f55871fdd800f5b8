mod tract;

pub use tract::*;

use std::path::Path;

use ndarray::ArrayD;
use thiserror::Error;

pub type DefaultProvider = TractProvider;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Could not load the model: {0}")]
    Load(String),
    #[error("Could not run the model: {0}")]
    Run(String),
    #[error("The model has no input named {0}")]
    MissingInput(String),
}

/// A trait that has to be implemented by all the inference providers.
///
/// A provider turns a model file into a [`Session`], which can then be fed with named tensors.
/// The crate never looks inside the model: everything it knows comes from the names
/// exposed by the session.
pub trait Provider {
    type Session: Session;

    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Loads the model at `model_path`, fixing its first input to `input_shape`.
    fn load(&self, model_path: &Path, input_shape: &[usize])
        -> Result<Self::Session, ProviderError>;
}

/// A loaded model, ready to run.
pub trait Session {
    /// Names of the model inputs, in declaration order.
    fn input_names(&self) -> &[String];

    /// Names of the model outputs, in declaration order.
    fn output_names(&self) -> &[String];

    fn run(&self, feeds: NamedTensors) -> Result<NamedTensors, ProviderError>;
}

/// Tensors bound to a name, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NamedTensors {
    tensors: Vec<(String, ArrayD<f32>)>,
}

impl NamedTensors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `tensor` to `name`, replacing any tensor already bound to it.
    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) {
        let name = name.into();
        match self.tensors.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = tensor,
            None => self.tensors.push((name, tensor)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tensor)| tensor)
    }

    pub fn remove(&mut self, name: &str) -> Option<ArrayD<f32>> {
        let position = self.tensors.iter().position(|(n, _)| n == name)?;
        Some(self.tensors.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.tensors.iter().map(|(n, t)| (n.as_str(), t))
    }
}

impl FromIterator<(String, ArrayD<f32>)> for NamedTensors {
    fn from_iter<I: IntoIterator<Item = (String, ArrayD<f32>)>>(iter: I) -> Self {
        let mut tensors = Self::new();
        for (name, tensor) in iter {
            tensors.insert(name, tensor);
        }
        tensors
    }
}
