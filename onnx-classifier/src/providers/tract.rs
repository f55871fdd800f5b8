use std::path::Path;

use log::debug;
use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::*;

use super::{NamedTensors, Provider, ProviderError, Session};

/// Provider backed by [tract](https://github.com/sonos/tract), a pure Rust ONNX runtime.
#[derive(Clone, Debug)]
pub struct TractProvider {
    optimize: bool,
}

pub struct TractSession {
    plan: TypedRunnableModel<TypedModel>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractProvider {
    /// When `optimize` is false the model is only type-checked, which loads faster
    /// but runs slower.
    pub fn new(optimize: bool) -> Self {
        Self { optimize }
    }
}

impl Default for TractProvider {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Provider for TractProvider {
    type Session = TractSession;

    fn name(&self) -> &str {
        "tract"
    }

    fn load(&self, model_path: &Path, input_shape: &[usize]) -> Result<TractSession, ProviderError> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact(input_shape.to_vec()).into()))
            .map_err(load_error)?;

        let model = if self.optimize {
            model.into_optimized()
        } else {
            model.into_typed()
        }
        .map_err(load_error)?;

        let input_names = outlet_names(&model, model.input_outlets().map_err(load_error)?);
        let output_names = outlet_names(&model, model.output_outlets().map_err(load_error)?);
        debug!(
            "Loaded {} with inputs {:?} and outputs {:?}",
            model_path.display(),
            input_names,
            output_names
        );

        let plan = model.into_runnable().map_err(load_error)?;
        Ok(TractSession {
            plan,
            input_names,
            output_names,
        })
    }
}

impl Session for TractSession {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn run(&self, mut feeds: NamedTensors) -> Result<NamedTensors, ProviderError> {
        // tract binds inputs by position, so follow the declaration order
        let mut inputs = tvec!();
        for name in &self.input_names {
            let tensor = feeds
                .remove(name)
                .ok_or_else(|| ProviderError::MissingInput(name.clone()))?;
            inputs.push(to_tract_tensor(&tensor)?.into());
        }

        let outputs = self.plan.run(inputs).map_err(run_error)?;

        self.output_names
            .iter()
            .zip(outputs.iter())
            .map(|(name, value)| {
                let value = value.cast_to::<f32>().map_err(run_error)?;
                let data = value.as_slice::<f32>().map_err(run_error)?.to_vec();
                let tensor = ArrayD::from_shape_vec(IxDyn(value.shape()), data)
                    .map_err(|e| ProviderError::Run(e.to_string()))?;
                Ok((name.clone(), tensor))
            })
            .collect()
    }
}

fn to_tract_tensor(tensor: &ArrayD<f32>) -> Result<Tensor, ProviderError> {
    // iter() walks the array in logical order whatever its memory layout
    let data = tensor.iter().copied().collect::<Vec<_>>();
    Tensor::from_shape::<f32>(tensor.shape(), &data).map_err(run_error)
}

fn outlet_names(model: &TypedModel, outlets: &[OutletId]) -> Vec<String> {
    outlets
        .iter()
        .map(|&outlet| {
            model
                .outlet_label(outlet)
                .map(str::to_string)
                .unwrap_or_else(|| model.node(outlet.node).name.clone())
        })
        .collect()
}

fn load_error(e: TractError) -> ProviderError {
    ProviderError::Load(format!("{e:#}"))
}

fn run_error(e: TractError) -> ProviderError {
    ProviderError::Run(format!("{e:#}"))
}
