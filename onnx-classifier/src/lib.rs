//! Image classification on top of ONNX models.
//!
//! The crate is split in two layers:
//! - [`providers`] hides the inference engine behind the [`Provider`](providers::Provider) trait;
//! - [`service`] owns everything around it: image preprocessing, ranking of the model scores
//!   and the pipeline that ties them together.

pub mod providers;
pub mod service;
