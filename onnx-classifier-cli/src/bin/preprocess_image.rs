//! Writes the preprocessed tensor of an image to a `.npy` file.
//!
//! The output can be fed back to `onnx-classifier --source precomputed-tensor`,
//! either with `--reuse-tensor` or by using this binary as `--preprocess-cmd`.

use std::path::PathBuf;

use clap::Parser;
use log::info;
use onnx_classifier::service::{utility, ServiceError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image path.
    image: PathBuf,

    /// Output tensor path.
    output: PathBuf,
}

fn main() {
    if let Err(e) = exec_program() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn exec_program() -> Result<(), ServiceError> {
    env_logger::init();

    let args = Args::parse();

    let tensor = utility::read_and_prepare_image(&args.image)?.into_batched();
    utility::write_tensor_file(&args.output, &tensor)?;

    info!(
        "Wrote a tensor of shape {:?} to {}",
        tensor.shape(),
        args.output.display()
    );
    Ok(())
}
