use std::path::PathBuf;

use clap::Parser;
use onnx_classifier::service::{PreprocessCommand, DEFAULT_PREPROCESS_COMMAND, PRECOMPUTED_TENSOR_PATH};
use strum::{Display, EnumString};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path of the ONNX model.
    /// Required with --source file-args.
    pub model: Option<PathBuf>,

    /// Path of the image to classify.
    /// Required with --source file-args.
    pub image: Option<PathBuf>,

    /// Where the model and the input come from.
    /// Supported sources: file-args, fixed-paths, precomputed-tensor
    /// Default: file-args
    #[arg(long, default_value = "file-args")]
    pub source: Source,

    /// Number of top infered class probabilities to show. Must be greater than 0 and less or equal than 1000.
    /// Example: --show 10
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub show: u16,

    /// Print only the most probable class on a single line instead of a JSON array.
    #[arg(long)]
    pub single: bool,

    /// Tensor file read by --source precomputed-tensor.
    #[arg(long, default_value = PRECOMPUTED_TENSOR_PATH)]
    pub tensor: PathBuf,

    /// Command producing the tensor file, called with the image and tensor paths appended.
    /// Example: --preprocess-cmd "preprocess-image"
    #[arg(long, default_value = DEFAULT_PREPROCESS_COMMAND)]
    pub preprocess_cmd: PreprocessCommand,

    /// Read the existing tensor file instead of running the preprocessing command.
    #[arg(long)]
    pub reuse_tensor: bool,

    /// Skip the graph optimizations of the model. Loads faster, runs slower.
    #[arg(long)]
    pub no_optimize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Source {
    FileArgs,
    FixedPaths,
    PrecomputedTensor,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn positional_paths() {
        let args = Args::parse_from(["onnx-classifier", "model.onnx", "apple.jpg"]);
        assert_eq!(args.source, Source::FileArgs);
        assert_eq!(args.model, Some(PathBuf::from("model.onnx")));
        assert_eq!(args.image, Some(PathBuf::from("apple.jpg")));
        assert_eq!(args.show, 5);
        assert!(!args.single);
    }

    #[test]
    fn precomputed_defaults() {
        let args = Args::parse_from(["onnx-classifier", "--source", "precomputed-tensor"]);
        assert_eq!(args.source, Source::PrecomputedTensor);
        assert_eq!(args.tensor, PathBuf::from("output.npy"));
        assert_eq!(args.preprocess_cmd, PreprocessCommand::default());
        assert!(!args.reuse_tensor);
    }

    #[test]
    fn show_must_be_positive() {
        assert!(Args::try_parse_from(["onnx-classifier", "--show", "0"]).is_err());
    }

    #[test]
    fn unknown_source_is_refused() {
        assert!(Args::try_parse_from(["onnx-classifier", "--source", "stdin"]).is_err());
    }

    #[test]
    fn source_names() {
        assert_eq!(Source::FixedPaths.to_string(), "fixed-paths");
        assert_eq!("file-args".parse::<Source>().unwrap(), Source::FileArgs);
    }
}
