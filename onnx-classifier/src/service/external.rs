use std::{fmt, path::Path, process::Command, str::FromStr};

use log::{debug, info};

use super::ServiceError;

/// Default command producing the tensor file from an image.
pub const DEFAULT_PREPROCESS_COMMAND: &str = "python3 preprocess_image.py";

/// An external program that turns an image into a tensor file.
///
/// It is invoked as `<program> <args..> <image> <tensor>` and must exit with status 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreprocessCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PreprocessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Runs the command and waits for it to finish.
    pub fn run(&self, image: &Path, tensor: &Path) -> Result<(), ServiceError> {
        info!("Preprocessing {} with `{}`", image.display(), self);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .arg(tensor)
            .output()
            .map_err(|e| ServiceError::ExternalProcess {
                command: self.to_string(),
                status: None,
                stderr: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("`{}` wrote: {}", self, stdout.trim());
        }

        if !output.status.success() {
            return Err(ServiceError::ExternalProcess {
                command: self.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PreprocessCommand {
    fn default() -> Self {
        Self::new("python3").arg("preprocess_image.py")
    }
}

impl FromStr for PreprocessCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| "Empty preprocessing command".to_string())?;
        Ok(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for PreprocessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
