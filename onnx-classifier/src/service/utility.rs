use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyExt};

use super::{prepare::preprocessing, prepare::ImageTensor, InputKind, ServiceError};

/// Fails with [`ServiceError::InputNotFound`] if nothing exists at `path`.
pub fn ensure_exists<P>(kind: InputKind, path: P) -> Result<(), ServiceError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.exists() {
        Ok(())
    } else {
        Err(ServiceError::InputNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Read and prepare an image for the model.
///
/// The file must exist, it is only decoded after that check.
pub fn read_and_prepare_image<P>(path: P) -> Result<ImageTensor, ServiceError>
where
    P: AsRef<Path>,
{
    ensure_exists(InputKind::Image, &path)?;
    let image = image::open(path).map_err(ServiceError::Decode)?;
    Ok(preprocessing(&image))
}

/// Read a tensor saved with `numpy.save`.
///
/// Both `float32` and `float64` payloads are accepted; the latter is narrowed to `f32`.
pub fn read_tensor_file<P>(path: P) -> Result<ArrayD<f32>, ServiceError>
where
    P: AsRef<Path>,
{
    ensure_exists(InputKind::Tensor, &path)?;
    let bytes = std::fs::read(path).map_err(|e| ServiceError::TensorFile(e.into()))?;

    let tensor = match ArrayD::<f32>::read_npy(bytes.as_slice()) {
        Ok(tensor) => tensor,
        Err(ReadNpyError::WrongDescriptor(_)) => {
            ArrayD::<f64>::read_npy(bytes.as_slice())?.mapv(|x| x as f32)
        }
        Err(e) => return Err(e.into()),
    };

    if tensor.is_empty() {
        return Err(ServiceError::InvalidTensor(format!(
            "the tensor of shape {:?} has no elements",
            tensor.shape()
        )));
    }
    Ok(tensor)
}

/// Write a tensor in the `.npy` format, as `float32`.
pub fn write_tensor_file<P>(path: P, tensor: &ArrayD<f32>) -> Result<(), ServiceError>
where
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    tensor.write_npy(&mut writer)?;
    writer.flush()?;
    Ok(())
}
