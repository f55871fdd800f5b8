use image::imageops::FilterType;
use ndarray::{Array3, ArrayD, ArrayView2, Axis};

use super::ServiceError;

/// Side of the square image expected by the model.
pub const IMAGE_SIZE: usize = 224;
/// Number of color channels expected by the model.
pub const CHANNELS: usize = 3;
/// Per channel mean of the training set, in RGB order.
pub const MEAN: [f32; CHANNELS] = [0.485, 0.456, 0.406];
/// Per channel standard deviation of the training set, in RGB order.
pub const STD: [f32; CHANNELS] = [0.229, 0.224, 0.225];
/// Resampling filter used to bring every image to [`IMAGE_SIZE`].
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// A normalized image in planar layout: all the red values, then all the green ones,
/// then all the blue ones.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTensor {
    data: Array3<f32>,
}

impl ImageTensor {
    /// Shape of the tensor, without the batch dimension.
    pub const SHAPE: [usize; 3] = [CHANNELS, IMAGE_SIZE, IMAGE_SIZE];

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer, channel-major.
    pub fn as_slice(&self) -> &[f32] {
        // built through from_shape_fn, so always in standard layout
        self.data
            .as_slice()
            .expect("image tensors are always contiguous")
    }

    /// A single color plane, indexed as `[y, x]`.
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), channel)
    }

    /// Adds the batch dimension expected by the model: `[1, 3, 224, 224]`.
    pub fn into_batched(self) -> ArrayD<f32> {
        self.data.insert_axis(Axis(0)).into_dyn()
    }
}

/// Preprocess a single image.
///
/// The image is resized to 224x224 without keeping the aspect ratio, the alpha channel
/// (if any) is dropped and every sample is normalized with [`MEAN`] and [`STD`].
pub fn preprocessing(image: &image::DynamicImage) -> ImageTensor {
    let resized = image
        .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, RESIZE_FILTER)
        .to_rgb8();

    // indexing as (c, y, x) directly produces the planar layout
    let data = Array3::from_shape_fn(ImageTensor::SHAPE, |(c, y, x)| {
        let sample = resized.get_pixel(x as u32, y as u32)[c];
        (sample as f32 / 255.0 - MEAN[c]) / STD[c]
    });

    ImageTensor { data }
}

/// Numerically stable softmax over the raw model scores.
///
/// The maximum is subtracted before exponentiating, so the result does not change
/// when the same constant is added to every score.
pub fn softmax(logits: &[f32]) -> Result<Vec<f64>, ServiceError> {
    if logits.is_empty() {
        return Err(ServiceError::EmptyOutput);
    }
    if let Some(index) = logits.iter().position(|x| !x.is_finite()) {
        return Err(ServiceError::NonFiniteLogit(index));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps = logits
        .iter()
        .map(|&x| (x as f64 - max).exp())
        .collect::<Vec<_>>();
    let sum: f64 = exps.iter().sum();

    Ok(exps.into_iter().map(|x| x / sum).collect())
}
