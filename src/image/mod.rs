//! Image generation module: text-to-image and image-to-image.

mod generate;
mod transform;

pub use generate::{
    GeneratedImage, ImageFormat, ImageGenerator, ImageRequest, DEFAULT_IMAGE_MODEL,
};
pub use transform::{ImageTransformer, TransformRequest, TransformStrength, TRANSFORM_MODEL};

pub(crate) use generate::with_extension;
