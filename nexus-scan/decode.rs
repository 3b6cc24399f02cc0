use std::path::Path;

use image::{DynamicImage, ImageReader};
use nexus_core::Image;

/// Decode an image file, sniffing the format from its content rather than
/// trusting the extension
pub fn load_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Row-major 8-bit luma buffer plus its dimensions
pub fn to_gray(img: &DynamicImage) -> (Image, usize, usize) {
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    (gray.into_raw(), w as usize, h as usize)
}
