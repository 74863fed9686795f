//! Image payload inspection.

use imagesize::{ImageError, ImageSize};
use thiserror::Error;

pub(crate) const MAX_DIMENSION: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageSizeError {
    #[error("upload a valid image; the file is empty")]
    Empty,
    #[error("upload a valid image; the file is not an image or is corrupted")]
    NotAnImage,
    #[error("image dimensions exceed {MAX_DIMENSION} pixels")]
    TooLarge,
}

/// Decode the header of `data` and return its dimensions.
pub fn read_image_size(data: &[u8]) -> Result<ImageSize, ImageSizeError> {
    if data.is_empty() {
        return Err(ImageSizeError::Empty);
    }

    let size = imagesize::blob_size(data).map_err(|_: ImageError| ImageSizeError::NotAnImage)?;

    if size.width == 0 || size.height == 0 {
        return Err(ImageSizeError::NotAnImage);
    }
    if size.width > MAX_DIMENSION || size.height > MAX_DIMENSION {
        return Err(ImageSizeError::TooLarge);
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
    ];

    #[test]
    fn reads_gif_dimensions() {
        let size = read_image_size(SMALL_GIF).expect("gif header");
        assert_eq!((size.width, size.height), (2, 1));
    }

    #[test]
    fn rejects_non_images() {
        assert_eq!(read_image_size(b""), Err(ImageSizeError::Empty));
        assert_eq!(
            read_image_size(b"definitely not an image"),
            Err(ImageSizeError::NotAnImage)
        );
    }
}
