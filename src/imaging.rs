use crate::{Error, Result};
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Decodes an uploaded image. The format is sniffed from the content, never
/// from the filename.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(Error::image("image data is empty"));
    }

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| Error::image("unrecognized image format"))?;

    let image = reader.decode()?;

    debug!(
        "Decoded {:?} image {}x{} ({} bytes)",
        format,
        image.width(),
        image.height(),
        bytes.len()
    );

    Ok(image)
}

/// Runs [`decode_image`] on the blocking pool; large uploads are CPU-bound.
pub async fn decode_image_blocking<B>(bytes: B) -> Result<DynamicImage>
where
    B: AsRef<[u8]> + Send + 'static,
{
    tokio::task::spawn_blocking(move || decode_image(bytes.as_ref()))
        .await
        .map_err(|e| Error::internal(format!("image decoding task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn encode(format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 6, Rgb([200, 120, 40]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let image = decode_image(&encode(ImageFormat::Png)).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }

    #[test]
    fn test_decode_jpeg() {
        let image = decode_image(&encode(ImageFormat::Jpeg)).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }

    #[test]
    fn test_empty_bytes() {
        assert!(matches!(decode_image(&[]), Err(Error::Image(_))));
    }

    #[test]
    fn test_garbage_bytes() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(Error::Image(_))));
    }

    #[tokio::test]
    async fn test_decode_on_blocking_pool() {
        let image = decode_image_blocking(encode(ImageFormat::Png)).await.unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));

        let mut truncated = encode(ImageFormat::Png);
        truncated.truncate(20);
        let result = decode_image_blocking(truncated).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_truncated_png() {
        let mut bytes = encode(ImageFormat::Png);
        bytes.truncate(20);

        assert!(matches!(decode_image(&bytes), Err(Error::Decode(_))));
    }
}
