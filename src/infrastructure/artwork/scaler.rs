//! Artwork downscaling and re-encoding.

use std::borrow::Cow;
use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use tracing::trace;

use crate::domain::entities::ArtworkImage;
use crate::domain::errors::{ArtworkError, ArtworkResult};

/// Default bound on the larger side of cached artwork.
pub const DEFAULT_MAX_DIMENSION: u32 = 80;

const DATA_URI_PREFIX: &[u8] = b"data:";

/// Decodes `input`, shrinks it so neither side exceeds `max_dimension`, and
/// re-encodes it as PNG.
///
/// `input` may be raw image bytes or a base64 `data:` URI. Images that
/// already fit are re-encoded at their original size.
///
/// # Errors
/// Returns [`ArtworkError::Decode`] for unreadable input,
/// [`ArtworkError::Encode`] if PNG encoding fails, and
/// [`ArtworkError::InvalidInput`] for a zero `max_dimension`.
pub fn scale_artwork(input: &[u8], max_dimension: u32) -> ArtworkResult<ArtworkImage> {
    if max_dimension == 0 {
        return Err(ArtworkError::invalid_input(
            "maximum image dimension must be positive",
        ));
    }

    let raw = decode_source(input)?;
    let decoded = image::load_from_memory(&raw)
        .map_err(|e| ArtworkError::decode(format!("Failed to decode image: {e}")))?;

    let (width, height) = (decoded.width(), decoded.height());
    let scaled = if width.max(height) > max_dimension {
        decoded.thumbnail(max_dimension, max_dimension)
    } else {
        decoded
    };

    trace!(
        from_width = width,
        from_height = height,
        to_width = scaled.width(),
        to_height = scaled.height(),
        "Scaled artwork"
    );

    encode_png(&scaled)
}

/// Runs [`scale_artwork`] on the blocking thread pool.
///
/// # Errors
/// Returns the scaler's error, or [`ArtworkError::Internal`] if the task
/// panicked.
pub async fn scale_artwork_blocking(input: Bytes, max_dimension: u32) -> ArtworkResult<ArtworkImage> {
    tokio::task::spawn_blocking(move || scale_artwork(&input, max_dimension))
        .await
        .map_err(|e| ArtworkError::internal(format!("Scale task panicked: {e}")))?
}

fn decode_source(input: &[u8]) -> ArtworkResult<Cow<'_, [u8]>> {
    if !input.starts_with(DATA_URI_PREFIX) {
        return Ok(Cow::Borrowed(input));
    }

    let comma = input
        .iter()
        .position(|&b| b == b',')
        .ok_or_else(|| ArtworkError::decode("data URI has no payload"))?;
    let (header, payload) = (&input[..comma], &input[comma + 1..]);

    if !header.ends_with(b";base64") {
        return Err(ArtworkError::decode("only base64 data URIs are supported"));
    }

    let payload: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(payload)
        .map(Cow::Owned)
        .map_err(|e| ArtworkError::decode(format!("Invalid base64 payload: {e}")))
}

fn encode_png(image: &DynamicImage) -> ArtworkResult<ArtworkImage> {
    // PNG has no float sample support.
    let converted;
    let image = match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            converted = DynamicImage::ImageRgba8(image.to_rgba8());
            &converted
        }
        other => other,
    };

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ArtworkError::encode(format!("Failed to encode PNG: {e}")))?;

    Ok(ArtworkImage::new(
        buffer.into_inner(),
        image.width(),
        image.height(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn png_of(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::new_rgb8(width, height);
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("encode test image");
        buffer.into_inner()
    }

    fn jpeg_of(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::new_rgb8(width, height);
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .expect("encode test image");
        buffer.into_inner()
    }

    #[test_case(4000, 2000, 80, (80, 40) ; "wide image is bounded by width")]
    #[test_case(2000, 4000, 80, (40, 80) ; "tall image is bounded by height")]
    #[test_case(81, 81, 80, (80, 80) ; "square just over the bound")]
    #[test_case(50, 30, 80, (50, 30) ; "small image is not enlarged")]
    #[test_case(80, 10, 80, (80, 10) ; "image at the bound is untouched")]
    fn test_scaled_dimensions(width: u32, height: u32, max: u32, expected: (u32, u32)) {
        let scaled = scale_artwork(&png_of(width, height), max).expect("scale");

        assert!(scaled.width().abs_diff(expected.0) <= 1);
        assert!(scaled.height().abs_diff(expected.1) <= 1);
        assert!(scaled.width().max(scaled.height()) <= max);
    }

    #[test]
    fn test_output_is_png_regardless_of_input() {
        let scaled = scale_artwork(&jpeg_of(200, 100), 80).expect("scale");

        let format = image::guess_format(scaled.bytes()).expect("guess format");
        assert_eq!(format, ImageFormat::Png);
        assert_eq!((scaled.width(), scaled.height()), (80, 40));
    }

    #[test]
    fn test_accepts_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(png_of(160, 160)));

        let scaled = scale_artwork(uri.as_bytes(), 80).expect("scale");
        assert_eq!((scaled.width(), scaled.height()), (80, 80));
    }

    #[test]
    fn test_rejects_corrupt_bytes() {
        let result = scale_artwork(b"definitely not an image", 80);
        assert!(matches!(result, Err(ArtworkError::Decode { .. })));
    }

    #[test]
    fn test_rejects_non_base64_data_uri() {
        let result = scale_artwork(b"data:image/png,rawbytes", 80);
        assert!(matches!(result, Err(ArtworkError::Decode { .. })));
    }

    #[test]
    fn test_rejects_zero_dimension() {
        let result = scale_artwork(&png_of(10, 10), 0);
        assert!(matches!(result, Err(ArtworkError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_blocking_wrapper() {
        let scaled = scale_artwork_blocking(Bytes::from(png_of(300, 150)), 80)
            .await
            .expect("scale");
        assert_eq!((scaled.width(), scaled.height()), (80, 40));
    }
}
