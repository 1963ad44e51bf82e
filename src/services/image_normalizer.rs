// src/services/image_normalizer.rs

use bytes::Bytes;
use image::{
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    imageops::FilterType,
    DynamicImage, ImageError,
};

pub const MAX_IMAGE_WIDTH: u32 = 1920;
pub const JPEG_QUALITY: u8 = 85;
// PNGs acima disso viram JPEG
pub const PNG_TO_JPEG_THRESHOLD: usize = 2 * 1024 * 1024;

#[derive(Debug)]
pub struct NormalizedFile {
    pub bytes: Bytes,
    /// Extensão final (pode mudar de png para jpg).
    pub extension: String,
}

pub fn is_image_extension(extension: &str) -> bool {
    matches!(extension, "jpg" | "jpeg" | "png")
}

/// Redimensiona e re-codifica fotos; outros formatos passam intactos.
/// Trabalho de CPU: chamar dentro de `spawn_blocking`.
pub fn normalize(original: Bytes, extension: &str) -> Result<NormalizedFile, ImageError> {
    if !is_image_extension(extension) {
        return Ok(NormalizedFile { bytes: original, extension: extension.to_string() });
    }

    let decoded = image::load_from_memory(&original)?;
    let resized = shrink_to_max_width(decoded);

    if extension == "png" && original.len() <= PNG_TO_JPEG_THRESHOLD {
        let mut out = Vec::new();
        resized.write_with_encoder(PngEncoder::new(&mut out))?;
        return Ok(NormalizedFile { bytes: Bytes::from(out), extension: "png".to_string() });
    }

    let extension = if extension == "png" { "jpg" } else { extension };
    let mut out = Vec::new();
    // JPEG não tem canal alfa
    resized
        .to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;

    Ok(NormalizedFile { bytes: Bytes::from(out), extension: extension.to_string() })
}

// Nunca amplia; mantém a proporção
fn shrink_to_max_width(img: DynamicImage) -> DynamicImage {
    if img.width() <= MAX_IMAGE_WIDTH {
        return img;
    }
    let height = img.height();
    img.resize(MAX_IMAGE_WIDTH, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    // Ruído pseudo-aleatório: comprime mal, então o PNG fica grande
    fn noisy_png(width: u32, height: u32) -> Bytes {
        let mut state: u32 = 0x9E37_79B9;
        let img = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            image::Rgb([r, g, b])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img).write_with_encoder(PngEncoder::new(&mut out)).unwrap();
        Bytes::from(out)
    }

    #[test]
    fn large_png_becomes_a_narrower_jpeg() {
        let original = noisy_png(3000, 2000);
        assert!(original.len() > PNG_TO_JPEG_THRESHOLD);

        let normalized = normalize(original, "png").unwrap();
        assert_eq!(normalized.extension, "jpg");
        assert_eq!(image::guess_format(&normalized.bytes).unwrap(), ImageFormat::Jpeg);

        let stored = image::load_from_memory(&normalized.bytes).unwrap();
        assert_eq!(stored.width(), 1920);
        assert_eq!(stored.height(), 1280);
    }

    #[test]
    fn small_png_stays_png_with_original_dimensions() {
        let original = noisy_png(500, 400);
        assert!(original.len() < PNG_TO_JPEG_THRESHOLD);

        let normalized = normalize(original, "png").unwrap();
        assert_eq!(normalized.extension, "png");
        assert_eq!(image::guess_format(&normalized.bytes).unwrap(), ImageFormat::Png);

        let stored = image::load_from_memory(&normalized.bytes).unwrap();
        assert_eq!((stored.width(), stored.height()), (500, 400));
    }

    #[test]
    fn jpeg_keeps_its_extension() {
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(64, 48))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 95))
            .unwrap();

        let normalized = normalize(Bytes::from(jpeg), "jpeg").unwrap();
        assert_eq!(normalized.extension, "jpeg");
        let stored = image::load_from_memory(&normalized.bytes).unwrap();
        assert_eq!((stored.width(), stored.height()), (64, 48));
    }

    #[test]
    fn documents_pass_through_untouched() {
        let pdf = Bytes::from_static(b"%PDF-1.4 fake");
        let normalized = normalize(pdf.clone(), "pdf").unwrap();
        assert_eq!(normalized.bytes, pdf);
        assert_eq!(normalized.extension, "pdf");
    }

    #[test]
    fn corrupt_image_is_an_error() {
        assert!(normalize(Bytes::from_static(b"not a png"), "png").is_err());
    }
}
