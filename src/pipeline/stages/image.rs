// src/pipeline/stages/image.rs

//! Lossless-ish image recompression.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, GenericImageView, ImageEncoder, ImageFormat};
use tracing::{debug, info};

use crate::errors::StageError;
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Re-encodes PNG (best compression, adaptive filtering) and JPEG (at
/// `jpeg_quality`). The original bytes are kept when re-encoding does not
/// make the file smaller. Other formats pass through untouched.
#[derive(Debug, Clone)]
pub struct OptimizeImageStage {
    jpeg_quality: u8,
}

impl OptimizeImageStage {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

fn encode_png(bytes: &[u8]) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let (width, height) = img.dimensions();
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), width, height, img.color())?;
    Ok(out)
}

fn encode_jpeg(bytes: &[u8], quality: u8) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    let (width, height) = img.dimensions();
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode(
        rgb.as_raw(),
        width,
        height,
        ColorType::Rgb8,
    )?;
    Ok(out)
}

/// Optimise one record in place.
pub fn optimize_record(record: &mut FileRecord, jpeg_quality: u8) -> Result<(), StageError> {
    let encoded = match record.extension().as_deref() {
        Some("png") => encode_png(&record.contents),
        Some("jpg" | "jpeg") => encode_jpeg(&record.contents, jpeg_quality),
        _ => return Ok(()),
    }
    .map_err(|e| {
        StageError::failed(
            "optimize-image",
            format!("{}: {e}", record.path().display()),
        )
    })?;

    let before = record.contents.len();
    if encoded.len() < before {
        debug!(file = %record.path().display(), before, after = encoded.len(), "image optimised");
        record.contents = encoded;
    } else {
        debug!(file = %record.path().display(), before, "already optimal; keeping original");
    }
    Ok(())
}

impl Stage for OptimizeImageStage {
    fn name(&self) -> &str {
        "optimize-image"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        let quality = self.jpeg_quality;
        Box::pin(async move {
            let records = tokio::task::spawn_blocking(move || {
                let mut records = records;
                let before: usize = records.iter().map(|r| r.contents.len()).sum();
                for record in records.iter_mut() {
                    optimize_record(record, quality)?;
                }
                let after: usize = records.iter().map(|r| r.contents.len()).sum();
                info!(files = records.len(), before, after, "images optimised");
                Ok::<_, StageError>(records)
            })
            .await
            .map_err(|e| StageError::failed("optimize-image", e))??;

            Ok::<_, StageError>(records)
        })
    }
}
