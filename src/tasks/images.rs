// src/tasks/images.rs

//! Lossless-ish image optimization with a content-hash cache.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use crate::config::{BuildContext, GroupKind};
use crate::errors::{PipelineError, Result};
use crate::tasks::cache::{HashCache, image_cache_path, keyed_content_hash};
use crate::tasks::output::write_output;
use crate::tasks::registry::BuildStep;
use crate::tasks::report::{OutputFile, TaskReport};
use crate::tasks::sources::collect_group_sources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Png,
    Jpeg,
    Passthrough,
}

impl Codec {
    fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Codec::Png,
            Some("jpg" | "jpeg") => Codec::Jpeg,
            _ => Codec::Passthrough,
        }
    }

    /// Encoder settings that affect the output bytes.
    fn cache_key(self, quality: u8) -> String {
        match self {
            Codec::Png => "png best adaptive".to_string(),
            Codec::Jpeg => format!("jpeg q{quality}"),
            Codec::Passthrough => "copy".to_string(),
        }
    }
}

/// Optimize every image source that changed since the last run.
pub async fn optimize_images(ctx: Arc<BuildContext>) -> Result<TaskReport> {
    let sources = collect_group_sources(&ctx, GroupKind::Images)?;
    let dest = ctx.dest_dir(GroupKind::Images);
    let quality = ctx.config().jpeg_quality;
    let mut cache = HashCache::load(image_cache_path(&ctx.state_dir()))?;
    let mut report = TaskReport::new(BuildStep::Images);

    for source in sources {
        let original = tokio::fs::read(&source.path)
            .await
            .with_context(|| format!("reading image {:?}", source.path))?;
        let codec = Codec::for_path(&source.path);
        let hash = keyed_content_hash(&original, &codec.cache_key(quality));
        let target = dest.join(&source.base_rel);

        if cache.is_fresh(&source.rel, &hash) && target.exists() {
            debug!(source = %source.rel, "image unchanged, skipping");
            let bytes = tokio::fs::metadata(&target).await?.len();
            report.outputs.push(OutputFile { path: target, bytes });
            report.cached.push(source.rel);
            continue;
        }

        let rel = source.rel.clone();
        let optimized = tokio::task::spawn_blocking(move || optimize(codec, original, quality))
            .await
            .context("image optimizer task panicked")?
            .map_err(|e| PipelineError::ImageOptimize {
                file: rel,
                message: e.to_string(),
            })?;

        report.outputs.push(write_output(&target, &optimized).await?);
        cache.record(source.rel.clone(), hash);
        report.transformed.push(source.rel);
    }

    cache.save()?;
    info!(
        task = %BuildStep::Images,
        transformed = report.transformed.len(),
        cached = report.cached.len(),
        "image cache updated"
    );
    report.log_summary();
    Ok(report)
}

/// Re-encode `original` and keep whichever encoding is smaller.
fn optimize(codec: Codec, original: Vec<u8>, quality: u8) -> image::ImageResult<Vec<u8>> {
    let reencoded = match codec {
        Codec::Png => reencode_png(&original)?,
        Codec::Jpeg => reencode_jpeg(&original, quality)?,
        Codec::Passthrough => return Ok(original),
    };
    if reencoded.len() < original.len() {
        Ok(reencoded)
    } else {
        Ok(original)
    }
}

fn reencode_png(bytes: &[u8]) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn reencode_jpeg(bytes: &[u8], quality: u8) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(32, 32, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let mut out = Vec::new();
        // Fast + no filtering leaves room for the optimizer to win.
        let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        DynamicImage::ImageRgb8(img)
            .write_with_encoder(encoder)
            .expect("encode fixture");
        out
    }

    #[test]
    fn codec_is_chosen_by_extension() {
        assert_eq!(Codec::for_path(Path::new("a/b.PNG")), Codec::Png);
        assert_eq!(Codec::for_path(Path::new("a/b.jpeg")), Codec::Jpeg);
        assert_eq!(Codec::for_path(Path::new("a/b.svg")), Codec::Passthrough);
    }

    #[test]
    fn optimized_png_is_never_larger() {
        let original = png_bytes();
        let optimized = optimize(Codec::Png, original.clone(), 80).expect("optimize");
        assert!(optimized.len() <= original.len());
        let decoded = image::load_from_memory(&optimized).expect("still a valid png");
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn passthrough_bytes_are_untouched() {
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec();
        assert_eq!(optimize(Codec::Passthrough, svg.clone(), 80).expect("copy"), svg);
    }

    #[test]
    fn corrupt_png_is_an_error() {
        assert!(optimize(Codec::Png, b"not a png".to_vec(), 80).is_err());
    }
}
