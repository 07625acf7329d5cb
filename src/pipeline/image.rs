//! Raster image → single-page PDF.
//!
//! The image is embedded at its native pixel resolution as one XObject that
//! fills the page exactly. Page size in points is `pixels × 72 / dpi`, so the
//! default of 72 DPI maps one pixel to one point.
//!
//! Pixels are always re-encoded from the decoded buffer rather than passing
//! JPEG bytes through with `/DCTDecode`. That keeps CMYK and progressive
//! JPEGs from leaking through with a colour space the page does not declare,
//! at the cost of larger files for photographs.
//!
//! The writer uses no timestamps and no random IDs, so the same image and
//! settings always produce the same bytes.

use crate::error::PipelineError;
use ::image::{ColorType, DynamicImage, ImageReader};
use lopdf::xref::XrefType;
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tracing::debug;

/// Decode an image file, guessing the codec from content first and the
/// extension second.
pub fn decode_image(path: &Path) -> Result<DynamicImage, PipelineError> {
    let reader = ImageReader::open(path)
        .map_err(|e| PipelineError::read_failed(path, e))?
        .with_guessed_format()
        .map_err(|e| PipelineError::read_failed(path, e))?;

    reader.decode().map_err(|e| PipelineError::ImageDecode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Decode `path` and return the bytes of a one-page PDF showing it.
pub fn convert_image(path: &Path, dpi: u32, pdf_version: &str) -> Result<Vec<u8>, PipelineError> {
    let img = decode_image(path)?;
    debug!(
        "Decoded {}: {}x{} {:?}",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );
    image_to_pdf(&img, dpi, pdf_version)
}

/// Build a one-page PDF whose page is exactly covered by `img`.
pub fn image_to_pdf(
    img: &DynamicImage,
    dpi: u32,
    pdf_version: &str,
) -> Result<Vec<u8>, PipelineError> {
    let (width, height) = (img.width(), img.height());
    let (color_space, pixels, alpha) = split_channels(img);

    let page_w = points(width, dpi);
    let page_h = points(height, dpi);

    let mut doc = Document::with_version(pdf_version);
    doc.reference_table.cross_reference_type = XrefType::CrossReferenceTable;

    let pages_id = doc.new_object_id();

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };

    if let Some(alpha) = alpha {
        let smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        let smask_id = doc.add_object(compressed(smask)?);
        image_dict.set("SMask", smask_id);
    }

    let image_id = doc.add_object(compressed(Stream::new(image_dict, pixels))?);

    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im1 Do\nQ\n", fmt_num(page_w), fmt_num(page_h));
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        },
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PipelineError::Internal(format!("PDF serialisation failed: {e}")))?;
    Ok(buffer)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Colour space name, 8-bit colour samples, and an alpha plane if the image
/// has any non-opaque pixel.
fn split_channels(img: &DynamicImage) -> (&'static str, Vec<u8>, Option<Vec<u8>>) {
    match img.color() {
        ColorType::L8 | ColorType::L16 => ("DeviceGray", img.to_luma8().into_raw(), None),
        ColorType::La8 | ColorType::La16 => {
            let raw = img.to_luma_alpha8().into_raw();
            let gray = raw.iter().step_by(2).copied().collect();
            let alpha: Vec<u8> = raw.iter().skip(1).step_by(2).copied().collect();
            ("DeviceGray", gray, opaque_or(alpha))
        }
        c if c.has_alpha() => {
            let raw = img.to_rgba8().into_raw();
            let mut rgb = Vec::with_capacity(raw.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(raw.len() / 4);
            for px in raw.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            ("DeviceRGB", rgb, opaque_or(alpha))
        }
        _ => ("DeviceRGB", img.to_rgb8().into_raw(), None),
    }
}

fn opaque_or(alpha: Vec<u8>) -> Option<Vec<u8>> {
    if alpha.iter().all(|&a| a == u8::MAX) {
        None
    } else {
        Some(alpha)
    }
}

fn compressed(mut stream: Stream) -> Result<Stream, PipelineError> {
    stream
        .compress()
        .map_err(|e| PipelineError::Internal(format!("Flate compression failed: {e}")))?;
    Ok(stream)
}

fn points(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 * 72.0 / dpi.max(1) as f32
}

/// Format a coordinate for a content stream without exponent notation.
fn fmt_num(v: f32) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v:.4}")
    }
}
