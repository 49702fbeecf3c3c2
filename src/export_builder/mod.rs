//! ExportBuilder - Zip and PDF Assembly
//!
//! ## Responsibilities
//!
//! - Pack an ordered list of images into a zip archive
//! - Render the same list as a one-image-per-page PDF
//!
//! Both builders are pure functions of their input sequence: no
//! network, no session awareness. The caller fetches the bytes and
//! decides the order (ascending capture timestamp everywhere in this
//! server).

use crate::error::{Error, Result};
use image::GenericImageView;
use printpdf::{ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, Px};
use std::io::{BufWriter, Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Build a zip archive with one entry per image, named by filename,
/// in exactly the input order. No directories.
pub fn build_zip(images: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (filename, bytes) in images {
        writer
            .start_file(filename.clone(), options)
            .map_err(|e| Error::Internal(format!("Zip entry {} failed: {}", filename, e)))?;
        writer.write_all(bytes)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::Internal(format!("Zip finalize failed: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Build a PDF with one page per image, each image scaled to fill the
/// page at `page_size` (width, height, in points).
///
/// Undecodable image bytes are skipped with a warning rather than
/// aborting the document. Zero drawable images yields a single blank
/// page; an empty page tree is a degenerate document most viewers
/// reject.
pub fn build_pdf(images: &[(String, Vec<u8>)], page_size: (f32, f32)) -> Result<Vec<u8>> {
    let (page_w_pt, page_h_pt) = page_size;
    let page_w = Mm(page_w_pt * MM_PER_PT);
    let page_h = Mm(page_h_pt * MM_PER_PT);

    let doc = PdfDocument::empty("Whiteboard Captures");
    let mut pages = 0usize;

    for (filename, bytes) in images {
        let decoded = match image::load_from_memory(bytes) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Undecodable image skipped in PDF");
                continue;
            }
        };

        let (px_w, px_h) = decoded.dimensions();
        let rgb = decoded.to_rgb8();

        let xobject = ImageXObject {
            width: Px(px_w as usize),
            height: Px(px_h as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: rgb.into_raw(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };

        let (page_idx, layer_idx) = doc.add_page(page_w, page_h, "Layer 1");
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        // At 72 dpi one pixel is one point, so the scale factors are
        // page extent over pixel extent.
        Image::from(xobject).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                rotate: None,
                scale_x: Some(page_w_pt / px_w as f32),
                scale_y: Some(page_h_pt / px_h as f32),
                dpi: Some(72.0),
            },
        );
        pages += 1;
    }

    if pages == 0 {
        doc.add_page(page_w, page_h, "Layer 1");
    }

    let mut buffer = Vec::new();
    doc.save(&mut BufWriter::new(&mut buffer))
        .map_err(|e| Error::Internal(format!("PDF serialization failed: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png_bytes(r: u8) -> Vec<u8> {
        let mut img = RgbImage::new(4, 4);
        for px in img.pixels_mut() {
            px.0 = [r, 0, 0];
        }
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_zip_preserves_order_and_names() {
        let images = vec![
            ("whiteboard_100.png".to_string(), png_bytes(10)),
            ("whiteboard_200.png".to_string(), png_bytes(20)),
            ("whiteboard_300.png".to_string(), png_bytes(30)),
        ];

        let archive_bytes = build_zip(&images).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        for (i, (name, _)) in images.iter().enumerate() {
            let entry = archive.by_index(i).unwrap();
            assert_eq!(entry.name(), name);
            assert!(!entry.is_dir());
        }
    }

    #[test]
    fn test_zip_entry_content_round_trips() {
        use std::io::Read;

        let images = vec![("whiteboard_100.png".to_string(), png_bytes(42))];
        let archive_bytes = build_zip(&images).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes)).unwrap();
        let mut entry = archive.by_name("whiteboard_100.png").unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, images[0].1);
    }

    #[test]
    fn test_empty_zip_is_valid() {
        let archive_bytes = build_zip(&[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(archive_bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_pdf_one_page_per_image() {
        let images = vec![
            ("whiteboard_100.png".to_string(), png_bytes(10)),
            ("whiteboard_200.png".to_string(), png_bytes(20)),
        ];

        let pdf = build_pdf(&images, (864.0, 576.0)).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let text = String::from_utf8_lossy(&pdf);
        let page_objects = text.matches("/Type/Page").count() - text.matches("/Type/Pages").count();
        assert_eq!(page_objects, 2);
    }

    #[test]
    fn test_pdf_zero_images_yields_blank_page() {
        let pdf = build_pdf(&[], (864.0, 576.0)).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let text = String::from_utf8_lossy(&pdf);
        let page_objects = text.matches("/Type/Page").count() - text.matches("/Type/Pages").count();
        assert_eq!(page_objects, 1);
    }

    #[test]
    fn test_pdf_skips_undecodable_image() {
        let images = vec![
            ("whiteboard_100.png".to_string(), png_bytes(10)),
            ("broken.png".to_string(), b"not an image".to_vec()),
        ];

        let pdf = build_pdf(&images, (864.0, 576.0)).unwrap();
        let text = String::from_utf8_lossy(&pdf);
        let page_objects = text.matches("/Type/Page").count() - text.matches("/Type/Pages").count();
        assert_eq!(page_objects, 1);
    }
}
