//! PDF page renderer

use image::{DynamicImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::Cursor;
use std::path::Path;

use super::PageRenderer;
use crate::error::AssemblyError;
use crate::staging::StagedImage;

/// Renders each image as one full-bleed PDF page
///
/// Pages take the pixel size of their image (one point per pixel). Every
/// image is embedded as a baseline JPEG; non-JPEG sources are decoded and
/// re-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    /// Create a PDF renderer
    pub fn new() -> Self {
        Self
    }
}

/// Decoded page ready for embedding
struct PageImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

fn load_page(page: &StagedImage) -> Result<PageImage, AssemblyError> {
    let render_error = |reason: String| AssemblyError::Render {
        path: page.path.clone(),
        reason,
    };

    let bytes = std::fs::read(&page.path).map_err(|e| render_error(e.to_string()))?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| render_error(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());

    let reusable = matches!(image::guess_format(&bytes), Ok(ImageFormat::Jpeg))
        && matches!(decoded, DynamicImage::ImageRgb8(_));
    if reusable {
        return Ok(PageImage {
            width,
            height,
            jpeg: bytes,
        });
    }

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(decoded.to_rgb8())
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(|e| render_error(e.to_string()))?;

    Ok(PageImage {
        width,
        height,
        jpeg,
    })
}

impl PageRenderer for PdfRenderer {
    fn render(&self, pages: &[StagedImage], output: &Path) -> Result<usize, AssemblyError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

        for page in pages {
            let image = load_page(page)?;
            let (width, height) = (i64::from(image.width), i64::from(image.height));

            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                image.jpeg,
            ));

            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            width.into(),
                            0.into(),
                            0.into(),
                            height.into(),
                            0.into(),
                            0.into(),
                        ],
                    ),
                    Operation::new("Do", vec!["Im0".into()]),
                    Operation::new("Q", vec![]),
                ],
            };
            let encoded = content.encode().map_err(|e| AssemblyError::Render {
                path: page.path.clone(),
                reason: e.to_string(),
            })?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        "Im0" => image_id,
                    },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        doc.save(output).map_err(|e| AssemblyError::Persist {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(count)
    }

    fn name(&self) -> &'static str {
        "pdf"
    }
}
