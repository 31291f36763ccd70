//! Export Pipeline
//!
//! PNG, single-page PDF and template JSON output for both the store's
//! active card and the designer canvas. Exports are one-shot; failures
//! surface as [`ExportError`] and are never retried.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::designer::{DesignerCanvas, DesignerError};
use crate::print::PrintLayout;
use crate::render::{render, RenderError, RenderOptions, Scene};
use crate::store::CardState;
use crate::templates::TemplateDesign;

/// File stem used for exports of the active card.
pub const DEFAULT_EXPORT_STEM: &str = "business-card";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Designer(#[from] DesignerError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Page layout failed: {0}")]
    Layout(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Pdf,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Lowercased name with all whitespace removed; the id and file stem of
/// an authored template.
pub fn template_slug(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect()
}

/// `<name>-preview.<ext>`, or `template-preview.<ext>` for a blank name.
pub fn raster_file_name(name: &str, extension: &str) -> String {
    let name = name.trim();
    let stem = if name.is_empty() { "template" } else { name };
    format!("{stem}-preview.{extension}")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub filename: String,
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
    pub byte_length: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    fn new(filename: String, format: ExportFormat, size: Option<[u32; 2]>, bytes: Vec<u8>) -> Self {
        Self { filename, format, size, byte_length: bytes.len(), bytes }
    }

    pub fn data_base64(&self) -> String {
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &self.bytes)
    }

    /// Write into `dir` under the export's file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// RGB samples with alpha composited over white.
fn flatten_on_white(img: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(img.width() as usize * img.height() as usize * 3);
    for p in img.pixels() {
        let a = p[3] as u32;
        for c in 0..3 {
            rgb.push(((p[c] as u32 * a + 255 * (255 - a)) / 255) as u8);
        }
    }
    rgb
}

fn pdf_err(e: impl fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// One A4 landscape page with the image at full page width, centred vertically.
pub fn encode_pdf(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let layout = PrintLayout::a4_landscape(img.width() as f64, img.height() as f64)
        .map_err(ExportError::Layout)?;
    let (page_w, page_h) = layout.page_points();
    let (x, y, w, h) = layout.image_rect_points();

    let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
    zlib.write_all(&flatten_on_white(img))?;
    let pixels = zlib.finish()?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img.width() as i64,
            "Height" => img.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        pixels,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w as f32),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(h as f32),
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Card".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_err)?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_w as f32),
            Object::Real(page_h as f32),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Card" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_err)?;
    Ok(out)
}

pub fn template_json(template: &TemplateDesign) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(template)?)
}

pub struct Exporter {
    options: RenderOptions,
}

impl Exporter {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn raster(&self, scene: &Scene<'_>, options: &RenderOptions, format: ExportFormat, filename: String) -> Result<ExportedFile, ExportError> {
        let img = render(scene, options)?;
        let size = Some([img.width(), img.height()]);
        let bytes = match format {
            ExportFormat::Pdf => encode_pdf(&img)?,
            _ => encode_png(&img)?,
        };
        Ok(ExportedFile::new(filename, format, size, bytes))
    }

    /// Export the store's active card. JSON exports the active template.
    pub fn export_card(&self, state: &CardState, format: ExportFormat) -> Result<ExportedFile, ExportError> {
        let result = match format {
            ExportFormat::Png | ExportFormat::Pdf => {
                let options = RenderOptions {
                    show_placeholders: false,
                    show_guides: false,
                    show_grid: false,
                    ..self.options.clone()
                };
                let filename = format!("{DEFAULT_EXPORT_STEM}.{}", format.extension());
                self.raster(&Scene::from_state(state), &options, format, filename)
            }
            ExportFormat::Json => {
                let template = &state.current_template;
                let json = template_json(template)?;
                let stem = template_slug(&template.name);
                let stem = if stem.is_empty() { template.id.clone() } else { stem };
                Ok(ExportedFile::new(format!("{stem}.json"), format, None, json.into_bytes()))
            }
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, %format, "card export failed");
        }
        result
    }

    /// Export the designer canvas. Raster output shows field placeholders,
    /// as the canvas does; JSON needs a template name.
    pub fn export_design(&self, canvas: &DesignerCanvas, format: ExportFormat) -> Result<ExportedFile, ExportError> {
        let result = match format {
            ExportFormat::Png | ExportFormat::Pdf => {
                if !canvas.can_export_raster() {
                    Err(DesignerError::NoFields.into())
                } else {
                    let template = canvas.preview_template();
                    let options = RenderOptions {
                        show_placeholders: true,
                        show_guides: false,
                        show_grid: false,
                        ..self.options.clone()
                    };
                    let filename = canvas.raster_file_name(format.extension());
                    self.raster(&Scene::layout(&template), &options, format, filename)
                }
            }
            ExportFormat::Json => canvas
                .to_template()
                .map_err(ExportError::from)
                .and_then(|template| {
                    let json = template_json(&template)?;
                    Ok(ExportedFile::new(format!("{}.json", template.id), format, None, json.into_bytes()))
                }),
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, %format, "design export failed");
        }
        result
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;
    use crate::templates::Point;

    fn fast() -> Exporter {
        Exporter::new(RenderOptions { pixel_ratio: 1, ..RenderOptions::default() })
    }

    #[test]
    fn slugs_drop_whitespace() {
        assert_eq!(template_slug("My  Fancy\tCard"), "myfancycard");
        assert_eq!(template_slug(""), "");
    }

    #[test]
    fn raster_names_fall_back_to_template() {
        assert_eq!(raster_file_name("Acme", "png"), "Acme-preview.png");
        assert_eq!(raster_file_name("  ", "pdf"), "template-preview.pdf");
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("PNG".parse::<ExportFormat>(), Ok(ExportFormat::Png));
        assert!("gif".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
    }

    #[test]
    fn card_png_has_signature_and_double_size() {
        let file = Exporter::default().export_card(&CardState::new(), ExportFormat::Png).unwrap();
        assert_eq!(file.filename, "business-card.png");
        assert_eq!(&file.bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(file.size, Some([1286, 766]));

        let decoded = image::load_from_memory(&file.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1286, 766));
    }

    #[test]
    fn card_pdf_is_a_single_page() {
        let file = fast().export_card(&CardState::new(), ExportFormat::Pdf).unwrap();
        assert_eq!(file.filename, "business-card.pdf");
        assert!(file.bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&file.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn declared_template_size_does_not_change_raster_output() {
        for (id, size) in [("wide", "1000, \"height\": 600"), ("tall", "643, \"height\": 1200"), ("huge", "1e6, \"height\": 1e6")] {
            let body = format!(r#"{{"id": "{id}", "name": "{id}", "size": {{"width": {size}}}, "fields": []}}"#);
            let imported = crate::templates::import_template(&body).unwrap();
            let state = CardState::new().add_custom_template(imported.template).set_template(id);
            assert_eq!(state.current_template_id, id);

            let png = Exporter::default().export_card(&state, ExportFormat::Png).unwrap();
            assert_eq!(png.size, Some([1286, 766]), "{id}");

            let pdf = fast().export_card(&state, ExportFormat::Pdf).unwrap();
            assert_eq!(Document::load_mem(&pdf.bytes).unwrap().get_pages().len(), 1, "{id}");
        }
    }

    #[test]
    fn empty_designer_cannot_export() {
        let canvas = DesignerCanvas::default();
        for format in [ExportFormat::Png, ExportFormat::Pdf, ExportFormat::Json] {
            let err = fast().export_design(&canvas, format).unwrap_err();
            assert!(matches!(err, ExportError::Designer(DesignerError::NoFields)));
        }
    }

    #[test]
    fn designer_json_round_trips_through_import() {
        let mut canvas = DesignerCanvas::default();
        canvas.handle(InputEvent::DropKey { key: "email".into(), at: Point::new(200.0, 150.0) });

        let err = fast().export_design(&canvas, ExportFormat::Json).unwrap_err();
        assert!(matches!(err, ExportError::Designer(DesignerError::MissingName)));

        canvas.handle(InputEvent::SetTemplateName { name: "Sales Team".into() });
        let file = fast().export_design(&canvas, ExportFormat::Json).unwrap();
        assert_eq!(file.filename, "salesteam.json");

        let imported = crate::templates::import_template(std::str::from_utf8(&file.bytes).unwrap()).unwrap();
        assert_eq!(imported.template.id, "salesteam");
        assert_eq!(imported.template.fields.len(), 1);

        let png = fast().export_design(&canvas, ExportFormat::Png).unwrap();
        assert_eq!(png.filename, "Sales Team-preview.png");
    }

    #[test]
    fn files_land_in_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = fast().export_card(&CardState::new(), ExportFormat::Json).unwrap();
        let path = file.write_to(&dir.path().join("out")).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(path).unwrap(), file.bytes);
    }
}
