//! Template System - Layout Contracts
//!
//! A template describes the card canvas: background, decorative shapes, and
//! where each field sits. Predefined layouts are embedded in the binary;
//! custom layouts are imported from JSON or authored in the designer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::validation::{check_required_keys, ImportError, ValidationResult, Validator};

pub type TemplateId = String;

/// Fixed card canvas, in CSS pixels.
pub const CANVAS_WIDTH: f64 = 643.0;
pub const CANVAS_HEIGHT: f64 = 383.0;

pub const DEFAULT_TEMPLATE_ID: &str = "blue-gray";

const BUILTIN_SOURCES: [(&str, &str); 3] = [
    ("blue-gray", include_str!("../templates/blue_gray.json")),
    ("modern-simple", include_str!("../templates/modern_simple.json")),
    ("pink-blue", include_str!("../templates/pink_blue.json")),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDesign {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub size: CanvasSize,
    #[serde(default)]
    pub background: Option<Background>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl TemplateDesign {
    /// An empty white card. Used when no predefined layout is available.
    pub fn blank(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            size: CanvasSize::default(),
            background: Some(Background { color: Some("#FFFFFF".to_string()) }),
            shapes: vec![],
            fields: vec![],
            defaults: BTreeMap::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn background_color(&self) -> Option<&str> {
        self.background.as_ref().and_then(|b| b.color.as_deref())
    }

    /// First image shape, used as the catalog preview thumbnail.
    pub fn preview_image(&self) -> Option<&str> {
        self.shapes.iter().find_map(|s| match s {
            Shape::Image { path, .. } => Some(path.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self { width: CANVAS_WIDTH, height: CANVAS_HEIGHT }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Background {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether the box lies entirely within a `width` x `height` canvas.
    pub fn fits_within(&self, width: f64, height: f64) -> bool {
        self.w >= 0.0
            && self.h >= 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= width
            && self.bottom() <= height
    }
}

/// Decorative primitives drawn behind fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<f64>,
    },
    Polygon {
        points: Vec<Point>,
        fill: String,
    },
    Image {
        path: String,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fit: Option<ImageFit>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<f64>,
    },
    DashedRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        stroke: String,
        #[serde(default)]
        dash: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// CSS-style font weight: either numeric (`700`) or a keyword (`"bold"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FontWeight {
    Numeric(u16),
    Keyword(String),
}

impl FontWeight {
    pub fn is_bold(&self) -> bool {
        match self {
            FontWeight::Numeric(n) => *n >= 600,
            FontWeight::Keyword(k) => matches!(k.as_str(), "bold" | "bolder"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<FontWeight>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uppercase: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

fn default_font_family() -> String { "Inter, ui-sans-serif".to_string() }
fn default_font_size() -> f64 { 13.0 }
fn default_color() -> String { "#000000".to_string() }

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            weight: None,
            color: default_color(),
            letter_spacing: None,
            line_height: None,
            align: None,
            uppercase: None,
            opacity: None,
        }
    }
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        self.weight.as_ref().is_some_and(FontWeight::is_bold)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Textarea,
    Image,
    Icon,
}

impl FieldKind {
    pub fn is_text(&self) -> bool {
        *self == FieldKind::Text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "box")]
    pub bounds: BoundingBox,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "FieldKind::is_text")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_id: Option<String>,
}

impl FieldSpec {
    /// Fields that display an uploaded image rather than text.
    pub fn is_image_slot(&self) -> bool {
        self.kind == FieldKind::Image || self.key == "logo" || self.key == "picture"
    }
}

/// Predefined layouts, parsed once from the embedded JSON.
pub fn builtin_templates() -> &'static [TemplateDesign] {
    static BUILTINS: OnceLock<Vec<TemplateDesign>> = OnceLock::new();
    BUILTINS.get_or_init(|| {
        BUILTIN_SOURCES
            .iter()
            .filter_map(|(name, src)| match serde_json::from_str::<TemplateDesign>(src) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::error!(template = name, error = %e, "embedded template failed to parse");
                    None
                }
            })
            .collect()
    })
}

pub fn get_builtin(id: &str) -> Option<&'static TemplateDesign> {
    builtin_templates().iter().find(|t| t.id == id)
}

pub fn default_template() -> TemplateDesign {
    get_builtin(DEFAULT_TEMPLATE_ID)
        .or_else(|| builtin_templates().first())
        .cloned()
        .unwrap_or_else(|| TemplateDesign::blank("blank", "Blank"))
}

/// Combined view over predefined and custom templates.
pub struct TemplateCatalog<'a> {
    custom: &'a [TemplateDesign],
}

impl<'a> TemplateCatalog<'a> {
    pub fn new(custom: &'a [TemplateDesign]) -> Self {
        Self { custom }
    }

    /// Predefined first, then custom.
    pub fn get(&self, id: &str) -> Option<&'a TemplateDesign> {
        get_builtin(id).or_else(|| self.custom.iter().find(|t| t.id == id))
    }

    pub fn list(&self) -> Vec<&'a TemplateDesign> {
        builtin_templates().iter().chain(self.custom.iter()).collect()
    }

    pub fn is_predefined(&self, id: &str) -> bool {
        get_builtin(id).is_some()
    }

    pub fn is_custom(&self, id: &str) -> bool {
        self.custom.iter().any(|t| t.id == id)
    }
}

/// A template that passed import validation, with any warnings raised.
#[derive(Debug, Clone)]
pub struct ImportedTemplate {
    pub template: TemplateDesign,
    pub validation: ValidationResult,
}

/// Parse and validate a template file's contents.
///
/// Nothing is registered here; the caller adds the result to the store.
pub fn import_template(json: &str) -> Result<ImportedTemplate, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    check_required_keys(&value)?;
    let template: TemplateDesign = serde_json::from_value(value)?;

    let validation = Validator::new().validate(&template);
    if !validation.valid {
        let messages: Vec<_> = validation
            .errors()
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect();
        return Err(ImportError::Rejected(messages.join("; ")));
    }
    for warning in validation.warnings() {
        tracing::warn!(template_id = %template.id, rule = %warning.rule, "{}", warning.message);
    }

    Ok(ImportedTemplate { template, validation })
}

pub fn import_template_file(path: &Path) -> Result<ImportedTemplate, ImportError> {
    let content = fs::read_to_string(path)?;
    import_template(&content)
}

/// Import every `*.json` file in `dir`, reporting per-file outcomes.
pub fn import_dir(dir: &Path) -> Result<Vec<(PathBuf, Result<ImportedTemplate, ImportError>)>, std::io::Error> {
    let mut outcomes = vec![];
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |e| e == "json"))
        .collect();
    paths.sort();

    for path in paths {
        let outcome = import_template_file(&path);
        if let Err(e) = &outcome {
            tracing::warn!(path = %path.display(), error = %e, "template import skipped");
        }
        outcomes.push((path, outcome));
    }
    Ok(outcomes)
}
