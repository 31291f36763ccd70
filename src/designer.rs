//! Designer Canvas
//!
//! Fields from the palette are dropped onto the fixed 643x383 canvas, then
//! moved, resized and restyled. The working set of placed fields becomes a
//! new [`TemplateDesign`] on export.
//!
//! Placement invariants:
//! - at most one placed field per key
//! - dropping and moving keep every box inside the canvas
//! - resizing keeps width in 50..=400 and height in 20..=200

use std::collections::BTreeMap;
use thiserror::Error;

use crate::export::{raster_file_name, template_slug};
use crate::fields::{FieldDefinition, FieldLibrary};
use crate::icons;
use crate::input::{Action, DragState, InputEvent, ResizeHandle, StylePatch};
use crate::templates::{
    Background, BoundingBox, CanvasSize, FieldSpec, ImageFit, Point, Shape, TemplateDesign,
    CANVAS_HEIGHT, CANVAS_WIDTH,
};

pub const MIN_FIELD_WIDTH: f64 = 50.0;
pub const MAX_FIELD_WIDTH: f64 = 400.0;
pub const MIN_FIELD_HEIGHT: f64 = 20.0;
pub const MAX_FIELD_HEIGHT: f64 = 200.0;

/// Minimum spacing between applied resize steps.
pub const RESIZE_THROTTLE_MS: u64 = 16;

/// Grid overlay spacing in canvas pixels.
pub const GRID_SIZE: f64 = 20.0;

/// White card body synthesized behind exported designs.
const CARD_BODY: BoundingBox = BoundingBox { x: 20.0, y: 20.0, w: 603.0, h: 343.0 };
const CARD_RADIUS: f64 = 12.0;
const LOGO_PLACEHOLDER_STROKE: &str = "#B9B9B9";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DesignerError {
    #[error("No fields placed on the canvas")]
    NoFields,

    #[error("Please enter a template name")]
    MissingName,
}

/// Top-left position for a `w` x `h` box, pulled back inside the canvas.
pub fn clamp_position(x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
    (
        x.min(CANVAS_WIDTH - w).max(0.0),
        y.min(CANVAS_HEIGHT - h).max(0.0),
    )
}

/// New box for a resize gesture: `orig` dragged from `handle` by `delta`.
pub fn resize_box(orig: BoundingBox, handle: ResizeHandle, delta: Point) -> BoundingBox {
    let mut b = orig;

    if handle.moves_right_edge() {
        let room = (CANVAS_WIDTH - orig.x).max(MIN_FIELD_WIDTH);
        b.w = (orig.w + delta.x).clamp(MIN_FIELD_WIDTH, MAX_FIELD_WIDTH).min(room);
    } else if handle.moves_left_edge() {
        let room = orig.right().max(MIN_FIELD_WIDTH);
        b.w = (orig.w - delta.x).clamp(MIN_FIELD_WIDTH, MAX_FIELD_WIDTH).min(room);
        b.x = orig.right() - b.w;
    }

    if handle.moves_bottom_edge() {
        let room = (CANVAS_HEIGHT - orig.y).max(MIN_FIELD_HEIGHT);
        b.h = (orig.h + delta.y).clamp(MIN_FIELD_HEIGHT, MAX_FIELD_HEIGHT).min(room);
    } else if handle.moves_top_edge() {
        let room = orig.bottom().max(MIN_FIELD_HEIGHT);
        b.h = (orig.h - delta.y).clamp(MIN_FIELD_HEIGHT, MAX_FIELD_HEIGHT).min(room);
        b.y = orig.bottom() - b.h;
    }

    let (x, y) = clamp_position(b.x, b.y, b.w, b.h);
    b.x = x;
    b.y = y;
    b
}

/// `v` pulled into `min..=max`; anything not finite becomes `min`.
fn field_extent(v: f64, min: f64, max: f64) -> f64 {
    if v.is_finite() { v.clamp(min, max) } else { min }
}

/// Convert a palette entry into a field centred on `at`.
pub fn place_field(definition: &FieldDefinition, at: Point) -> FieldSpec {
    let w = field_extent(definition.default_size.w, MIN_FIELD_WIDTH, MAX_FIELD_WIDTH);
    let h = field_extent(definition.default_size.h, MIN_FIELD_HEIGHT, MAX_FIELD_HEIGHT);
    let (x, y) = clamp_position(at.x - w / 2.0, at.y - h / 2.0, w, h);

    FieldSpec {
        key: definition.key.clone(),
        label: Some(definition.label.clone()),
        bounds: BoundingBox::new(x, y, w, h),
        style: definition.default_style.clone(),
        placeholder: (!definition.placeholder.is_empty()).then(|| definition.placeholder.clone()),
        kind: definition.kind,
        icon_id: definition.default_icon.clone(),
    }
}

pub struct DesignerCanvas {
    fields: Vec<FieldSpec>,
    selected: Option<String>,
    drag: DragState,
    show_grid: bool,
    background_image: Option<String>,
    template_name: String,
    library: FieldLibrary,
    last_resize_ms: Option<u64>,
}

impl DesignerCanvas {
    pub fn new(library: FieldLibrary) -> Self {
        Self {
            fields: vec![],
            selected: None,
            drag: DragState::Idle,
            show_grid: true,
            background_image: None,
            template_name: String::new(),
            library,
            last_resize_ms: None,
        }
    }

    // --- Queries ---

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn background_image(&self) -> Option<&str> {
        self.background_image.as_deref()
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn library(&self) -> &FieldLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut FieldLibrary {
        &mut self.library
    }

    // --- Input ---

    pub fn handle(&mut self, event: InputEvent) -> Vec<Action> {
        match event {
            InputEvent::Drop { field, at } => self.on_drop(&field, at),
            InputEvent::DropKey { key, at } => match self.library.find(&key).cloned() {
                Some(definition) => self.on_drop(&definition, at),
                None => {
                    tracing::warn!(%key, "dropped field is not in the palette");
                    vec![]
                }
            },
            InputEvent::PointerDown { key, at } => self.on_pointer_down(key, at),
            InputEvent::ResizeStart { key, handle, at } => self.on_resize_start(key, handle, at),
            InputEvent::PointerMove { at, timestamp_ms } => self.on_pointer_move(at, timestamp_ms),
            InputEvent::PointerUp => {
                self.drag = DragState::Idle;
                self.last_resize_ms = None;
                vec![]
            }
            InputEvent::Select { key } => self.select(key),
            InputEvent::Delete { key } => self.delete(&key),
            InputEvent::Restyle { key, patch } => self.restyle(&key, &patch),
            InputEvent::SetIcon { key, icon_id } => self.set_icon(&key, icon_id),
            InputEvent::ToggleGrid => {
                self.show_grid = !self.show_grid;
                vec![Action::GridToggled { visible: self.show_grid }]
            }
            InputEvent::SetBackground { path } => {
                self.background_image = path.clone();
                vec![Action::BackgroundChanged { path }]
            }
            InputEvent::SetTemplateName { name } => {
                self.template_name = name.clone();
                vec![Action::TemplateRenamed { name }]
            }
            InputEvent::Clear => {
                self.fields.clear();
                self.selected = None;
                self.drag = DragState::Idle;
                vec![Action::Cleared]
            }
        }
    }

    fn on_drop(&mut self, definition: &FieldDefinition, at: Point) -> Vec<Action> {
        let placed = place_field(definition, at);
        let key = placed.key.clone();

        let bounds = match self.fields.iter_mut().find(|f| f.key == key) {
            Some(existing) => {
                let (x, y) = clamp_position(
                    at.x - existing.bounds.w / 2.0,
                    at.y - existing.bounds.h / 2.0,
                    existing.bounds.w,
                    existing.bounds.h,
                );
                existing.bounds.x = x;
                existing.bounds.y = y;
                existing.bounds
            }
            None => {
                let bounds = placed.bounds;
                self.fields.push(placed);
                bounds
            }
        };

        tracing::debug!(%key, x = bounds.x, y = bounds.y, "field dropped");
        let mut actions = vec![Action::FieldPlaced { key: key.clone(), bounds }];
        actions.extend(self.select(Some(key)));
        actions
    }

    fn on_pointer_down(&mut self, key: String, at: Point) -> Vec<Action> {
        let Some(field) = self.field(&key) else {
            tracing::warn!(%key, "pointer down on unknown field");
            return vec![];
        };
        let offset = Point::new(at.x - field.bounds.x, at.y - field.bounds.y);
        self.drag = DragState::Moving { key: key.clone(), offset };
        self.select(Some(key))
    }

    fn on_resize_start(&mut self, key: String, handle: ResizeHandle, at: Point) -> Vec<Action> {
        let Some(field) = self.field(&key) else {
            tracing::warn!(%key, "resize on unknown field");
            return vec![];
        };
        self.drag = DragState::Resizing {
            key: key.clone(),
            handle,
            start: at,
            orig: field.bounds,
        };
        self.last_resize_ms = None;
        self.select(Some(key))
    }

    fn on_pointer_move(&mut self, at: Point, timestamp_ms: Option<u64>) -> Vec<Action> {
        match self.drag.clone() {
            DragState::Idle => vec![],
            DragState::Moving { key, offset } => {
                let Some(field) = self.fields.iter_mut().find(|f| f.key == key) else {
                    self.drag = DragState::Idle;
                    return vec![];
                };
                let (x, y) = clamp_position(
                    at.x - offset.x,
                    at.y - offset.y,
                    field.bounds.w,
                    field.bounds.h,
                );
                if x == field.bounds.x && y == field.bounds.y {
                    return vec![];
                }
                field.bounds.x = x;
                field.bounds.y = y;
                vec![Action::FieldMoved { key, bounds: field.bounds }]
            }
            DragState::Resizing { key, handle, start, orig } => {
                if let (Some(now), Some(last)) = (timestamp_ms, self.last_resize_ms) {
                    if now.saturating_sub(last) < RESIZE_THROTTLE_MS {
                        return vec![];
                    }
                }
                let Some(field) = self.fields.iter_mut().find(|f| f.key == key) else {
                    self.drag = DragState::Idle;
                    return vec![];
                };
                let bounds = resize_box(orig, handle, Point::new(at.x - start.x, at.y - start.y));
                if bounds == field.bounds {
                    return vec![];
                }
                field.bounds = bounds;
                if timestamp_ms.is_some() {
                    self.last_resize_ms = timestamp_ms;
                }
                vec![Action::FieldResized { key, bounds }]
            }
        }
    }

    fn select(&mut self, key: Option<String>) -> Vec<Action> {
        if let Some(k) = &key {
            if self.field(k).is_none() {
                tracing::warn!(key = %k, "cannot select a field that is not placed");
                return vec![];
            }
        }
        if self.selected == key {
            return vec![];
        }
        self.selected = key.clone();
        vec![Action::SelectionChanged { key }]
    }

    fn delete(&mut self, key: &str) -> Vec<Action> {
        let before = self.fields.len();
        self.fields.retain(|f| f.key != key);
        if self.fields.len() == before {
            return vec![];
        }
        if self.drag.key() == Some(key) {
            self.drag = DragState::Idle;
        }

        let mut actions = vec![Action::FieldDeleted { key: key.to_string() }];
        if self.selected.as_deref() == Some(key) {
            self.selected = None;
            actions.push(Action::SelectionChanged { key: None });
        }
        actions
    }

    fn restyle(&mut self, key: &str, patch: &StylePatch) -> Vec<Action> {
        let Some(field) = self.fields.iter_mut().find(|f| f.key == key) else {
            return vec![];
        };
        if patch.is_empty() {
            return vec![];
        }
        patch.apply(&mut field.style);
        vec![Action::FieldRestyled { key: key.to_string() }]
    }

    fn set_icon(&mut self, key: &str, icon_id: Option<String>) -> Vec<Action> {
        if let Some(id) = &icon_id {
            if icons::find(id).is_none() {
                tracing::warn!(icon = %id, "unknown icon");
                return vec![];
            }
        }
        let Some(field) = self.fields.iter_mut().find(|f| f.key == key) else {
            return vec![];
        };
        field.icon_id = icon_id;
        vec![Action::FieldRestyled { key: key.to_string() }]
    }

    // --- Export ---

    /// PNG/PDF export needs at least one placed field.
    pub fn can_export_raster(&self) -> bool {
        !self.fields.is_empty()
    }

    /// JSON export additionally needs a non-blank template name.
    pub fn can_export_json(&self) -> bool {
        self.can_export_raster() && !self.template_name.trim().is_empty()
    }

    fn synthesized_shapes(&self) -> Vec<Shape> {
        let mut shapes = vec![Shape::Rect {
            x: CARD_BODY.x,
            y: CARD_BODY.y,
            w: CARD_BODY.w,
            h: CARD_BODY.h,
            fill: "#FFFFFF".to_string(),
            radius: Some(CARD_RADIUS),
        }];

        if let Some(path) = &self.background_image {
            shapes.push(Shape::Image {
                path: path.clone(),
                x: CARD_BODY.x,
                y: CARD_BODY.y,
                w: CARD_BODY.w,
                h: CARD_BODY.h,
                fit: Some(ImageFit::Cover),
                radius: Some(CARD_RADIUS),
            });
        }

        if let Some(logo) = self.field("logo") {
            shapes.push(Shape::DashedRect {
                x: logo.bounds.x,
                y: logo.bounds.y,
                w: logo.bounds.w,
                h: logo.bounds.h,
                stroke: LOGO_PLACEHOLDER_STROKE.to_string(),
                dash: vec![6.0, 6.0],
                radius: Some(4.0),
            });
        }
        shapes
    }

    fn build_template(&self, id: String, name: String) -> TemplateDesign {
        TemplateDesign {
            id,
            name,
            size: CanvasSize::default(),
            background: Some(Background { color: Some("#FFFFFF".to_string()) }),
            shapes: self.synthesized_shapes(),
            fields: self.fields.clone(),
            defaults: BTreeMap::new(),
        }
    }

    /// The authored template, ready to be written as `<slug>.json`.
    pub fn to_template(&self) -> Result<TemplateDesign, DesignerError> {
        if self.fields.is_empty() {
            return Err(DesignerError::NoFields);
        }
        let name = self.template_name.trim();
        if name.is_empty() {
            return Err(DesignerError::MissingName);
        }
        Ok(self.build_template(template_slug(name), name.to_string()))
    }

    /// What the canvas currently shows, for preview rasterization.
    pub fn preview_template(&self) -> TemplateDesign {
        let name = self.template_name.trim();
        let name = if name.is_empty() { "template" } else { name };
        self.build_template(template_slug(name), name.to_string())
    }

    pub fn json_file_name(&self) -> Result<String, DesignerError> {
        Ok(format!("{}.json", self.to_template()?.id))
    }

    pub fn raster_file_name(&self, extension: &str) -> String {
        raster_file_name(&self.template_name, extension)
    }
}

impl Default for DesignerCanvas {
    fn default() -> Self {
        Self::new(FieldLibrary::load())
    }
}
