//! Designer input model: events, resize handles, and the drag state machine.
//!
//! The host translates raw pointer/drag-and-drop callbacks into
//! [`InputEvent`]s in canvas-local pixels and feeds them to
//! [`crate::designer::DesignerCanvas::handle`]. Gesture context that the
//! callbacks used to capture in closures lives in [`DragState`].

use serde::{Deserialize, Serialize};

use crate::fields::FieldDefinition;
use crate::templates::{BoundingBox, FontWeight, Point, TextAlign, TextStyle};

/// Edge or corner handle grabbed for a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeHandle {
    pub fn moves_left_edge(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    pub fn moves_right_edge(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    pub fn moves_top_edge(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    pub fn moves_bottom_edge(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }
}

/// Sparse style update. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uppercase: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, style: &mut TextStyle) {
        if let Some(v) = &self.font_family {
            style.font_family = v.clone();
        }
        if let Some(v) = self.font_size {
            style.font_size = v;
        }
        if let Some(v) = &self.weight {
            style.weight = Some(v.clone());
        }
        if let Some(v) = &self.color {
            style.color = v.clone();
        }
        if let Some(v) = self.align {
            style.align = Some(v);
        }
        if let Some(v) = self.uppercase {
            style.uppercase = Some(v);
        }
        if let Some(v) = self.letter_spacing {
            style.letter_spacing = Some(v);
        }
        if let Some(v) = self.opacity {
            style.opacity = Some(v.clamp(0.0, 1.0));
        }
    }
}

/// One user gesture or command aimed at the designer canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    /// A palette definition released over the canvas at `at`.
    Drop { field: FieldDefinition, at: Point },
    /// Same as `Drop`, naming the palette entry by key.
    DropKey { key: String, at: Point },
    /// Pointer pressed on a placed field's body.
    PointerDown { key: String, at: Point },
    /// Pointer pressed on one of a field's resize handles.
    ResizeStart { key: String, handle: ResizeHandle, at: Point },
    /// Pointer moved. `timestamp_ms`, when present, drives resize throttling.
    PointerMove {
        at: Point,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    PointerUp,
    Select { key: Option<String> },
    Delete { key: String },
    Restyle { key: String, patch: StylePatch },
    SetIcon { key: String, icon_id: Option<String> },
    ToggleGrid,
    SetBackground { path: Option<String> },
    SetTemplateName { name: String },
    Clear,
}

/// Observable result of handling an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    FieldPlaced { key: String, bounds: BoundingBox },
    FieldMoved { key: String, bounds: BoundingBox },
    FieldResized { key: String, bounds: BoundingBox },
    FieldRestyled { key: String },
    FieldDeleted { key: String },
    SelectionChanged { key: Option<String> },
    GridToggled { visible: bool },
    BackgroundChanged { path: Option<String> },
    TemplateRenamed { name: String },
    Cleared,
}

/// Active gesture between pointer-down and pointer-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A placed field follows the pointer.
    Moving {
        key: String,
        /// Pointer position relative to the field's top-left corner at grab time.
        offset: Point,
    },
    /// A field is being resized from one handle.
    Resizing {
        key: String,
        handle: ResizeHandle,
        start: Point,
        orig: BoundingBox,
    },
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Moving { key, .. } | Self::Resizing { key, .. } => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_handles_move_two_edges() {
        assert!(ResizeHandle::Nw.moves_left_edge() && ResizeHandle::Nw.moves_top_edge());
        assert!(ResizeHandle::Se.moves_right_edge() && ResizeHandle::Se.moves_bottom_edge());
        assert!(!ResizeHandle::E.moves_top_edge() && !ResizeHandle::E.moves_bottom_edge());
    }

    #[test]
    fn style_patch_applies_only_present_fields() {
        let mut style = TextStyle::default();
        let patch = StylePatch {
            color: Some("#FF0000".into()),
            opacity: Some(3.0),
            ..Default::default()
        };
        patch.apply(&mut style);
        assert_eq!(style.color, "#FF0000");
        assert_eq!(style.opacity, Some(1.0));
        assert_eq!(style.font_size, TextStyle::default().font_size);
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: InputEvent = serde_json::from_str(
            r#"{"event":"resize_start","key":"email","handle":"se","at":{"x":5,"y":6}}"#,
        )
        .unwrap();
        assert!(matches!(event, InputEvent::ResizeStart { handle: ResizeHandle::Se, .. }));

        let event: InputEvent =
            serde_json::from_str(r#"{"event":"pointer_move","at":{"x":1,"y":2}}"#).unwrap();
        assert!(matches!(event, InputEvent::PointerMove { timestamp_ms: None, .. }));
    }

    #[test]
    fn drag_state_defaults_to_idle() {
        let state = DragState::default();
        assert!(state.is_idle());
        assert_eq!(state.key(), None);
    }
}
