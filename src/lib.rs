//! CardStudio Core - Business Card Layout Engine
//!
//! # Pieces
//! 1. Templates are data: canvas size, background, shapes, field boxes
//! 2. Imports pass validation before they reach the catalog
//! 3. The card store changes only through explicit transitions
//! 4. The designer canvas is driven by input events and keeps fields on the card
//! 5. Rendering and export are deterministic for a given state

pub mod config;
pub mod designer;
pub mod export;
pub mod fields;
pub mod font;
pub mod icons;
pub mod images;
pub mod input;
pub mod print;
pub mod render;
pub mod storage;
pub mod store;
pub mod templates;
pub mod validation;

pub use config::{ConfigError, StudioConfig};
pub use designer::{DesignerCanvas, DesignerError};
pub use export::{ExportError, ExportFormat, ExportedFile, Exporter};
pub use fields::{FieldDefinition, FieldLibrary};
pub use input::{Action, InputEvent, ResizeHandle};
pub use render::{render, RenderOptions, Scene};
pub use storage::{FileStorage, MemoryStorage, StateStorage, StorageError};
pub use store::{CardState, CardStore, SavedDesign};
pub use templates::{FieldSpec, Shape, TemplateCatalog, TemplateDesign, TemplateId};
pub use validation::{ImportError, ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
