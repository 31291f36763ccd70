//! Field library - the palette of draggable field definitions.
//!
//! Predefined definitions are embedded from `data/field_definitions.json`.
//! Users may add their own custom definitions on top.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::designer::{MAX_FIELD_HEIGHT, MAX_FIELD_WIDTH, MIN_FIELD_HEIGHT, MIN_FIELD_WIDTH};
use crate::templates::{FieldKind, FontWeight, TextStyle};

const DEFINITIONS_SOURCE: &str = include_str!("../data/field_definitions.json");

const MIN_FONT_SIZE: f64 = 8.0;
const MAX_FONT_SIZE: f64 = 32.0;

/// Grouping of the user-based palette.
pub const USER_FIELD_GROUPS: [(&str, &[&str]); 5] = [
    ("Personal Info", &["firstName", "lastName", "nameAR", "picture"]),
    ("Contact Details", &["directNumber", "mobile", "email", "email2", "phoneIcon", "emailIcon"]),
    ("Professional", &["occupation", "occupationAR", "department", "departmentAR"]),
    ("Company Info", &["company", "branch", "landLineExt", "fax"]),
    ("Online & Location", &["website", "address", "websiteIcon", "locationIcon"]),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldLibraryError {
    #[error("Please enter both field key and label")]
    MissingKeyOrLabel,

    #[error("Field key already exists: {0}")]
    DuplicateKey(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FieldSize {
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub default_style: TextStyle,
    pub default_size: FieldSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateType {
    UserBased,
    CompanyBased,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionFile {
    #[serde(default)]
    user_based: Vec<FieldDefinition>,
    #[serde(default)]
    company_based: Vec<FieldDefinition>,
    #[serde(default)]
    custom: Vec<FieldDefinition>,
}

/// Form input for a user-authored field.
#[derive(Debug, Clone)]
pub struct CustomFieldDraft {
    pub key: String,
    pub label: String,
    pub placeholder: String,
    pub kind: FieldKind,
    pub font_size: f64,
    pub color: String,
    pub bold: bool,
    pub width: f64,
    pub height: f64,
}

impl Default for CustomFieldDraft {
    fn default() -> Self {
        Self {
            key: String::new(),
            label: String::new(),
            placeholder: String::new(),
            kind: FieldKind::Text,
            font_size: 13.0,
            color: "#000000".to_string(),
            bold: false,
            width: 150.0,
            height: 25.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldLibrary {
    user_based: Vec<FieldDefinition>,
    company_based: Vec<FieldDefinition>,
    custom: Vec<FieldDefinition>,
}

impl FieldLibrary {
    /// Library seeded from the embedded definitions.
    pub fn load() -> Self {
        let file: DefinitionFile = serde_json::from_str(DEFINITIONS_SOURCE).unwrap_or_else(|e| {
            tracing::error!(error = %e, "embedded field definitions failed to parse");
            DefinitionFile::default()
        });
        Self {
            user_based: file.user_based,
            company_based: file.company_based,
            custom: file.custom,
        }
    }

    pub fn fields(&self, template_type: TemplateType) -> &[FieldDefinition] {
        match template_type {
            TemplateType::UserBased => &self.user_based,
            TemplateType::CompanyBased => &self.company_based,
        }
    }

    pub fn custom(&self) -> &[FieldDefinition] {
        &self.custom
    }

    /// User-based fields arranged into their display groups.
    pub fn user_groups(&self) -> Vec<(&'static str, Vec<&FieldDefinition>)> {
        USER_FIELD_GROUPS
            .iter()
            .map(|(name, keys)| {
                let members = keys
                    .iter()
                    .filter_map(|k| self.user_based.iter().find(|f| f.key == *k))
                    .collect();
                (*name, members)
            })
            .collect()
    }

    /// Look a key up in custom, user-based, then company-based definitions.
    pub fn find(&self, key: &str) -> Option<&FieldDefinition> {
        self.custom
            .iter()
            .chain(self.user_based.iter())
            .chain(self.company_based.iter())
            .find(|f| f.key == key)
    }

    pub fn add_custom(&mut self, draft: CustomFieldDraft) -> Result<&FieldDefinition, FieldLibraryError> {
        let key = draft.key.trim().to_string();
        let label = draft.label.trim().to_string();
        if key.is_empty() || label.is_empty() {
            return Err(FieldLibraryError::MissingKeyOrLabel);
        }
        if self.find(&key).is_some() {
            return Err(FieldLibraryError::DuplicateKey(key));
        }

        let placeholder = if draft.placeholder.trim().is_empty() {
            label.clone()
        } else {
            draft.placeholder
        };

        let definition = FieldDefinition {
            key,
            label,
            placeholder,
            kind: draft.kind,
            default_style: TextStyle {
                font_size: draft.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
                color: draft.color,
                weight: Some(FontWeight::Keyword(if draft.bold { "bold" } else { "normal" }.to_string())),
                ..TextStyle::default()
            },
            default_size: FieldSize {
                w: draft.width.clamp(MIN_FIELD_WIDTH, MAX_FIELD_WIDTH),
                h: draft.height.clamp(MIN_FIELD_HEIGHT, MAX_FIELD_HEIGHT),
            },
            default_icon: None,
        };

        tracing::debug!(key = %definition.key, "custom field added");
        self.custom.push(definition);
        Ok(&self.custom[self.custom.len() - 1])
    }

    pub fn remove_custom(&mut self, key: &str) -> bool {
        let before = self.custom.len();
        self.custom.retain(|f| f.key != key);
        self.custom.len() != before
    }
}

impl Default for FieldLibrary {
    fn default() -> Self {
        Self::load()
    }
}
