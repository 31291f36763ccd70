//! Import Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy: errors reject the template, warnings are reported and accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::icons;
use crate::templates::{get_builtin, FieldKind, TemplateDesign, CANVAS_HEIGHT, CANVAS_WIDTH};

/// Keys an imported file must carry before it is even deserialized.
pub const REQUIRED_KEYS: [&str; 3] = ["id", "name", "fields"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Error parsing template file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid template format: expected a JSON object")]
    NotAnObject,

    #[error("Invalid template format: missing {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("Template rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Presence check on the raw document: `id`, `name` and `fields` must exist.
pub fn check_required_keys(value: &serde_json::Value) -> Result<(), ImportError> {
    let obj = value.as_object().ok_or(ImportError::NotAnObject)?;
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|k| obj.get(**k).map_or(true, |v| v.is_null()))
        .map(|k| k.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingKeys(missing))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub template_id: String,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, template: &TemplateDesign) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct UniqueFieldKeysRule;

impl ValidationRule for UniqueFieldKeysRule {
    fn name(&self) -> &'static str { "unique_field_keys" }

    fn validate(&self, template: &TemplateDesign) -> Vec<ValidationViolation> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut violations = vec![];

        for field in &template.fields {
            if !seen.insert(field.key.as_str()) && reported.insert(field.key.as_str()) {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("Field key '{}' appears more than once", field.key),
                    expected: Some("one field per key".to_string()),
                    actual: Some(field.key.clone()),
                });
            }
        }
        violations
    }
}

pub struct PredefinedIdRule;

impl ValidationRule for PredefinedIdRule {
    fn name(&self) -> &'static str { "predefined_id" }

    fn validate(&self, template: &TemplateDesign) -> Vec<ValidationViolation> {
        if get_builtin(&template.id).is_none() {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: format!("Template id '{}' is reserved by a predefined template", template.id),
            expected: Some("an id not used by predefined templates".to_string()),
            actual: Some(template.id.clone()),
        }]
    }
}

pub struct CanvasSizeRule;

impl ValidationRule for CanvasSizeRule {
    fn name(&self) -> &'static str { "canvas_size" }

    fn validate(&self, template: &TemplateDesign) -> Vec<ValidationViolation> {
        let size = template.size;
        if size.width == CANVAS_WIDTH && size.height == CANVAS_HEIGHT {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Canvas size differs from the card size; export is always 643x383".to_string(),
            expected: Some(format!("{}x{}", CANVAS_WIDTH, CANVAS_HEIGHT)),
            actual: Some(format!("{}x{}", size.width, size.height)),
        }]
    }
}

pub struct FieldBoundsRule;

impl ValidationRule for FieldBoundsRule {
    fn name(&self) -> &'static str { "field_bounds" }

    fn validate(&self, template: &TemplateDesign) -> Vec<ValidationViolation> {
        template
            .fields
            .iter()
            .filter(|f| !f.bounds.fits_within(CANVAS_WIDTH, CANVAS_HEIGHT))
            .map(|f| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!("Field '{}' extends past the canvas and will be clipped", f.key),
                expected: Some(format!("within {}x{}", CANVAS_WIDTH, CANVAS_HEIGHT)),
                actual: Some(format!(
                    "x={} y={} w={} h={}",
                    f.bounds.x, f.bounds.y, f.bounds.w, f.bounds.h
                )),
            })
            .collect()
    }
}

pub struct IconReferenceRule;

impl ValidationRule for IconReferenceRule {
    fn name(&self) -> &'static str { "icon_reference" }

    fn validate(&self, template: &TemplateDesign) -> Vec<ValidationViolation> {
        template
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Icon)
            .filter_map(|f| f.icon_id.as_ref().map(|id| (f, id)))
            .filter(|(_, id)| icons::find(id).is_none())
            .map(|(f, id)| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!("Field '{}' references unknown icon '{}'", f.key, id),
                expected: Some("an icon from the icon library".to_string()),
                actual: Some(id.clone()),
            })
            .collect()
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(UniqueFieldKeysRule),
                Box::new(PredefinedIdRule),
                Box::new(CanvasSizeRule),
                Box::new(FieldBoundsRule),
                Box::new(IconReferenceRule),
            ],
        }
    }

    pub fn validate(&self, template: &TemplateDesign) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(template))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid,
            violations,
            template_id: template.id.clone(),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
