//! Card State Store
//!
//! `CardState` is plain data; every setter consumes the state and returns the
//! next one. A failed lookup logs and hands the input back unchanged.
//! `CardStore` pairs a state with a `StateStorage` and persists after each
//! transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::storage::{StateStorage, StorageError};
use crate::templates::{default_template, TemplateCatalog, TemplateDesign, TemplateId};

/// Keys every card carries a value for, whatever the template.
pub const STANDARD_FIELD_KEYS: [&str; 11] = [
    "firstName",
    "lastName",
    "occupation",
    "landline",
    "mobile",
    "fax",
    "address",
    "company",
    "email",
    "website",
    "logo",
];

pub type FieldValues = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedDesign {
    pub name: String,
    pub template_id: TemplateId,
    pub fields: FieldValues,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    pub current_template_id: TemplateId,
    pub current_template: TemplateDesign,
    pub fields: FieldValues,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub custom_templates: Vec<TemplateDesign>,
    #[serde(default)]
    pub saved_designs: Vec<SavedDesign>,
}

/// Empty value for every standard and template key, overlaid with the
/// template's declared defaults.
pub fn initial_values(template: &TemplateDesign) -> FieldValues {
    let mut values: FieldValues = STANDARD_FIELD_KEYS
        .iter()
        .map(|k| (k.to_string(), String::new()))
        .collect();
    for field in &template.fields {
        values.entry(field.key.clone()).or_default();
    }
    for (key, value) in &template.defaults {
        values.insert(key.clone(), value.clone());
    }
    values
}

impl CardState {
    pub fn new() -> Self {
        let template = default_template();
        Self {
            current_template_id: template.id.clone(),
            fields: initial_values(&template),
            current_template: template,
            logo: None,
            picture: None,
            custom_templates: vec![],
            saved_designs: vec![],
        }
    }

    pub fn catalog(&self) -> TemplateCatalog<'_> {
        TemplateCatalog::new(&self.custom_templates)
    }

    /// Predefined templates followed by custom ones.
    pub fn all_templates(&self) -> Vec<&TemplateDesign> {
        self.catalog().list()
    }

    pub fn is_custom(&self, id: &str) -> bool {
        self.catalog().is_custom(id)
    }

    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn saved_design(&self, name: &str) -> Option<&SavedDesign> {
        self.saved_designs.iter().find(|d| d.name == name)
    }

    // --- Transitions ---

    pub fn set_template(self, id: &str) -> Self {
        let Some(template) = self.catalog().get(id).cloned() else {
            tracing::error!(template_id = %id, "Template not found");
            return self;
        };
        tracing::info!(template_id = %id, "template selected");
        Self {
            current_template_id: template.id.clone(),
            fields: initial_values(&template),
            current_template: template,
            ..self
        }
    }

    pub fn set_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn set_logo(self, logo: Option<String>) -> Self {
        Self { logo, ..self }
    }

    pub fn set_picture(self, picture: Option<String>) -> Self {
        Self { picture, ..self }
    }

    pub fn reset_fields(self) -> Self {
        Self {
            fields: initial_values(&self.current_template),
            logo: None,
            picture: None,
            ..self
        }
    }

    /// Insert, or replace in place when a custom template with the same id exists.
    pub fn add_custom_template(mut self, template: TemplateDesign) -> Self {
        match self.custom_templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => {
                tracing::info!(template_id = %template.id, "custom template replaced");
                *existing = template;
            }
            None => {
                tracing::info!(template_id = %template.id, "custom template added");
                self.custom_templates.push(template);
            }
        }
        self
    }

    pub fn remove_custom_template(mut self, id: &str) -> Self {
        let before = self.custom_templates.len();
        self.custom_templates.retain(|t| t.id != id);
        if self.custom_templates.len() == before {
            tracing::warn!(template_id = %id, "no custom template to remove");
        }
        self
    }

    /// Snapshot the current card under `name`. An existing snapshot with the
    /// same name is dropped and the new one appended.
    pub fn save_design(self, name: &str) -> Self {
        self.save_design_at(name, Utc::now())
    }

    pub fn save_design_at(mut self, name: &str, created_at: DateTime<Utc>) -> Self {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!("design name is blank; not saved");
            return self;
        }
        let design = SavedDesign {
            name: name.to_string(),
            template_id: self.current_template_id.clone(),
            fields: self.fields.clone(),
            logo: self.logo.clone(),
            picture: self.picture.clone(),
            created_at,
        };
        self.saved_designs.retain(|d| d.name != name);
        self.saved_designs.push(design);
        tracing::info!(design = %name, "design saved");
        self
    }

    pub fn load_design(self, name: &str) -> Self {
        let Some(design) = self.saved_design(name).cloned() else {
            tracing::warn!(design = %name, "saved design not found");
            return self;
        };
        let template = match self.catalog().get(&design.template_id) {
            Some(t) => t.clone(),
            None => {
                tracing::warn!(
                    template_id = %design.template_id,
                    "template of saved design is gone; using default"
                );
                default_template()
            }
        };
        Self {
            current_template_id: design.template_id,
            current_template: template,
            fields: design.fields,
            logo: design.logo,
            picture: design.picture,
            ..self
        }
    }

    pub fn delete_design(mut self, name: &str) -> Self {
        self.saved_designs.retain(|d| d.name != name);
        self
    }
}

impl Default for CardState {
    fn default() -> Self {
        Self::new()
    }
}

/// The single live store: state plus where it is persisted.
pub struct CardStore<S: StateStorage> {
    state: CardState,
    storage: S,
}

impl<S: StateStorage> CardStore<S> {
    /// Restore from storage, starting fresh when nothing usable is stored.
    pub fn open(storage: S) -> Self {
        let state = match storage.load() {
            Ok(Some(state)) => state,
            Ok(None) => CardState::new(),
            Err(e) => {
                tracing::warn!(error = %e, "stored state unreadable; starting fresh");
                CardState::new()
            }
        };
        Self { state, storage }
    }

    pub fn state(&self) -> &CardState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Apply a transition and persist the result.
    pub fn update<F>(&mut self, transition: F) -> Result<&CardState, StorageError>
    where
        F: FnOnce(CardState) -> CardState,
    {
        let current = std::mem::take(&mut self.state);
        self.state = transition(current);
        self.storage.save(&self.state)?;
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::templates::{BoundingBox, FieldKind, FieldSpec, TextStyle};
    use pretty_assertions::assert_eq;

    fn custom(id: &str, name: &str) -> TemplateDesign {
        let mut t = TemplateDesign::blank(id, name);
        t.fields = vec![FieldSpec {
            key: "slogan".into(),
            label: Some("Slogan".into()),
            bounds: BoundingBox::new(10.0, 10.0, 200.0, 30.0),
            style: TextStyle::default(),
            placeholder: None,
            kind: FieldKind::Text,
            icon_id: None,
        }];
        t.defaults.insert("slogan".into(), "Hello".into());
        t
    }

    #[test]
    fn starts_on_default_template_with_its_defaults() {
        let state = CardState::new();
        assert_eq!(state.current_template_id, crate::templates::DEFAULT_TEMPLATE_ID);
        assert_eq!(state.fields, initial_values(&state.current_template));
    }

    #[test]
    fn set_template_resets_values_and_keeps_images() {
        let state = CardState::new()
            .set_field("firstName", "Ada")
            .set_logo(Some("data:image/png;base64,AA==".into()))
            .add_custom_template(custom("mine", "Mine"))
            .set_template("mine");

        assert_eq!(state.current_template_id, "mine");
        assert_eq!(state.field("firstName"), "");
        assert_eq!(state.field("slogan"), "Hello");
        assert!(state.logo.is_some());
    }

    #[test]
    fn unknown_template_leaves_state_untouched() {
        let before = CardState::new().set_field("email", "a@b.c");
        let after = before.clone().set_template("nope");
        assert_eq!(after, before);
    }

    #[test]
    fn reset_clears_images() {
        let state = CardState::new()
            .set_field("company", "Acme")
            .set_picture(Some("data:image/png;base64,AA==".into()))
            .reset_fields();
        assert_eq!(state.picture, None);
        assert_eq!(state.fields, initial_values(&state.current_template));
    }

    #[test]
    fn custom_template_upsert_replaces_in_place() {
        let state = CardState::new()
            .add_custom_template(custom("a", "A"))
            .add_custom_template(custom("b", "B"))
            .add_custom_template(custom("a", "A2"));

        let names: Vec<_> = state.custom_templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A2", "B"]);
    }

    #[test]
    fn remove_custom_template_is_exact() {
        let state = CardState::new()
            .add_custom_template(custom("a", "A"))
            .add_custom_template(custom("b", "B"))
            .remove_custom_template("a");
        assert_eq!(state.custom_templates, vec![custom("b", "B")]);
    }

    #[test]
    fn saving_twice_under_one_name_keeps_latest() {
        let state = CardState::new()
            .set_field("firstName", "One")
            .save_design("card")
            .set_field("firstName", "Two")
            .save_design(" card ");

        assert_eq!(state.saved_designs.len(), 1);
        assert_eq!(state.saved_design("card").unwrap().fields["firstName"], "Two");
    }

    #[test]
    fn blank_design_name_is_ignored() {
        let state = CardState::new().save_design("   ");
        assert!(state.saved_designs.is_empty());
    }

    #[test]
    fn load_design_restores_template_values_and_images() {
        let state = CardState::new()
            .set_template("pink-blue")
            .set_field("mobile", "555")
            .set_logo(Some("data:image/png;base64,AA==".into()))
            .save_design("pink")
            .set_template("modern-simple")
            .set_logo(None)
            .load_design("pink");

        assert_eq!(state.current_template_id, "pink-blue");
        assert_eq!(state.current_template.id, "pink-blue");
        assert_eq!(state.field("mobile"), "555");
        assert!(state.logo.is_some());
    }

    #[test]
    fn load_design_falls_back_when_template_removed() {
        let state = CardState::new()
            .add_custom_template(custom("gone", "Gone"))
            .set_template("gone")
            .save_design("orphan")
            .remove_custom_template("gone")
            .load_design("orphan");

        assert_eq!(state.current_template_id, "gone");
        assert_eq!(state.current_template.id, crate::templates::DEFAULT_TEMPLATE_ID);
    }

    #[test]
    fn delete_design_by_name() {
        let state = CardState::new()
            .save_design("a")
            .save_design("b")
            .delete_design("a");
        let names: Vec<_> = state.saved_designs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn store_persists_every_update() {
        let mut store = CardStore::open(MemoryStorage::default());
        store.update(|s| s.set_field("firstName", "Grace")).unwrap();

        let reopened = CardStore::open(store.storage().clone());
        assert_eq!(reopened.state().field("firstName"), "Grace");
    }
}
