//! Contract Invariant Tests
//!
//! Store transitions, template import and persistence guarantees.

use cardstudio_core::{
    storage::{encode_state, FileStorage, MemoryStorage, StateStorage},
    store::{initial_values, CardState, CardStore, STANDARD_FIELD_KEYS},
    templates::{builtin_templates, import_template, BoundingBox, FieldKind, FieldSpec, TemplateDesign, TextStyle},
    ImportError,
};
use pretty_assertions::assert_eq;

fn custom_template(id: &str, name: &str) -> TemplateDesign {
    let mut t = TemplateDesign::blank(id, name);
    t.fields = vec![FieldSpec {
        key: "tagline".into(),
        label: Some("Tagline".into()),
        bounds: BoundingBox::new(40.0, 40.0, 300.0, 30.0),
        style: TextStyle::default(),
        placeholder: Some("Your tagline".into()),
        kind: FieldKind::Text,
        icon_id: None,
    }];
    t.defaults.insert("tagline".into(), "Built to last".into());
    t.defaults.insert("company".into(), "Acme".into());
    t
}

#[test]
fn invariant_set_template_resets_to_declared_defaults() {
    for template in builtin_templates() {
        let state = CardState::new()
            .set_field("firstName", "Ada")
            .set_field("unrelated", "x")
            .set_template(&template.id);

        assert_eq!(state.current_template_id, template.id);
        for key in STANDARD_FIELD_KEYS {
            let expected = template.defaults.get(key).map(String::as_str).unwrap_or("");
            assert_eq!(state.field(key), expected, "{} / {key}", template.id);
        }
        for field in &template.fields {
            assert!(state.fields.contains_key(&field.key));
        }
        assert!(!state.fields.contains_key("unrelated"));
    }
}

#[test]
fn invariant_set_template_keeps_uploaded_images() {
    let other = builtin_templates()[1].id.clone();
    let state = CardState::new()
        .set_logo(Some("data:image/png;base64,AAAA".into()))
        .set_template(&other);
    assert_eq!(state.logo.as_deref(), Some("data:image/png;base64,AAAA"));
}

#[test]
fn invariant_unknown_template_leaves_state_untouched() {
    let before = CardState::new().set_field("email", "a@b.c");
    let after = before.clone().set_template("does-not-exist");
    assert_eq!(after, before);
}

#[test]
fn invariant_custom_template_upsert_replaces_in_place() {
    let state = CardState::new()
        .add_custom_template(custom_template("one", "One"))
        .add_custom_template(custom_template("two", "Two"))
        .add_custom_template(custom_template("one", "One v2"));

    assert_eq!(state.custom_templates.len(), 2);
    assert_eq!(state.custom_templates[0].name, "One v2");
    assert_eq!(state.custom_templates[1].id, "two");
}

#[test]
fn invariant_remove_custom_template_removes_exactly_one() {
    let state = CardState::new()
        .add_custom_template(custom_template("one", "One"))
        .add_custom_template(custom_template("two", "Two"))
        .add_custom_template(custom_template("three", "Three"))
        .remove_custom_template("two");

    let ids: Vec<_> = state.custom_templates.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["one", "three"]);

    let unchanged = state.clone().remove_custom_template("missing");
    assert_eq!(unchanged, state);
}

#[test]
fn invariant_custom_templates_are_selectable() {
    let state = CardState::new()
        .add_custom_template(custom_template("mine", "Mine"))
        .set_template("mine");

    assert!(state.is_custom("mine"));
    assert_eq!(state.fields, initial_values(&custom_template("mine", "Mine")));
    assert_eq!(state.field("tagline"), "Built to last");
    assert_eq!(state.field("company"), "Acme");
    assert_eq!(state.all_templates().last().unwrap().id, "mine");
}

#[test]
fn invariant_saving_same_name_overwrites() {
    let state = CardState::new()
        .set_field("firstName", "Ada")
        .save_design("Main")
        .save_design("Other")
        .set_field("firstName", "Grace")
        .save_design("  Main  ");

    let names: Vec<_> = state.saved_designs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Other", "Main"]);
    assert_eq!(state.saved_design("Main").unwrap().fields["firstName"], "Grace");
}

#[test]
fn invariant_blank_design_names_are_ignored() {
    let state = CardState::new().save_design("   ");
    assert!(state.saved_designs.is_empty());
}

#[test]
fn invariant_load_design_restores_snapshot() {
    let other = builtin_templates()[2].id.clone();
    let state = CardState::new()
        .set_template(&other)
        .set_field("email", "ada@example.com")
        .set_picture(Some("data:image/png;base64,BBBB".into()))
        .save_design("Ada")
        .reset_fields()
        .set_template(&builtin_templates()[0].id)
        .load_design("Ada");

    assert_eq!(state.current_template_id, other);
    assert_eq!(state.current_template.id, other);
    assert_eq!(state.field("email"), "ada@example.com");
    assert_eq!(state.picture.as_deref(), Some("data:image/png;base64,BBBB"));
}

#[test]
fn invariant_reset_restores_defaults_and_clears_images() {
    let state = CardState::new()
        .set_field("email", "x@y.z")
        .set_logo(Some("data:image/png;base64,AAAA".into()))
        .reset_fields();

    assert_eq!(state.fields, initial_values(&state.current_template));
    assert_eq!(state.logo, None);
}

#[test]
fn invariant_import_requires_id_name_fields() {
    for body in [
        r#"{"name": "No id", "fields": []}"#,
        r#"{"id": "no-name", "fields": []}"#,
        r#"{"id": "no-fields", "name": "No fields"}"#,
    ] {
        let err = import_template(body).unwrap_err();
        assert!(matches!(err, ImportError::MissingKeys(_)), "{body}: {err}");
    }
    assert!(matches!(import_template("[1, 2]"), Err(ImportError::NotAnObject)));
    assert!(matches!(import_template("{oops"), Err(ImportError::Malformed(_))));
}

#[test]
fn invariant_rejected_import_leaves_catalog_unchanged() {
    let mut store = CardStore::open(MemoryStorage::default());
    let before = store.state().clone();

    if let Ok(imported) = import_template(r#"{"id": "x", "fields": []}"#) {
        store.update(|s| s.add_custom_template(imported.template)).unwrap();
    }
    assert_eq!(store.state(), &before);
}

#[test]
fn invariant_minimal_import_gets_defaults() {
    let imported = import_template(r#"{"id": "tiny", "name": "Tiny", "fields": []}"#).unwrap();
    let t = imported.template;
    assert_eq!((t.size.width, t.size.height), (643.0, 383.0));
    assert!(t.shapes.is_empty());
    assert!(t.background.is_none());
    assert!(t.defaults.is_empty());
}

#[test]
fn invariant_predefined_ids_cannot_be_shadowed() {
    let body = format!(r#"{{"id": "{}", "name": "Imposter", "fields": []}}"#, builtin_templates()[0].id);
    assert!(matches!(import_template(&body), Err(ImportError::Rejected(_))));
}

#[test]
fn invariant_store_persists_every_update() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = CardStore::open(FileStorage::in_dir(dir.path()));
        store.update(|s| s.set_field("email", "ada@example.com")).unwrap();
        store.update(|s| s.save_design("Ada")).unwrap();
    }

    let reopened = CardStore::open(FileStorage::in_dir(dir.path()));
    assert_eq!(reopened.state().field("email"), "ada@example.com");
    assert!(reopened.state().saved_design("Ada").is_some());
}

#[test]
fn invariant_foreign_version_starts_fresh() {
    let state = CardState::new().set_field("email", "old@example.com");
    let raw = encode_state(&state).unwrap().replace(r#""version":0"#, r#""version":3"#);
    let storage = MemoryStorage::with_contents(raw);
    assert!(storage.load().unwrap().is_none());

    let store = CardStore::open(storage);
    assert_eq!(store.state(), &CardState::new());
}

#[test]
fn invariant_corrupt_storage_starts_fresh() {
    let store = CardStore::open(MemoryStorage::with_contents("not json at all"));
    assert_eq!(store.state(), &CardState::new());
}
