//! CardStudio CLI
//!
//! Drives the card store, template catalog and designer from the shell.
//! Outputs JSON to stdout, logs to stderr.
//! Returns 1 on I/O or export failure, 2 when input is rejected.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cardstudio_core::{
    config::StudioConfig,
    export::{ExportFormat, Exporter},
    fields::{FieldLibrary, TemplateType},
    icons,
    images,
    input::InputEvent,
    storage::FileStorage,
    store::CardStore,
    templates::{import_dir, import_template, import_template_file, ImportedTemplate},
    DesignerCanvas, ImportError,
};

#[derive(Parser)]
#[command(name = "cardstudio-cli")]
#[command(about = "CardStudio CLI - business card layout engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the persisted card state
    #[arg(long, env = "CARDSTUDIO_DATA_DIR", default_value = ".cardstudio", global = true)]
    data_dir: PathBuf,

    /// Root for template asset paths such as /card-background-images/...
    #[arg(long, env = "CARDSTUDIO_ASSETS_DIR", default_value = "public", global = true)]
    assets_dir: PathBuf,

    /// Export pixel ratio (1-4)
    #[arg(long, env = "CARDSTUDIO_PIXEL_RATIO", default_value_t = 2, global = true)]
    pixel_ratio: u32,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List predefined and custom templates
    Templates,

    /// Import a template file, or every *.json file in a directory
    Import { path: PathBuf },

    /// Remove a custom template
    RemoveTemplate { id: String },

    /// Switch the active template (resets field values)
    Use { id: String },

    /// Set one field value
    Set { key: String, value: String },

    /// Upload a logo image
    Logo { file: PathBuf },

    /// Upload a picture image
    Picture { file: PathBuf },

    /// Remove the uploaded logo
    ClearLogo,

    /// Remove the uploaded picture
    ClearPicture,

    /// Restore the active template's defaults and clear images
    Reset,

    /// Save the current card under a name
    Save { name: String },

    /// Restore a saved design
    Load { name: String },

    /// Delete a saved design
    DeleteDesign { name: String },

    /// List saved designs
    Designs,

    /// Print the active template and field values
    Show,

    /// List the field palette
    Fields,

    /// List icons, optionally filtered
    Icons {
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Export the active card
    Export {
        format: ExportFormat,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Replay designer events from a JSON file and export the result
    Compose {
        events: PathBuf,

        /// Formats to export (repeatable)
        #[arg(short, long = "format")]
        formats: Vec<ExportFormat>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Add the authored template to the custom templates
        #[arg(long)]
        register: bool,
    },
}

/// Events file: either a bare array or `{ "name": ..., "events": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventScript {
    Bare(Vec<InputEvent>),
    Named {
        #[serde(default)]
        name: Option<String>,
        events: Vec<InputEvent>,
    },
}

struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn io(message: impl ToString) -> Self {
        Self { code: 1, message: message.to_string() }
    }

    fn rejected(message: impl ToString) -> Self {
        Self { code: 2, message: message.to_string() }
    }
}

type Outcome = Result<Value, Failure>;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => println!(r#"{{"success": false, "error": "{e}"}}"#),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match (StudioConfig {
        data_dir: cli.data_dir.clone(),
        assets_dir: cli.assets_dir.clone(),
        pixel_ratio: cli.pixel_ratio,
    })
    .validated()
    {
        Ok(c) => c,
        Err(e) => {
            print_json(&json!({ "success": false, "error": e.to_string() }));
            return ExitCode::from(2);
        }
    };

    let mut store = CardStore::open(config.storage());
    let exporter = Exporter::new(config.render_options());

    match run(cli.command, &mut store, &exporter) {
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            tracing::error!(error = %failure.message, "command failed");
            print_json(&json!({ "success": false, "error": failure.message }));
            ExitCode::from(failure.code)
        }
    }
}

fn imported_summary(imported: &ImportedTemplate) -> Value {
    json!({
        "id": imported.template.id,
        "name": imported.template.name,
        "warnings": imported.validation.warnings().collect::<Vec<_>>(),
    })
}

fn run(command: Commands, store: &mut CardStore<FileStorage>, exporter: &Exporter) -> Outcome {
    let persist = |e: cardstudio_core::StorageError| Failure::io(e);

    match command {
        Commands::Templates => {
            let state = store.state();
            let templates: Vec<_> = state
                .all_templates()
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "name": t.name,
                        "custom": state.is_custom(&t.id),
                        "active": t.id == state.current_template_id,
                    })
                })
                .collect();
            Ok(json!(templates))
        }

        Commands::Import { path } => {
            if path.is_dir() {
                let outcomes = import_dir(&path).map_err(Failure::io)?;
                let mut accepted = vec![];
                let mut rejected = vec![];
                for (file, outcome) in outcomes {
                    match outcome {
                        Ok(imported) => {
                            accepted.push(imported_summary(&imported));
                            store.update(|s| s.add_custom_template(imported.template)).map_err(persist)?;
                        }
                        Err(e) => rejected.push(json!({ "path": file, "error": e.to_string() })),
                    }
                }
                return Ok(json!({ "success": rejected.is_empty(), "imported": accepted, "rejected": rejected }));
            }

            let imported = import_template_file(&path).map_err(|e| match e {
                ImportError::Io(_) => Failure::io(e),
                _ => Failure::rejected(e),
            })?;
            let summary = imported_summary(&imported);
            store.update(|s| s.add_custom_template(imported.template)).map_err(persist)?;
            Ok(json!({ "success": true, "imported": summary }))
        }

        Commands::RemoveTemplate { id } => {
            if !store.state().is_custom(&id) {
                return Err(Failure::rejected(format!("Custom template not found: {id}")));
            }
            store.update(|s| s.remove_custom_template(&id)).map_err(persist)?;
            Ok(json!({ "success": true, "removed": id }))
        }

        Commands::Use { id } => {
            if store.state().catalog().get(&id).is_none() {
                return Err(Failure::rejected(format!("Template not found: {id}")));
            }
            let state = store.update(|s| s.set_template(&id)).map_err(persist)?;
            Ok(json!({ "success": true, "template": state.current_template_id, "fields": state.fields }))
        }

        Commands::Set { key, value } => {
            store.update(|s| s.set_field(&key, value)).map_err(persist)?;
            Ok(json!({ "success": true, "key": key, "value": store.state().field(&key) }))
        }

        Commands::Logo { file } => set_image(store, &file, true),
        Commands::Picture { file } => set_image(store, &file, false),

        Commands::ClearLogo => {
            store.update(|s| s.set_logo(None)).map_err(persist)?;
            Ok(json!({ "success": true }))
        }

        Commands::ClearPicture => {
            store.update(|s| s.set_picture(None)).map_err(persist)?;
            Ok(json!({ "success": true }))
        }

        Commands::Reset => {
            let state = store.update(|s| s.reset_fields()).map_err(persist)?;
            Ok(json!({ "success": true, "fields": state.fields }))
        }

        Commands::Save { name } => {
            if name.trim().is_empty() {
                return Err(Failure::rejected("Please enter a design name"));
            }
            store.update(|s| s.save_design(&name)).map_err(persist)?;
            Ok(json!({ "success": true, "saved": name.trim() }))
        }

        Commands::Load { name } => {
            if store.state().saved_design(&name).is_none() {
                return Err(Failure::rejected(format!("Saved design not found: {name}")));
            }
            let state = store.update(|s| s.load_design(&name)).map_err(persist)?;
            Ok(json!({ "success": true, "template": state.current_template_id, "fields": state.fields }))
        }

        Commands::DeleteDesign { name } => {
            if store.state().saved_design(&name).is_none() {
                return Err(Failure::rejected(format!("Saved design not found: {name}")));
            }
            store.update(|s| s.delete_design(&name)).map_err(persist)?;
            Ok(json!({ "success": true, "deleted": name }))
        }

        Commands::Designs => {
            let designs: Vec<_> = store
                .state()
                .saved_designs
                .iter()
                .map(|d| json!({ "name": d.name, "templateId": d.template_id, "createdAt": d.created_at }))
                .collect();
            Ok(json!(designs))
        }

        Commands::Show => {
            let state = store.state();
            Ok(json!({
                "templateId": state.current_template_id,
                "templateName": state.current_template.name,
                "fields": state.fields,
                "hasLogo": state.logo.is_some(),
                "hasPicture": state.picture.is_some(),
            }))
        }

        Commands::Fields => {
            let library = FieldLibrary::load();
            let groups: Vec<_> = library
                .user_groups()
                .into_iter()
                .map(|(name, defs)| json!({ "group": name, "fields": defs }))
                .collect();
            Ok(json!({
                "userBased": groups,
                "companyBased": library.fields(TemplateType::CompanyBased),
            }))
        }

        Commands::Icons { category, search } => {
            let found: Vec<_> = match category {
                Some(c) => icons::search(&c, &search),
                None => icons::CATEGORIES.iter().flat_map(|c| icons::search(c, &search)).collect(),
            };
            Ok(json!(found))
        }

        Commands::Export { format, out } => {
            let file = exporter.export_card(store.state(), format).map_err(Failure::io)?;
            let path = file.write_to(&out).map_err(Failure::io)?;
            Ok(json!({ "success": true, "file": file, "path": path }))
        }

        Commands::Compose { events, formats, out, register } => {
            compose(store, exporter, &events, &formats, &out, register)
        }
    }
}

fn set_image(store: &mut CardStore<FileStorage>, file: &Path, logo: bool) -> Outcome {
    let url = images::read_data_url(file).map_err(|e| match e {
        images::ImageDataError::Io(_) => Failure::io(e),
        _ => Failure::rejected(e),
    })?;
    store
        .update(|s| if logo { s.set_logo(Some(url)) } else { s.set_picture(Some(url)) })
        .map_err(Failure::io)?;
    Ok(json!({ "success": true, "file": file }))
}

fn compose(
    store: &mut CardStore<FileStorage>,
    exporter: &Exporter,
    events: &Path,
    formats: &[ExportFormat],
    out: &Path,
    register: bool,
) -> Outcome {
    let raw = std::fs::read_to_string(events).map_err(Failure::io)?;
    let script: EventScript = serde_json::from_str(&raw).map_err(Failure::rejected)?;
    let (name, events) = match script {
        EventScript::Bare(events) => (None, events),
        EventScript::Named { name, events } => (name, events),
    };

    let mut canvas = DesignerCanvas::default();
    if let Some(name) = name {
        canvas.handle(InputEvent::SetTemplateName { name });
    }
    let mut actions = vec![];
    for event in events {
        actions.extend(canvas.handle(event));
    }

    let mut files = vec![];
    for format in formats {
        let file = exporter.export_design(&canvas, *format).map_err(Failure::rejected)?;
        let path = file.write_to(out).map_err(Failure::io)?;
        files.push(json!({ "file": file, "path": path }));
    }

    let mut registered = Value::Null;
    if register {
        let template = canvas.to_template().map_err(Failure::rejected)?;
        let json = serde_json::to_string(&template).map_err(Failure::io)?;
        let imported = import_template(&json).map_err(Failure::rejected)?;
        registered = imported_summary(&imported);
        store.update(|s| s.add_custom_template(imported.template)).map_err(Failure::io)?;
    }

    Ok(json!({
        "success": true,
        "actions": actions,
        "fields": canvas.fields(),
        "exports": files,
        "registered": registered,
    }))
}
