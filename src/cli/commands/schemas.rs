//! Schemas command: inspect the registry.

use anyhow::{Result, bail};

use super::load_registry;
use crate::cli::SchemaAction;
use crate::cli::table::new_table;
use crate::config::Settings;
use crate::schema::SchemaRegistry;

pub fn run(action: SchemaAction, settings: &Settings) -> Result<()> {
    let registry = load_registry(settings)?;

    match action {
        SchemaAction::List => {
            let mut table = new_table(["Schema", "Fields", "Required", "References"]);
            for name in registry.list_schemas() {
                let Some(schema) = registry.get_schema(name) else {
                    continue;
                };
                let references = if registry.validate_schema_references(name) {
                    "ok"
                } else {
                    "unresolved"
                };
                table.add_row(vec![
                    name.to_string(),
                    schema.fields.len().to_string(),
                    schema.required.join(", "),
                    references.to_string(),
                ]);
            }
            println!("{table}");

            let vocabularies = registry.list_vocabularies();
            if !vocabularies.is_empty() {
                println!("Vocabularies: {}", vocabularies.join(", "));
            }
        }

        SchemaAction::Show { name } => {
            let Some(schema) = registry.get_schema(&name) else {
                bail!("Schema '{name}' not found");
            };
            println!("{}", serde_json::to_string_pretty(schema)?);
        }

        SchemaAction::Validate { name } => {
            let problems = validation_problems(&registry, name.as_deref())?;
            if problems.is_empty() {
                println!("All schemas valid.");
            } else {
                for problem in &problems {
                    println!("{problem}");
                }
                bail!("{} problem(s) found", problems.len());
            }
        }
    }

    Ok(())
}

/// Human-readable problems for one schema, or for the whole registry
/// including files that failed to load.
pub fn validation_problems(registry: &SchemaRegistry, name: Option<&str>) -> Result<Vec<String>> {
    let names: Vec<&str> = match name {
        Some(name) => {
            if registry.get_schema(name).is_none() {
                bail!("Schema '{name}' not found");
            }
            vec![name]
        }
        None => registry.list_schemas(),
    };

    let mut problems = Vec::new();
    if name.is_none() {
        for issue in registry.issues() {
            problems.push(format!("{}: {}", issue.path.display(), issue.message));
        }
    }

    for name in names {
        for unresolved in registry.unresolved_references(name) {
            problems.push(format!(
                "{name}.{}: unresolved enum_ref '{}'",
                unresolved.field, unresolved.reference
            ));
        }
        if let Some(schema) = registry.get_schema(name) {
            for missing in schema.undeclared_required() {
                problems.push(format!("{name}: required field '{missing}' is not declared"));
            }
        }
    }

    Ok(problems)
}
