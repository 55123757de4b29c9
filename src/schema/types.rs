//! Schema and vocabulary definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named enumerations: `enum_name -> [values]`.
pub type Vocabulary = IndexMap<String, Vec<String>>;

/// Declared value type of a schema field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    #[serde(alias = "array")]
    List,
    #[serde(alias = "integer", alias = "float")]
    Number,
    Object,
    /// Any type name this crate does not extract; such fields are skipped.
    #[serde(other)]
    Unsupported,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::List => "list",
            FieldType::Number => "number",
            FieldType::Object => "object",
            FieldType::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of one extractable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Allowed values, matched case-insensitively against the text.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    /// `vocabulary.enum_name` reference resolved through the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_enum_ref(mut self, reference: impl Into<String>) -> Self {
        self.enum_ref = Some(reference.into());
        self
    }
}

/// A declarative set of fields to extract from chunk text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Identifier declared in the file. The registry name (file stem, plus
    /// domain for domain schemas) is what callers use for lookups.
    #[serde(rename = "$id", alias = "name", default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fields in declaration order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldDef>,

    #[serde(default)]
    pub required: Vec<String>,

    /// String fields captured as free-text spans.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<String>,
}

impl Schema {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn span(mut self, name: impl Into<String>) -> Self {
        self.spans.push(name.into());
        self
    }

    pub fn is_span(&self, field: &str) -> bool {
        self.spans.iter().any(|s| s == field)
    }

    /// Required names that are not declared as fields. Such a schema can never
    /// match.
    pub fn undeclared_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|name| !self.fields.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Split an `enum_ref` into `(vocabulary, enum_name)`.
pub fn split_enum_ref(reference: &str) -> Option<(&str, &str)> {
    let (vocab, name) = reference.split_once('.')?;
    if vocab.is_empty() || name.is_empty() || name.contains('.') {
        return None;
    }
    Some((vocab, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_from_json() {
        let json = r#"{
            "$id": "invoice",
            "title": "Invoice",
            "fields": {
                "invoice_no": {"type": "string"},
                "grand_total": {"type": "number"},
                "status": {"type": "string", "enum": ["paid", "unpaid"]},
                "currency": {"type": "string", "enum_ref": "common.currencies"},
                "line_items": {"type": "array"},
                "flag": {"type": "boolean"}
            },
            "required": ["invoice_no", "grand_total"]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();

        assert_eq!(schema.id, "invoice");
        let names: Vec<&str> = schema.fields.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["invoice_no", "grand_total", "status", "currency", "line_items", "flag"]
        );
        assert_eq!(schema.fields["grand_total"].field_type, FieldType::Number);
        assert_eq!(schema.fields["line_items"].field_type, FieldType::List);
        assert_eq!(schema.fields["flag"].field_type, FieldType::Unsupported);
        assert_eq!(
            schema.fields["status"].enum_values.as_deref(),
            Some(&["paid".to_string(), "unpaid".to_string()][..])
        );
        assert!(schema.spans.is_empty());
    }

    #[test]
    fn test_missing_type_defaults_to_string() {
        let def: FieldDef = serde_json::from_str("{}").unwrap();
        assert_eq!(def.field_type, FieldType::String);
    }

    #[test]
    fn test_undeclared_required() {
        let schema = Schema::new("s")
            .field("a", FieldDef::new(FieldType::String))
            .require("a")
            .require("b");
        assert_eq!(schema.undeclared_required(), vec!["b"]);
    }

    #[test]
    fn test_split_enum_ref() {
        assert_eq!(split_enum_ref("common.currencies"), Some(("common", "currencies")));
        assert_eq!(split_enum_ref("nodot"), None);
        assert_eq!(split_enum_ref("a.b.c"), None);
        assert_eq!(split_enum_ref(".x"), None);
    }
}
