//! Schema-driven field extraction over chunk text.

use super::confidence;
use super::patterns::KEY_PHRASE_PATTERNS;
use super::strategies::{self, FieldContext, FieldMatch, FieldValue, StrategyTable};
use crate::patterns::{CURRENCY_AMOUNT, PERSON_NAME};
use crate::schema::{FieldDef, FieldType, Schema, SchemaRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const MAX_PERSON_ENTITIES: usize = 3;
const MAX_MONEY_ENTITIES: usize = 3;
const MAX_KEY_PHRASES: usize = 5;

/// Categories implied by a successful schema match.
const SCHEMA_CATEGORIES: [(&str, &str, f64); 3] = [
    ("contract_terms", "legal_contract", 0.9),
    ("invoice", "financial_document", 0.9),
    ("refund_case", "customer_service", 0.8),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("confidence_threshold must be within 0.0..=1.0, got {0}")]
    ThresholdOutOfRange(f64),
}

/// Caller options for one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    #[serde(default = "default_true")]
    pub extract_entities: bool,

    #[serde(default = "default_true")]
    pub extract_categories: bool,

    /// Fields scoring below this are treated as not found.
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    confidence::DEFAULT_THRESHOLD
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            extract_entities: true,
            extract_categories: true,
            confidence_threshold: default_threshold(),
        }
    }
}

impl ExtractionOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ExtractionError::ThresholdOutOfRange(self.confidence_threshold));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub confidence: f64,
}

/// Retained field values of one schema, in declaration order.
pub type SchemaMatch = IndexMap<String, FieldValue>;

/// Output of one extraction call over a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub key_phrases: Vec<String>,

    /// Only schemas whose required fields all passed the threshold appear here.
    #[serde(default)]
    pub schema_matches: IndexMap<String, SchemaMatch>,
}

/// Applies schemas to text using a [`StrategyTable`].
///
/// Stateless between calls; one extractor can serve many threads.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    registry: Arc<SchemaRegistry>,
    strategies: StrategyTable,
}

impl FieldExtractor {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_strategies(registry, StrategyTable::builtin())
    }

    pub fn with_strategies(registry: Arc<SchemaRegistry>, strategies: StrategyTable) -> Self {
        Self {
            registry,
            strategies,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Extract fields for each named schema plus entities, categories and key
    /// phrases. Unknown schema names are skipped with a warning.
    pub fn extract<S: AsRef<str>>(
        &self,
        text: &str,
        schema_names: &[S],
        options: &ExtractionOptions,
    ) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        for name in schema_names {
            let name = name.as_ref();
            let Some(schema) = self.registry.get_schema(name) else {
                tracing::warn!(target: "extract", "schema {name} not found");
                continue;
            };

            match self.apply_schema(text, schema, options) {
                Some(fields) => {
                    tracing::debug!(target: "extract", "schema {name}: {} fields", fields.len());
                    result.schema_matches.insert(name.to_string(), fields);
                }
                None => tracing::debug!(target: "extract", "schema {name}: no match"),
            }
        }

        if options.extract_entities {
            result.entities = extract_entities(text);
        }
        if options.extract_categories {
            result.categories = categories_for(&result.schema_matches);
        }
        result.key_phrases = extract_key_phrases(text);

        result
    }

    /// Retained fields for one schema, or `None` when a required field is
    /// missing or nothing was retained.
    pub fn apply_schema(
        &self,
        text: &str,
        schema: &Schema,
        options: &ExtractionOptions,
    ) -> Option<SchemaMatch> {
        let mut retained = SchemaMatch::new();

        for (field_name, field) in &schema.fields {
            let Some(found) = self.extract_field(text, field_name, field, schema) else {
                continue;
            };
            if found.passes(options.confidence_threshold) {
                retained.insert(field_name.clone(), found.value);
            } else {
                tracing::trace!(
                    target: "extract",
                    "field {field_name} below threshold ({:.2})",
                    found.confidence
                );
            }
        }

        if let Some(missing) = schema.required.iter().find(|r| !retained.contains_key(*r)) {
            tracing::debug!(
                target: "extract",
                "schema {} missing required field {missing}",
                schema.id
            );
            return None;
        }

        (!retained.is_empty()).then_some(retained)
    }

    /// Score one field. `None` for types this crate does not extract.
    pub fn extract_field(
        &self,
        text: &str,
        field_name: &str,
        field: &FieldDef,
        schema: &Schema,
    ) -> Option<FieldMatch> {
        let ctx = FieldContext {
            text,
            field_name,
            field,
            schema,
            registry: &self.registry,
        };

        if field.field_type == FieldType::String {
            if schema.is_span(field_name) {
                return Some(strategies::span_value(&ctx));
            }
            if let Some(values) = &field.enum_values {
                return Some(strategies::enum_value(text, values));
            }
            if let Some(reference) = &field.enum_ref {
                return Some(strategies::enum_ref_value(&ctx, reference));
            }
        }

        self.strategies
            .resolve(field.field_type, field_name)
            .map(|strategy| strategy.extract(&ctx))
    }
}

/// Capitalized name pairs and currency amounts.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let people = PERSON_NAME
        .find_iter(text)
        .take(MAX_PERSON_ENTITIES)
        .map(|m| Entity {
            text: m.as_str().to_string(),
            label: "PERSON".to_string(),
            confidence: confidence::PERSON_ENTITY,
        });
    let money = CURRENCY_AMOUNT
        .find_iter(text)
        .take(MAX_MONEY_ENTITIES)
        .map(|m| Entity {
            text: m.as_str().to_string(),
            label: "MONEY".to_string(),
            confidence: confidence::MONEY_ENTITY,
        });
    people.chain(money).collect()
}

fn categories_for(matches: &IndexMap<String, SchemaMatch>) -> Vec<Category> {
    SCHEMA_CATEGORIES
        .iter()
        .filter(|(schema, _, _)| matches.contains_key(*schema))
        .map(|(_, name, confidence)| Category {
            name: name.to_string(),
            confidence: *confidence,
        })
        .collect()
}

/// Fixed legal and date phrases, lowercased and deduplicated.
pub fn extract_key_phrases(text: &str) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::new();
    for pattern in KEY_PHRASE_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let phrase = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            if !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
            if phrases.len() == MAX_KEY_PHRASES {
                return phrases;
            }
        }
    }
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, Vocabulary};

    fn invoice_schema() -> Schema {
        Schema::new("invoice")
            .field("invoice_no", FieldDef::new(FieldType::String))
            .field("grand_total", FieldDef::new(FieldType::Number))
            .require("invoice_no")
            .require("grand_total")
    }

    fn extractor(schemas: Vec<Schema>) -> FieldExtractor {
        let mut vocab = Vocabulary::new();
        vocab.insert("priorities".to_string(), vec!["urgent".to_string(), "low".to_string()]);
        let registry = SchemaRegistry::from_parts(
            schemas.into_iter().map(|s| (s.id.clone(), s)),
            [("support".to_string(), vocab)],
        );
        FieldExtractor::new(Arc::new(registry))
    }

    #[test]
    fn test_required_fields_all_or_nothing() {
        let extractor = extractor(vec![invoice_schema()]);
        let result = extractor.extract(
            "Invoice #INV-2024-001 for consulting",
            &["invoice"],
            &ExtractionOptions::default(),
        );
        assert!(!result.schema_matches.contains_key("invoice"));
        assert!(result.categories.is_empty());
    }

    #[test]
    fn test_invoice_match() {
        let extractor = extractor(vec![invoice_schema()]);
        let result = extractor.extract(
            "Invoice #INV-2024-001\nConsulting services\nGrand Total: $1,250.00",
            &["invoice"],
            &ExtractionOptions::default(),
        );

        let invoice = &result.schema_matches["invoice"];
        assert_eq!(invoice["invoice_no"], FieldValue::Text("INV-2024-001".into()));
        assert_eq!(invoice["grand_total"], FieldValue::Number(1250.0));
        assert_eq!(result.categories[0].name, "financial_document");
        assert!(result.entities.iter().any(|e| e.label == "MONEY" && e.text == "$1,250.00"));
    }

    #[test]
    fn test_unknown_schema_skipped() {
        let extractor = extractor(vec![invoice_schema()]);
        let result = extractor.extract("text", &["nope"], &ExtractionOptions::default());
        assert!(result.schema_matches.is_empty());
    }

    #[test]
    fn test_enum_and_enum_ref_and_span() {
        let schema = Schema::new("support_case")
            .field(
                "channel",
                FieldDef::new(FieldType::String).with_enum(["email", "phone"]),
            )
            .field(
                "priority",
                FieldDef::new(FieldType::String).with_enum_ref("support.priorities"),
            )
            .field(
                "category",
                FieldDef::new(FieldType::String).with_enum_ref("support.missing"),
            )
            .field("resolution", FieldDef::new(FieldType::String))
            .span("resolution");
        let extractor = extractor(vec![schema]);

        let result = extractor.extract(
            "Customer called by PHONE about an URGENT outage. Resolution: replaced router.",
            &["support_case"],
            &ExtractionOptions::default(),
        );
        let fields = &result.schema_matches["support_case"];
        assert_eq!(fields["channel"], FieldValue::Text("phone".into()));
        assert_eq!(fields["priority"], FieldValue::Text("urgent".into()));
        assert_eq!(fields["resolution"], FieldValue::Text("replaced router".into()));
        assert!(!fields.contains_key("category"));
    }

    #[test]
    fn test_threshold_filters_fields() {
        let schema = Schema::new("notes").field("quantity", FieldDef::new(FieldType::Number));
        let extractor = extractor(vec![schema]);

        let options = ExtractionOptions::default().with_threshold(0.75);
        let result = extractor.extract("Ordered 12 units", &["notes"], &options);
        assert!(result.schema_matches.is_empty());

        let options = ExtractionOptions::default().with_threshold(0.7);
        let result = extractor.extract("Ordered 12 units", &["notes"], &options);
        assert_eq!(result.schema_matches["notes"]["quantity"], FieldValue::Number(12.0));
    }

    #[test]
    fn test_flags_disable_entities_and_categories() {
        let extractor = extractor(vec![invoice_schema()]);
        let options = ExtractionOptions {
            extract_entities: false,
            extract_categories: false,
            ..Default::default()
        };
        let result = extractor.extract(
            "Invoice #INV-1 Grand Total: $5.00 signed by Jane Smith",
            &["invoice"],
            &options,
        );
        assert!(result.schema_matches.contains_key("invoice"));
        assert!(result.entities.is_empty());
        assert!(result.categories.is_empty());
    }

    #[test]
    fn test_entities_capped() {
        let text = "Ann Lee, Bob Ray, Cal Poe, Dee Fox paid $1, $2, $3, $4";
        let entities = extract_entities(text);
        assert_eq!(entities.iter().filter(|e| e.label == "PERSON").count(), 3);
        assert_eq!(entities.iter().filter(|e| e.label == "MONEY").count(), 3);
    }

    #[test]
    fn test_key_phrases() {
        let text = "Payment Terms apply. The payment terms and Governing Law. Due date soon. \
                    Parties and renewal and signatures.";
        let phrases = extract_key_phrases(text);
        assert_eq!(
            phrases,
            vec!["payment terms", "governing law", "due date", "parties", "renewal"]
        );
    }

    #[test]
    fn test_options_validation() {
        assert!(ExtractionOptions::default().validate().is_ok());
        assert_eq!(
            ExtractionOptions::default().with_threshold(1.5).validate(),
            Err(ExtractionError::ThresholdOutOfRange(1.5))
        );
        assert!(ExtractionOptions::default().with_threshold(f64::NAN).validate().is_err());
    }
}
