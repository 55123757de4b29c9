//! Field extraction strategies.
//!
//! Each field is scored by exactly one strategy, chosen by declared type and
//! field name from a [`StrategyTable`]. Exact names win over name suffixes,
//! which win over the per-type fallback.

use super::confidence;
use super::patterns::{
    self, CURRENCY_CODE, CURRENCY_SYMBOL, CUSTOMER_PATTERNS, GENERIC_REFERENCE,
    INVOICE_REFERENCE, PARTY_LIST_SEPARATOR, PARTY_PATTERNS, SPAN_PATTERNS, TOTAL_FAMILY,
};
use crate::patterns::{DATE_PATTERNS, NUMBER, parse_amount};
use crate::schema::{FieldDef, FieldType, Schema, SchemaRegistry};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const MAX_PARTIES: usize = 5;
const PARTY_STOPWORDS: [&str; 5] = ["and", "the", "of", "in", "to"];

/// Characters after a date label searched for the date itself.
const DATE_LABEL_WINDOW: usize = 48;

/// An extracted field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Object(map) => map.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
            FieldValue::Object(map) => write!(f, "{}", serde_json::Value::Object(map.clone())),
        }
    }
}

/// A candidate value with the strategy's confidence in it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub value: FieldValue,
    pub confidence: f64,
}

impl FieldMatch {
    pub fn new(value: FieldValue, confidence: f64) -> Self {
        Self { value, confidence }
    }

    pub fn text(value: impl Into<String>, confidence: f64) -> Self {
        Self::new(FieldValue::Text(value.into()), confidence)
    }

    pub fn number(value: f64, confidence: f64) -> Self {
        Self::new(FieldValue::Number(value), confidence)
    }

    pub fn text_miss() -> Self {
        Self::text("", confidence::NO_MATCH)
    }

    pub fn number_miss() -> Self {
        Self::number(0.0, confidence::NO_MATCH)
    }

    /// A miss (zero confidence) never passes, whatever the threshold.
    pub fn passes(&self, threshold: f64) -> bool {
        self.confidence > confidence::NO_MATCH && self.confidence >= threshold
    }
}

/// Everything a strategy may look at.
pub struct FieldContext<'a> {
    pub text: &'a str,
    pub field_name: &'a str,
    pub field: &'a FieldDef,
    pub schema: &'a Schema,
    pub registry: &'a SchemaRegistry,
}

/// Scores one field against a chunk of text.
pub trait FieldStrategy: Send + Sync {
    fn extract(&self, ctx: &FieldContext<'_>) -> FieldMatch;
}

impl<F> FieldStrategy for F
where
    F: Fn(&FieldContext<'_>) -> FieldMatch + Send + Sync,
{
    fn extract(&self, ctx: &FieldContext<'_>) -> FieldMatch {
        self(ctx)
    }
}

/// Strategy lookup by field type and name.
#[derive(Clone, Default)]
pub struct StrategyTable {
    named: HashMap<(FieldType, String), Arc<dyn FieldStrategy>>,
    suffixes: Vec<(FieldType, String, Arc<dyn FieldStrategy>)>,
    fallbacks: HashMap<FieldType, Arc<dyn FieldStrategy>>,
}

impl fmt::Debug for StrategyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<String> = self
            .named
            .keys()
            .map(|(ty, name)| format!("{ty}:{name}"))
            .collect();
        named.sort();
        f.debug_struct("StrategyTable")
            .field("named", &named)
            .field("suffixes", &self.suffixes.iter().map(|(t, s, _)| format!("{t}:*{s}")).collect::<Vec<_>>())
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}

impl StrategyTable {
    /// Table with the built-in strategies registered.
    pub fn builtin() -> Self {
        let mut table = Self::default();

        for name in ["effective_date", "issue_date", "due_date"] {
            table.register(FieldType::String, name, date_value);
        }
        table.register_suffix(FieldType::String, "_date", date_value);
        for name in ["invoice_no", "invoice_number"] {
            table.register(FieldType::String, name, invoice_reference);
        }
        for name in ["reference", "reference_no", "reference_number"] {
            table.register(FieldType::String, name, generic_reference);
        }
        table.register(FieldType::String, "currency", currency);
        table.register(FieldType::String, "customer", customer);
        table.register(FieldType::String, "status", status);
        table.set_fallback(FieldType::String, labeled_value);

        table.register(FieldType::List, "parties", parties);
        table.set_fallback(FieldType::List, list_placeholder);

        for name in ["grand_total", "total", "amount", "sum", "total_amount"] {
            table.register(FieldType::Number, name, total_amount);
        }
        for name in ["subtotal", "tax_total", "tax"] {
            table.register(FieldType::Number, name, subtotal_amount);
        }
        table.set_fallback(FieldType::Number, first_number);

        table.set_fallback(FieldType::Object, object_placeholder);

        table
    }

    pub fn register<S>(&mut self, field_type: FieldType, name: impl Into<String>, strategy: S)
    where
        S: FieldStrategy + 'static,
    {
        self.named.insert((field_type, name.into()), Arc::new(strategy));
    }

    pub fn register_suffix<S>(&mut self, field_type: FieldType, suffix: impl Into<String>, strategy: S)
    where
        S: FieldStrategy + 'static,
    {
        self.suffixes.push((field_type, suffix.into(), Arc::new(strategy)));
    }

    pub fn set_fallback<S>(&mut self, field_type: FieldType, strategy: S)
    where
        S: FieldStrategy + 'static,
    {
        self.fallbacks.insert(field_type, Arc::new(strategy));
    }

    /// Strategy for a field, or `None` when the type has no fallback.
    pub fn resolve(&self, field_type: FieldType, name: &str) -> Option<&dyn FieldStrategy> {
        if let Some(strategy) = self.named.get(&(field_type, name.to_string())) {
            return Some(strategy.as_ref());
        }
        if let Some((_, _, strategy)) = self
            .suffixes
            .iter()
            .find(|(ty, suffix, _)| *ty == field_type && name.ends_with(suffix.as_str()))
        {
            return Some(strategy.as_ref());
        }
        self.fallbacks.get(&field_type).map(|s| s.as_ref())
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Free-text span after the field's label.
pub fn span_value(ctx: &FieldContext<'_>) -> FieldMatch {
    let fixed = SPAN_PATTERNS
        .iter()
        .find(|(name, _)| *name == ctx.field_name)
        .map(|(_, re)| re.clone());
    let pattern = fixed.or_else(|| patterns::label_pattern(ctx.field_name));

    pattern
        .and_then(|re| first_capture(&re, ctx.text))
        .map_or_else(FieldMatch::text_miss, |value| {
            FieldMatch::text(value, confidence::SPAN_MATCH)
        })
}

/// First listed value occurring in the text, case-insensitively.
pub fn enum_value(text: &str, values: &[String]) -> FieldMatch {
    let haystack = text.to_lowercase();
    values
        .iter()
        .find(|value| !value.is_empty() && haystack.contains(&value.to_lowercase()))
        .map_or_else(FieldMatch::text_miss, |value| {
            FieldMatch::text(value.clone(), confidence::ENUM_MATCH)
        })
}

/// Enum match through a vocabulary reference; unresolved references miss.
pub fn enum_ref_value(ctx: &FieldContext<'_>, reference: &str) -> FieldMatch {
    match ctx.registry.resolve_enum(reference) {
        Some(values) => enum_value(ctx.text, values),
        None => {
            tracing::debug!(
                target: "extract",
                "unresolved enum_ref {reference} for field {}",
                ctx.field_name
            );
            FieldMatch::text_miss()
        }
    }
}

fn first_date(text: &str) -> Option<String> {
    DATE_PATTERNS
        .iter()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

/// A date after the field's own label, else the first date in the text.
fn date_value(ctx: &FieldContext<'_>) -> FieldMatch {
    let labeled = patterns::phrase_pattern(ctx.field_name)
        .and_then(|re| re.find(ctx.text))
        .and_then(|m| {
            let rest = &ctx.text[m.end()..];
            let end = rest
                .char_indices()
                .nth(DATE_LABEL_WINDOW)
                .map_or(rest.len(), |(i, _)| i);
            first_date(&rest[..end])
        });

    labeled
        .or_else(|| first_date(ctx.text))
        .map_or_else(FieldMatch::text_miss, |date| {
            FieldMatch::text(date, confidence::DATE_MATCH)
        })
}

/// First labeled reference whose identifier contains a digit.
fn reference_from(re: &Regex, text: &str) -> FieldMatch {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('-'))
        .find(|value| value.chars().any(|c| c.is_ascii_digit()))
        .map_or_else(FieldMatch::text_miss, |value| {
            FieldMatch::text(value, confidence::REFERENCE_MATCH)
        })
}

fn invoice_reference(ctx: &FieldContext<'_>) -> FieldMatch {
    reference_from(&INVOICE_REFERENCE, ctx.text)
}

fn generic_reference(ctx: &FieldContext<'_>) -> FieldMatch {
    reference_from(&GENERIC_REFERENCE, ctx.text)
}

/// Currency symbol, else an ISO code.
fn currency(ctx: &FieldContext<'_>) -> FieldMatch {
    if let Some(m) = CURRENCY_SYMBOL.find(ctx.text) {
        return FieldMatch::text(m.as_str(), confidence::CURRENCY_MATCH);
    }
    first_capture(&CURRENCY_CODE, ctx.text).map_or_else(FieldMatch::text_miss, |code| {
        FieldMatch::text(code.to_uppercase(), confidence::CURRENCY_MATCH)
    })
}

fn customer(ctx: &FieldContext<'_>) -> FieldMatch {
    CUSTOMER_PATTERNS
        .iter()
        .find_map(|re| first_capture(re, ctx.text))
        .map_or_else(FieldMatch::text_miss, |value| {
            FieldMatch::text(value, confidence::CUSTOMER_MATCH)
        })
}

/// Status is only meaningful against a closed set of values.
fn status(ctx: &FieldContext<'_>) -> FieldMatch {
    match &ctx.field.enum_values {
        Some(values) => enum_value(ctx.text, values),
        None => FieldMatch::text_miss(),
    }
}

fn labeled_value(ctx: &FieldContext<'_>) -> FieldMatch {
    patterns::label_pattern(ctx.field_name)
        .and_then(|re| first_capture(&re, ctx.text))
        .map_or_else(FieldMatch::text_miss, |value| {
            FieldMatch::text(value, confidence::LABELED_VALUE)
        })
}

fn parties(ctx: &FieldContext<'_>) -> FieldMatch {
    let mut candidates: Vec<String> = Vec::new();
    for (i, re) in PARTY_PATTERNS.iter().enumerate() {
        for caps in re.captures_iter(ctx.text) {
            for group in caps.iter().skip(1).flatten() {
                if i == 1 {
                    candidates.extend(
                        PARTY_LIST_SEPARATOR
                            .split(group.as_str())
                            .map(str::to_string),
                    );
                } else {
                    candidates.push(group.as_str().to_string());
                }
            }
        }
    }

    let mut found: Vec<String> = Vec::new();
    for candidate in candidates {
        let party = candidate.trim().trim_end_matches([',', ';', ':']);
        if party.chars().count() <= 2 || PARTY_STOPWORDS.contains(&party.to_lowercase().as_str()) {
            continue;
        }
        if found.iter().any(|f| f.eq_ignore_ascii_case(party)) {
            continue;
        }
        found.push(party.to_string());
        if found.len() == MAX_PARTIES {
            break;
        }
    }

    if found.is_empty() {
        list_placeholder(ctx)
    } else {
        FieldMatch::new(FieldValue::List(found), confidence::PARTIES_MATCH)
    }
}

fn list_placeholder(_ctx: &FieldContext<'_>) -> FieldMatch {
    FieldMatch::new(FieldValue::List(Vec::new()), confidence::LIST_PLACEHOLDER)
}

fn amount_after(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

/// Totals look for their own keyword first, then any total-like keyword.
/// They never fall back to the first number: in "Invoice #INV-2024-001" that
/// would be 2024, and a required total must miss rather than report it.
fn total_amount(ctx: &FieldContext<'_>) -> FieldMatch {
    patterns::keyword_amount_pattern(&patterns::field_words(ctx.field_name))
        .and_then(|re| amount_after(&re, ctx.text))
        .or_else(|| amount_after(&TOTAL_FAMILY, ctx.text))
        .map_or_else(FieldMatch::number_miss, |value| {
            FieldMatch::number(value, confidence::TOTAL_AMOUNT)
        })
}

fn subtotal_amount(ctx: &FieldContext<'_>) -> FieldMatch {
    let own = patterns::field_words(ctx.field_name);
    let keywords: Vec<String> = match ctx.field_name {
        "subtotal" => vec![r"sub\s*-?\s*total".to_string()],
        "tax_total" => vec![own, "tax".to_string()],
        _ => vec![own],
    };

    keywords
        .iter()
        .filter_map(|keyword| patterns::keyword_amount_pattern(keyword))
        .find_map(|re| amount_after(&re, ctx.text))
        .map_or_else(FieldMatch::number_miss, |value| {
            FieldMatch::number(value, confidence::SUBTOTAL_AMOUNT)
        })
}

fn first_number(ctx: &FieldContext<'_>) -> FieldMatch {
    NUMBER
        .find(ctx.text)
        .and_then(|m| parse_amount(m.as_str()))
        .map_or_else(FieldMatch::number_miss, |value| {
            FieldMatch::number(value, confidence::FIRST_NUMBER)
        })
}

fn object_placeholder(_ctx: &FieldContext<'_>) -> FieldMatch {
    FieldMatch::new(
        FieldValue::Object(serde_json::Map::new()),
        confidence::OBJECT_PLACEHOLDER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(table: &StrategyTable, ty: FieldType, name: &str, text: &str) -> FieldMatch {
        let field = FieldDef::new(ty);
        let schema = Schema::new("test").field(name, field.clone());
        let registry = SchemaRegistry::empty();
        let ctx = FieldContext {
            text,
            field_name: name,
            field: &field,
            schema: &schema,
            registry: &registry,
        };
        table.resolve(ty, name).unwrap().extract(&ctx)
    }

    fn custom(_ctx: &FieldContext<'_>) -> FieldMatch {
        FieldMatch::text("custom", 1.0)
    }

    #[test]
    fn test_resolution_order() {
        let mut table = StrategyTable::builtin();
        table.register(FieldType::String, "renewal_date", custom);

        assert_eq!(run(&table, FieldType::String, "renewal_date", "x").value.as_text(), Some("custom"));
        let m = run(&table, FieldType::String, "ship_date", "Shipped 2024-01-05");
        assert_eq!(m.value.as_text(), Some("2024-01-05"));
        assert!(table.resolve(FieldType::Unsupported, "anything").is_none());
    }

    #[test]
    fn test_date_prefers_own_label() {
        let table = StrategyTable::builtin();
        let text = "Issue date: 03/01/2024. Due date: 03/31/2024.";
        let due = run(&table, FieldType::String, "due_date", text);
        assert_eq!(due.value.as_text(), Some("03/31/2024"));
        assert_eq!(due.confidence, confidence::DATE_MATCH);
        let issue = run(&table, FieldType::String, "issue_date", text);
        assert_eq!(issue.value.as_text(), Some("03/01/2024"));
    }

    #[test]
    fn test_invoice_reference_needs_digit() {
        let table = StrategyTable::builtin();
        let m = run(
            &table,
            FieldType::String,
            "invoice_no",
            "Invoice Summary\nInvoice #INV-2024-001 for services",
        );
        assert_eq!(m.value.as_text(), Some("INV-2024-001"));
        assert_eq!(m.confidence, confidence::REFERENCE_MATCH);

        let m = run(&table, FieldType::String, "invoice_no", "Invoice Summary only");
        assert_eq!(m.confidence, confidence::NO_MATCH);
    }

    #[test]
    fn test_currency_symbol_then_code() {
        let table = StrategyTable::builtin();
        assert_eq!(
            run(&table, FieldType::String, "currency", "Pay €40 now").value.as_text(),
            Some("€")
        );
        assert_eq!(
            run(&table, FieldType::String, "currency", "Amounts in usd").value.as_text(),
            Some("USD")
        );
    }

    #[test]
    fn test_customer_and_labeled_value() {
        let table = StrategyTable::builtin();
        let m = run(&table, FieldType::String, "customer", "Bill to: Acme Corp\nItems");
        assert_eq!(m.value.as_text(), Some("Acme Corp"));

        let m = run(&table, FieldType::String, "order_id", "Order ID: A-77. Thanks");
        assert_eq!(m.value.as_text(), Some("A-77"));
        assert_eq!(m.confidence, confidence::LABELED_VALUE);

        let m = run(&table, FieldType::String, "status", "status: open");
        assert!(!m.passes(0.0));
    }

    #[test]
    fn test_parties() {
        let table = StrategyTable::builtin();
        let text = "This Agreement is made between Acme Corp and Beta LLC. \
                    Parties: Acme Corp, Gamma Inc";
        let m = run(&table, FieldType::List, "parties", text);
        assert_eq!(
            m.value,
            FieldValue::List(vec![
                "Acme Corp".to_string(),
                "Beta LLC".to_string(),
                "Gamma Inc".to_string()
            ])
        );
        assert_eq!(m.confidence, confidence::PARTIES_MATCH);

        let m = run(&table, FieldType::List, "parties", "no contract here");
        assert_eq!(m.confidence, confidence::LIST_PLACEHOLDER);
    }

    #[test]
    fn test_numbers() {
        let table = StrategyTable::builtin();
        let text = "Subtotal: $1,000.00\nTax: $80.00\nGrand Total: $1,080.00";

        let m = run(&table, FieldType::Number, "grand_total", text);
        assert_eq!(m.value.as_number(), Some(1080.0));
        assert_eq!(m.confidence, confidence::TOTAL_AMOUNT);

        let m = run(&table, FieldType::Number, "subtotal", text);
        assert_eq!(m.value.as_number(), Some(1000.0));
        assert_eq!(m.confidence, confidence::SUBTOTAL_AMOUNT);

        let m = run(&table, FieldType::Number, "tax_total", text);
        assert_eq!(m.value.as_number(), Some(80.0));

        let m = run(&table, FieldType::Number, "quantity", "Ordered 12 units");
        assert_eq!(m.value.as_number(), Some(12.0));
        assert_eq!(m.confidence, confidence::FIRST_NUMBER);

        let m = run(&table, FieldType::Number, "grand_total", "Invoice #INV-2024-001");
        assert_eq!(m, FieldMatch::number_miss());
    }

    #[test]
    fn test_placeholders_and_passes() {
        let table = StrategyTable::builtin();
        let m = run(&table, FieldType::Object, "details", "anything");
        assert!(m.value.is_empty());
        assert_eq!(m.confidence, confidence::OBJECT_PLACEHOLDER);
        assert!(!m.passes(0.7));
        assert!(m.passes(0.5));
        assert!(!FieldMatch::text_miss().passes(0.0));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Number(1250.0).to_string(), "1250");
        assert_eq!(
            FieldValue::List(vec!["a".into(), "b".into()]).to_string(),
            "a, b"
        );
    }
}
