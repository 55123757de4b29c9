//! Confidence scores assigned by each extraction strategy.
//!
//! Calibration lives here so scores can be compared and tuned side by side.

/// Free-text span captured for a field listed in `spans`.
pub const SPAN_MATCH: f64 = 0.8;

/// Enum value found in the text, inline or through a vocabulary.
pub const ENUM_MATCH: f64 = 0.9;

pub const DATE_MATCH: f64 = 0.8;

/// Invoice or reference number after its label.
pub const REFERENCE_MATCH: f64 = 0.8;

pub const CURRENCY_MATCH: f64 = 0.9;

pub const CUSTOMER_MATCH: f64 = 0.8;

/// Value after a generic `field name:` label.
pub const LABELED_VALUE: f64 = 0.7;

pub const PARTIES_MATCH: f64 = 0.8;

/// List fields without a dedicated strategy.
pub const LIST_PLACEHOLDER: f64 = 0.5;

/// Amount after a total/amount/sum keyword.
pub const TOTAL_AMOUNT: f64 = 0.9;

/// Amount after a subtotal or tax keyword.
pub const SUBTOTAL_AMOUNT: f64 = 0.8;

/// First bare number in the text.
pub const FIRST_NUMBER: f64 = 0.7;

/// Object fields have no strategy yet.
pub const OBJECT_PLACEHOLDER: f64 = 0.5;

pub const NO_MATCH: f64 = 0.0;

pub const PERSON_ENTITY: f64 = 0.8;
pub const MONEY_ENTITY: f64 = 0.9;
pub const EMAIL_ENTITY: f64 = 0.9;
pub const PHONE_ENTITY: f64 = 0.8;

pub const ACTION_ITEM: f64 = 0.7;

/// Default caller threshold: labeled values pass, placeholders do not.
pub const DEFAULT_THRESHOLD: f64 = 0.7;
