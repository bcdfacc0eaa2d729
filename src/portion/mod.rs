//! Serving-size and ingredient text normalization.
//!
//! The free-text grammar lives behind [`PortionParser`]; the pipeline only ever
//! calls [`normalize_portion`], which turns any failure into sentinel output.

pub mod ingredients;
pub mod slicer;

use log::warn;
use std::fmt;

use crate::NO_VALUE;

pub use ingredients::format_ingredients;
pub use slicer::{RegexPortionParser, StandardUnit};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PortionParseError {
    #[error("fraction '{0}' has a zero denominator")]
    ZeroDenominator(String),
    #[error("quantity '{0}' is not a finite number")]
    NonFiniteQuantity(String),
    #[error("could not read '{0}' as a number")]
    InvalidNumber(String),
}

/// What a parser could extract from a serving descriptor. Either side may be
/// absent without that being an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPortion {
    pub quantity: Option<f64>,
    pub unit: Option<StandardUnit>,
}

pub trait PortionParser {
    fn parse(&self, text: &str) -> Result<ParsedPortion, PortionParseError>;
}

/// A field that is either a real value or the explicit `no_value` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum PortionField<T> {
    Value(T),
    NoValue,
}

impl<T> From<Option<T>> for PortionField<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => PortionField::Value(v),
            None => PortionField::NoValue,
        }
    }
}

impl<T: fmt::Display> fmt::Display for PortionField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortionField::Value(v) => write!(f, "{}", v),
            PortionField::NoValue => f.write_str(NO_VALUE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedPortion {
    pub quantity: PortionField<f64>,
    pub unit: PortionField<StandardUnit>,
}

impl StandardizedPortion {
    pub fn no_value() -> Self {
        Self {
            quantity: PortionField::NoValue,
            unit: PortionField::NoValue,
        }
    }
}

/// Runs `parser` over `text`, logging and falling back to the all-sentinel
/// result on failure so a single bad descriptor never stops the batch.
pub fn normalize_portion(parser: &dyn PortionParser, text: &str) -> StandardizedPortion {
    match parser.parse(text) {
        Ok(parsed) => StandardizedPortion {
            quantity: parsed.quantity.into(),
            unit: parsed.unit.into(),
        },
        Err(e) => {
            warn!("Could not parse portion text {:?}: {}. Using '{}'.", text, e, NO_VALUE);
            StandardizedPortion::no_value()
        }
    }
}

/// Joins the amount, unit and modifier of a portion into one descriptor for the
/// parser, skipping empty parts and sentinel units.
pub fn portion_descriptor(amount: f64, unit: &str, modifier: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    if amount > 0.0 {
        parts.push(amount.to_string());
    }
    for part in [unit, modifier] {
        let part = part.trim();
        if !part.is_empty() && part != NO_VALUE && part != "undetermined" {
            parts.push(part.to_string());
        }
    }
    parts.join(" ")
}
