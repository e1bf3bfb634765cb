//! Boundary helpers: turning user-typed text and optional fields into checked `f64`s.

use serde::{Deserialize, Deserializer};

use crate::DomainError;

/// Parses a user-typed number. Surrounding whitespace and thousands
/// separators (`,` and the full-width `，`) are ignored. Empty input and
/// anything that is not a finite number yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != '，').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn ensure_finite(field: &'static str, v: f64) -> Result<f64, DomainError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DomainError::InvalidInput { field, reason: format!("must be a finite number, got {v}") })
    }
}

pub fn ensure_all_finite(fields: &[(&'static str, f64)]) -> Result<(), DomainError> {
    for (field, v) in fields {
        ensure_finite(field, *v)?;
    }
    Ok(())
}

/// Face values and prices must be finite and strictly positive.
pub fn ensure_positive(field: &'static str, v: f64) -> Result<f64, DomainError> {
    ensure_finite(field, v)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(DomainError::InvalidInput { field, reason: format!("must be greater than zero, got {v}") })
    }
}

pub fn ensure_all_positive(fields: &[(&'static str, f64)]) -> Result<(), DomainError> {
    for (field, v) in fields {
        ensure_positive(field, *v)?;
    }
    Ok(())
}

/// Rejects an exactly-zero denominator, naming the inputs that produced it.
pub fn non_zero(condition: &'static str, denom: f64) -> Result<f64, DomainError> {
    if denom == 0.0 {
        Err(DomainError::ZeroDenominator { condition })
    } else {
        Ok(denom)
    }
}

/// One numeric form field as the caller sent it. Blank text and JSON `null`
/// count as absent; text that is present but not a number is kept so it can
/// be reported instead of being mistaken for an absent field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field {
    #[default]
    Absent,
    Value(f64),
    Invalid(String),
}

impl Field {
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Field::Absent;
        }
        match parse_number(raw) {
            Some(v) => Field::Value(v),
            None => Field::Invalid(raw.to_string()),
        }
    }
}

impl From<f64> for Field {
    fn from(v: f64) -> Self {
        Field::Value(v)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match Option::<NumberOrText>::deserialize(d)? {
            None => Field::Absent,
            Some(NumberOrText::Number(v)) => Field::Value(v),
            Some(NumberOrText::Text(s)) => Field::from_text(&s),
        })
    }
}

/// Collects missing and malformed fields so they are reported before any
/// arithmetic happens.
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
    invalid: Option<(&'static str, String)>,
}

impl Required {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value, or records `label` as missing or malformed and
    /// returns NaN. The NaN never escapes: [`Required::finish`] fails first.
    pub fn take(&mut self, label: &'static str, field: &Field) -> f64 {
        match field {
            Field::Value(v) => *v,
            Field::Absent => {
                self.missing.push(label);
                f64::NAN
            }
            Field::Invalid(raw) => {
                self.reject(label, raw);
                f64::NAN
            }
        }
    }

    /// An optional field: absent is `None`, malformed text is still an error.
    pub fn optional(&mut self, label: &'static str, field: &Field) -> Option<f64> {
        match field {
            Field::Value(v) => Some(*v),
            Field::Absent => None,
            Field::Invalid(raw) => {
                self.reject(label, raw);
                None
            }
        }
    }

    fn reject(&mut self, label: &'static str, raw: &str) {
        if self.invalid.is_none() {
            self.invalid = Some((label, raw.to_string()));
        }
    }

    /// Malformed input wins over missing input.
    pub fn finish(self) -> Result<(), DomainError> {
        if let Some((field, raw)) = self.invalid {
            return Err(DomainError::InvalidInput { field, reason: format!("not a number: {raw:?}") });
        }
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::MissingFields(self.missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        assert_eq!(parse_number(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_number("3，036.39"), Some(3036.39));
        assert_eq!(parse_number("-0.006"), Some(-0.006));
    }

    #[test]
    fn test_parse_rejects_blank_and_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_required_reports_every_missing_label() {
        let mut req = Required::new();
        let face = req.take("face value", &Field::Value(0.01));
        req.take("contracts", &Field::Absent);
        req.take("leverage", &Field::Absent);
        assert_eq!(face, 0.01);
        assert_eq!(req.finish(), Err(DomainError::MissingFields(vec!["contracts", "leverage"])));
    }

    #[test]
    fn test_field_keeps_blank_and_garbage_apart() {
        assert_eq!(Field::from_text("  "), Field::Absent);
        assert_eq!(Field::from_text("1,000"), Field::Value(1000.0));
        assert_eq!(Field::from_text("1O00"), Field::Invalid("1O00".to_string()));
        let f: Field = serde_json::from_str("null").unwrap();
        assert_eq!(f, Field::Absent);
        let f: Field = serde_json::from_str("\"ten\"").unwrap();
        assert_eq!(f, Field::Invalid("ten".to_string()));
    }

    #[test]
    fn test_malformed_optional_field_is_reported() {
        let mut req = Required::new();
        assert_eq!(req.optional("fees", &Field::Absent), None);
        assert_eq!(req.optional("fees", &Field::Value(2.0)), Some(2.0));
        assert!(req.optional("reduce-only fee", &Field::Invalid("2x".into())).is_none());
        req.take("leverage", &Field::Absent);
        match req.finish() {
            Err(DomainError::InvalidInput { field, reason }) => {
                assert_eq!(field, "reduce-only fee");
                assert!(reason.contains("2x"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_positive_checks() {
        assert_eq!(ensure_positive("face value", 0.01), Ok(0.01));
        assert!(matches!(ensure_positive("face value", 0.0), Err(DomainError::InvalidInput { field: "face value", .. })));
        assert!(ensure_positive("price", -3000.0).is_err());
        assert!(ensure_positive("price", f64::NAN).is_err());
        assert!(ensure_all_positive(&[("face value", 0.01), ("price", -1.0)]).is_err());
    }

    #[test]
    fn test_non_finite_and_zero_checks() {
        assert!(ensure_finite("price", f64::INFINITY).is_err());
        assert_eq!(ensure_finite("price", 1.5), Ok(1.5));
        assert_eq!(non_zero("leverage", 0.0), Err(DomainError::ZeroDenominator { condition: "leverage" }));
        assert_eq!(non_zero("leverage", 20.0), Ok(20.0));
    }
}
