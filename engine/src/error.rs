use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("denominator is zero: check {condition}")]
    ZeroDenominator { condition: &'static str },
}

impl DomainError {
    /// Every variant is a flavour of invalid input; callers that only care
    /// about "bad input vs. ok" can use this.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidInput { .. } | DomainError::MissingFields(_) | DomainError::ZeroDenominator { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_fields() {
        let e = DomainError::MissingFields(vec!["face value", "leverage"]);
        assert_eq!(e.to_string(), "missing required fields: face value, leverage");
        let e = DomainError::ZeroDenominator { condition: "leverage" };
        assert_eq!(e.to_string(), "denominator is zero: check leverage");
        assert!(e.is_invalid_input());
    }
}
