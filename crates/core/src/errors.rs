use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{field} must be in range 0..=23, got {value}")]
    InvalidHour { field: &'static str, value: u32 },
    #[error("office hours start and end are both {hour}; the out-of-office window would be empty")]
    EmptyOfficeHoursWindow { hour: u32 },
    #[error("unsupported {kind} `{value}` (expected {expected})")]
    UnsupportedVariant { kind: &'static str, value: String, expected: &'static str },
}

#[cfg(test)]
mod tests {
    use crate::errors::DomainError;

    #[test]
    fn hour_error_names_the_field() {
        let error = DomainError::InvalidHour { field: "end_hour", value: 25 };

        assert_eq!(error.to_string(), "end_hour must be in range 0..=23, got 25");
    }

    #[test]
    fn unsupported_variant_lists_expected_values() {
        let error = DomainError::UnsupportedVariant {
            kind: "respond policy",
            value: "sometimes".to_owned(),
            expected: "always_on_off_hours|dm_and_mention_always|dm_only",
        };

        assert!(error.to_string().contains("`sometimes`"));
        assert!(error.to_string().contains("dm_only"));
    }
}
