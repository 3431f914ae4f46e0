//! Error types for configuration loading and validation

use thiserror::Error;
use validator::ValidationErrors;

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation error.
    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// Figment parsing error, e.g. `LEAK_RATE=fast`.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] Box<figment::Error>),
}

/// One line per field, sorted so the message is stable across runs.
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .map(|(field, errors)| {
            let reasons = errors
                .iter()
                .map(|e| e.message.as_deref().unwrap_or(e.code.as_ref()).to_owned())
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {field}: {reasons}\n")
        })
        .collect()
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Parsing(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use validator::ValidationError;

    #[test]
    fn validation_message_lists_each_field() {
        let mut errors = ValidationErrors::new();
        errors.add("max_memory_mb", ValidationError::new("range"));
        errors.add(
            "leak_interval_secs",
            ValidationError::new("range").with_message("out of bounds".into()),
        );

        let message = ConfigError::from(errors).to_string();
        assert_eq!(
            message,
            "Invalid configuration:\n  leak_interval_secs: out of bounds\n  max_memory_mb: range\n"
        );
    }
}
