use crate::error::{StatementError, StatementResult};
use regex::Regex;
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> StatementResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(StatementError::validation("options", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("range") => {
                    format!("Value out of range for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("length") => {
                    format!("Length validation failed for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("invalid_regex") => {
                    format!("Field '{}' is not a valid regular expression", field)
                }
                std::borrow::Cow::Borrowed("header_below_footer") => {
                    "Header thresholds must not exceed the footer threshold".to_string()
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push(message);
        }
    }

    // nested structs report under their own key
    for (field, kind) in errors.errors() {
        if let validator::ValidationErrorsKind::Struct(nested) = kind {
            messages.push(format!("{}: {}", field, format_validation_errors(nested)));
        }
    }

    messages.join(", ")
}

/// Compile an identifier format so that it only accepts whole words.
pub fn compile_identifier_pattern(pattern: &str) -> StatementResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        StatementError::validation("identifier_pattern", format!("Invalid pattern '{}': {}", pattern, e))
    })
}

pub fn validate_file_type(file_name: &str, allowed_types: &[&str]) -> StatementResult<()> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if !allowed_types.contains(&extension.to_lowercase().as_str()) {
        return Err(StatementError::validation(
            "file_type",
            format!("File type '{}' not allowed. Allowed types: {}", extension, allowed_types.join(", ")),
        ));
    }

    Ok(())
}

pub fn validate_file_size(file_size: u64, max_size: u64) -> StatementResult<()> {
    if file_size > max_size {
        return Err(StatementError::validation(
            "file_size",
            format!("File size {} bytes exceeds maximum allowed size {} bytes", file_size, max_size),
        ));
    }

    Ok(())
}

/// Every required column must be present (case-insensitive, trimmed).
pub fn validate_required_columns(headers: &[String], required: &[&str]) -> StatementResult<()> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|column| {
            !headers
                .iter()
                .any(|header| header.trim().eq_ignore_ascii_case(column))
        })
        .copied()
        .collect();

    if !missing.is_empty() {
        return Err(StatementError::configuration(format!(
            "Reference sheet must contain the columns {}; missing: {}",
            required.join(", "),
            missing.join(", ")
        )));
    }

    Ok(())
}
