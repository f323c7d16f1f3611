use crate::error::{ServiceError, ServiceResult};

pub(crate) const FOLDER_NAME_MAX: usize = 100;
pub(crate) const NOTE_TITLE_MAX: usize = 200;
pub(crate) const HEADING_MAX: usize = 300;
pub(crate) const QUESTION_TITLE_MAX: usize = 300;

/// Trimmed, non-blank and at most `max` characters.
pub(crate) fn required(label: &str, value: Option<&str>, max: usize) -> ServiceResult<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{label} is required")));
    }
    bounded(label, value, max)
}

/// Trimmed and at most `max` characters.
pub(crate) fn bounded(label: &str, value: &str, max: usize) -> ServiceResult<String> {
    let value = value.trim();
    if value.chars().count() > max {
        return Err(ServiceError::validation(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// Tags are a set: trimmed, lower-cased, blanks dropped, first occurrence kept.
pub(crate) fn tags(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
