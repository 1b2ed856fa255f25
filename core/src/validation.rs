use std::collections::BTreeMap;

use thiserror::Error;

/// Form fields that can carry an inline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    IssueCategory,
    IssueTitle,
    Priority,
    Description,
    Attachment,
    Content,
}

impl Field {
    /// Wire/form name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::IssueCategory => "issueCategory",
            Field::IssueTitle => "issueTitle",
            Field::Priority => "priority",
            Field::Description => "description",
            Field::Attachment => "attachment",
            Field::Content => "content",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::IssueCategory => "Issue category",
            Field::IssueTitle => "Issue title",
            Field::Priority => "Priority",
            Field::Description => "Description",
            Field::Attachment => "Attachment",
            Field::Content => "Message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} is required", .field.label())]
    Required { field: Field },

    #[error("{} must be one of: {expected}", .field.label())]
    Invalid { field: Field, expected: &'static str },

    #[error("File is too large ({} MB). Maximum size is {} MB", megabytes(.size), megabytes(.limit))]
    FileTooLarge { size: usize, limit: usize },
}

fn megabytes(bytes: &usize) -> String {
    format!("{:.1}", *bytes as f64 / (1024.0 * 1024.0))
}

/// Field-keyed validation failures, rendered next to the offending input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<Field, ValidationError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, error: ValidationError) {
        self.errors.insert(field, error);
    }

    pub fn remove(&mut self, field: Field) {
        self.errors.remove(&field);
    }

    pub fn get(&self, field: Field) -> Option<&ValidationError> {
        self.errors.get(&field)
    }

    pub fn message(&self, field: Field) -> Option<String> {
        self.get(field).map(ToString::to_string)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &ValidationError)> {
        self.errors.iter().map(|(field, error)| (*field, error))
    }
}

pub fn require(errors: &mut FieldErrors, field: Field, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, ValidationError::Required { field });
    }
}

pub fn check_attachment_size(size: usize, limit: usize) -> Result<(), ValidationError> {
    if size > limit {
        return Err(ValidationError::FileTooLarge { size, limit });
    }
    Ok(())
}
