use thiserror::Error;

/// Errors that are safe to expose to callers of the calendar module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error")]
    Internal,
}

impl CalendarError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<crate::domain::error::DomainError> for CalendarError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            Validation { field, message } => Self::validation(field, message),
            UserNotFound { key } => Self::not_found("User", key),
            EventNotFound { id } => Self::not_found("Event", id.to_string()),
            ScheduleNotFound { id } => Self::not_found("Schedule", id.to_string()),
            NotificationNotFound { id } => Self::not_found("Notification", id.to_string()),
            EmailAlreadyExists { email } => {
                Self::conflict(format!("a user with email '{email}' already exists"))
            }
            Conflict { message } => Self::conflict(message),
            Database { .. } => Self::internal(),
        }
    }
}
