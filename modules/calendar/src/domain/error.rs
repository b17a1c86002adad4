use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("User not found: {key}")]
    UserNotFound { key: String },

    #[error("Event not found: {id}")]
    EventNotFound { id: Uuid },

    #[error("Schedule not found: {id}")]
    ScheduleNotFound { id: Uuid },

    #[error("Notification not found: {id}")]
    NotificationNotFound { id: Uuid },

    #[error("User with email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// `key` is whatever the caller looked the user up by: an id or an email.
    pub fn user_not_found(key: impl ToString) -> Self {
        Self::UserNotFound {
            key: key.to_string(),
        }
    }

    pub fn event_not_found(id: Uuid) -> Self {
        Self::EventNotFound { id }
    }

    pub fn schedule_not_found(id: Uuid) -> Self {
        Self::ScheduleNotFound { id }
    }

    pub fn notification_not_found(id: Uuid) -> Self {
        Self::NotificationNotFound { id }
    }

    pub fn email_already_exists(email: impl Into<String>) -> Self {
        Self::EmailAlreadyExists {
            email: email.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Field name for validation errors, `None` for every other kind.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Storage failures reach the domain as `anyhow::Error`; keep the full chain in the message.
impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        Self::database(format!("{e:#}"))
    }
}
