//! Contact form messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clothify_core::{ContactMessageId, Email};

/// A stored contact message.
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: Email,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Contact form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl NewContactMessage {
    /// Trim all fields and validate them.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing or invalid field.
    pub fn validate(self) -> Result<(String, Email, String), String> {
        let name = self.name.trim().to_string();
        let message = self.message.trim().to_string();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("Email is required".to_string());
        }
        let email = Email::parse(&self.email).map_err(|_| "Invalid email address".to_string())?;
        if message.is_empty() {
            return Err("Message is required".to_string());
        }
        Ok((name, email, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, email: &str, message: &str) -> NewContactMessage {
        NewContactMessage {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let result = submission(" Asha ", "Asha@Mail.com", " Hi ").validate();
        assert_eq!(
            result.map(|(n, e, m)| (n, e.into_inner(), m)),
            Ok(("Asha".to_string(), "asha@mail.com".to_string(), "Hi".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(submission("", "a@b.co", "hi").validate().is_err());
        assert!(submission("A", "", "hi").validate().is_err());
        assert!(submission("A", "not-an-email", "hi").validate().is_err());
        assert!(submission("A", "a@b.co", "  ").validate().is_err());
    }
}
