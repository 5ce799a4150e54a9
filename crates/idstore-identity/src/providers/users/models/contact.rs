//! Contact details that carry a confirmation timestamp.

use chrono::{DateTime, Utc};
use idstore_commons::normalize_key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserEmail {
    pub value: String,
    pub normalized_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_on: Option<DateTime<Utc>>,
}

impl UserEmail {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            normalized_value: normalize_key(&value),
            value,
            confirmed_on: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_on.is_some()
    }

    /// Records the first confirmation; later calls keep the original time.
    pub fn set_confirmed(&mut self, at: DateTime<Utc>) {
        if self.confirmed_on.is_none() {
            self.confirmed_on = Some(at);
        }
    }

    pub fn set_unconfirmed(&mut self) {
        self.confirmed_on = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPhoneNumber {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_on: Option<DateTime<Utc>>,
}

impl UserPhoneNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confirmed_on: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_on.is_some()
    }

    pub fn set_confirmed(&mut self, at: DateTime<Utc>) {
        if self.confirmed_on.is_none() {
            self.confirmed_on = Some(at);
        }
    }

    pub fn set_unconfirmed(&mut self) {
        self.confirmed_on = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_confirmation_keeps_first_time() {
        let first = Utc::now();
        let mut email = UserEmail::new("a@b.io");
        assert_eq!(email.normalized_value, "A@B.IO");

        email.set_confirmed(first);
        email.set_confirmed(first + Duration::hours(1));
        assert_eq!(email.confirmed_on, Some(first));

        email.set_unconfirmed();
        assert!(!email.is_confirmed());
    }
}
