//! Request bodies for the identity service and the form checks that guard
//! them. Validation happens before any request is sent.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::UserIdentity;

/// Minimum password length accepted at sign-up
const MIN_PASSWORD_CHARS: usize = 8;

/// Country code the profile form starts with
const DEFAULT_COUNTRY: &str = "1";

/// Field name → message, for every field that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for FormErrors {}

/// `local@domain.tld`: an `@` that is not first, and a `.` after the
/// character following it that is not last.
pub fn is_valid_email(email: &str) -> bool {
    let (Some(at), Some(dot)) = (email.find('@'), email.rfind('.')) else {
        return false;
    };
    at > 0 && dot > at + 1 && dot < email.len() - 1
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupRequest, FormErrors> {
        let mut errors = FormErrors::default();

        if self.email.is_empty() {
            errors.add("email", "Please enter your email.");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Email address is not valid.");
        }

        if self.password.is_empty() {
            errors.add("password", "Please enter a password.");
        } else if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("Password must be at least {} characters.", MIN_PASSWORD_CHARS),
            );
        }

        if self.confirm_password.is_empty() {
            errors.add("confirmPassword", "Please confirm your password.");
        } else if self.password != self.confirm_password {
            errors.add("confirmPassword", "Passwords do not match.");
        }

        if self.username.is_empty() {
            errors.add("username", "Please enter your name.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(SignupRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            username: self.username.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProfileForm {
    pub name: String,
    pub last_name: String,
    pub first_name: String,
    pub phone_number: String,
    pub country: String,
    pub address1: String,
    pub address2: String,
    /// `YYYY-MM-DD`, or empty
    pub birth: String,
    /// URLs of images uploaded separately
    pub profile_image: Option<String>,
    pub bg_image: Option<String>,
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            last_name: String::new(),
            first_name: String::new(),
            phone_number: String::new(),
            country: DEFAULT_COUNTRY.to_string(),
            address1: String::new(),
            address2: String::new(),
            birth: String::new(),
            profile_image: None,
            bg_image: None,
        }
    }
}

/// Body of `PUT /profile`. Empty optional fields are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub profile_image: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub phone_number: Option<String>,
    pub country: i64,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub birth: Option<NaiveDateTime>,
    pub bg_image: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl ProfileForm {
    /// Form prefilled from the signed-in user.
    pub fn for_user(user: &UserIdentity) -> Self {
        Self {
            name: user.name().unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::default();

        if self.name.trim().is_empty() {
            errors.add("name", "Please enter a nickname.");
        }

        if !self.phone_number.is_empty()
            && !self
                .phone_number
                .chars()
                .all(|c| c.is_ascii_digit() || c == '-')
        {
            errors.add("phoneNumber", "Phone number may only contain digits and hyphens (-).");
        }

        let country = match self.country.trim().parse::<i64>() {
            Ok(code) => code,
            Err(_) => {
                errors.add("country", "Country code must be a number.");
                0
            }
        };

        let birth = if self.birth.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(&self.birth, "%Y-%m-%d") {
                Ok(date) => date.and_hms_opt(0, 0, 0),
                Err(_) => {
                    errors.add("birth", "Birth date must be YYYY-MM-DD.");
                    None
                }
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ProfileUpdate {
            name: self.name.clone(),
            profile_image: self.profile_image.clone(),
            last_name: non_empty(&self.last_name),
            first_name: non_empty(&self.first_name),
            phone_number: non_empty(&self.phone_number),
            country,
            address1: non_empty(&self.address1),
            address2: non_empty(&self.address2),
            birth,
            bg_image: self.bg_image.clone(),
        })
    }
}
