//! Local checks run before a credential ever leaves the device.

use std::sync::LazyLock;

use regex::Regex;

use crate::AuthError;

/// Shortest password the sign-up form accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Moroccan mobile/landline numbers in international form.
static MOROCCAN_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+212[5-7][0-9]{8}$").expect("phone pattern is valid"));

/// Everything the full sign-up screen collects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub postal_code: String,
}

impl SignUpForm {
    /// Checks the form field by field and reports the first problem.
    pub fn validate(&self) -> Result<(), AuthError> {
        let fail = |msg: &str| Err(AuthError::InvalidInput(msg.to_string()));

        if blank(&self.first_name) {
            return fail("First name is required");
        }
        if blank(&self.last_name) {
            return fail("Last name is required");
        }
        if blank(&self.email) {
            return fail("Email is required");
        }
        if blank(&self.password) {
            return fail("Password is required");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return fail("Password must be at least 6 characters");
        }
        if blank(&self.phone) {
            return fail("Phone number is required");
        }
        if !is_valid_phone(&self.phone) {
            return fail("Please enter a valid Moroccan phone number starting with +212");
        }
        if blank(&self.postal_code) {
            return fail("Postal code is required");
        }
        Ok(())
    }
}

/// Returns `true` for `+212` followed by 5, 6 or 7 and eight more digits.
pub fn is_valid_phone(phone: &str) -> bool {
    MOROCCAN_PHONE.is_match(phone)
}

/// The login screen's only check: both fields filled in.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if blank(email) || blank(password) {
        return Err(AuthError::InvalidInput("Please fill in all fields".into()));
    }
    Ok(())
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}
