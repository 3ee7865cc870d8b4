use crate::error::ValidationErrors;

/// Characters that satisfy the "special character" password rule.
pub const SPECIAL_CHARS: &[char] = &['@', '$', '!', '%', '*', '?', '&'];

pub const USERNAME_MIN_LEN: usize = 4;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 15;

pub const USERNAME_REQUIRED: &str = "Username is required.";
pub const USERNAME_TOO_SHORT: &str = "Username must be at least 4 characters long.";
pub const USERNAME_NEEDS_DIGIT: &str = "Username must contain at least one number.";
pub const PASSWORD_REQUIRED: &str = "Password is required.";
pub const PASSWORD_LENGTH: &str = "Password must be between 8 and 15 characters long.";
pub const PASSWORD_COMPLEXITY: &str = "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character (@$!%*?&).";
pub const PASSWORD_CHARSET: &str =
    "Password may only contain letters, numbers, and the special characters @$!%*?&.";

/// validate_registration
///
/// Checks the shape of a new account's credentials. Every rule is evaluated so the
/// caller gets all failing fields in one pass. Pure: nothing is looked up or stored.
pub fn validate_registration(
    username: Option<&str>,
    password: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_username(username, &mut errors);
    check_password(password, &mut errors);
    errors.into_result()
}

fn check_username(username: Option<&str>, errors: &mut ValidationErrors) {
    let Some(username) = username.filter(|u| !u.is_empty()) else {
        errors.add("username", USERNAME_REQUIRED);
        return;
    };

    if username.chars().count() < USERNAME_MIN_LEN {
        errors.add("username", USERNAME_TOO_SHORT);
    }
    if !username.chars().any(|c| c.is_ascii_digit()) {
        errors.add("username", USERNAME_NEEDS_DIGIT);
    }
}

fn check_password(password: Option<&str>, errors: &mut ValidationErrors) {
    let Some(password) = password.filter(|p| !p.is_empty()) else {
        errors.add("password", PASSWORD_REQUIRED);
        return;
    };

    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        errors.add("password", PASSWORD_LENGTH);
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARS.contains(&c));
    if !(has_upper && has_lower && has_digit && has_special) {
        errors.add("password", PASSWORD_COMPLEXITY);
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || SPECIAL_CHARS.contains(&c);
    if !password.chars().all(allowed) {
        errors.add("password", PASSWORD_CHARSET);
    }
}
