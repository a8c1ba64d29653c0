//! Small pure validation helpers used by the backend services

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Validate username format (3-30 chars, lowercase alphanumeric and underscore)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 30 {
        return Err("Username must be at most 30 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err("Username must be lowercase alphanumeric or underscore");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Balance entry remarks are mandatory and must not be blank
pub fn validate_remarks(remarks: &str) -> Result<(), &'static str> {
    if remarks.trim().is_empty() {
        return Err("Remarks are required");
    }
    Ok(())
}

/// Commission percentages are bounded to 0..=100
pub fn validate_percentage(percentage: Decimal) -> Result<(), &'static str> {
    if percentage < Decimal::ZERO || percentage > Decimal::from(100) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// A due date must fall strictly after the invoice date
pub fn validate_due_date(invoice_date: NaiveDate, due_date: NaiveDate) -> Result<(), &'static str> {
    if due_date <= invoice_date {
        return Err("Due date must be after the invoice date");
    }
    Ok(())
}

/// Monetary and physical amounts on invoice lines may not be negative
pub fn validate_non_negative(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}
