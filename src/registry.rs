//! Honeymoon-fund donation pledges: form validation and sanitizing before the
//! pledge is sent to the backend.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::registry::DonationPayload;
use crate::error::{ApiError, ErrorDetail, ErrorKind};
use crate::rsvp::validate::is_valid_email;

pub const PAYMENT_METHODS: [&str; 3] = ["VENMO", "ZELLE", "OTHER"];
pub const MIN_DONATION_CENTS: u64 = 100;

lazy_static! {
    static ref AMOUNT: Regex = Regex::new(r"^\$?(\d+)(?:\.(\d+))?$").unwrap();
    static ref PHONE_PUNCTUATION: Regex = Regex::new(r"[\s\-().]").unwrap();
    static ref US_PHONE: Regex = Regex::new(r"^(\+1)?[0-9]{10}$").unwrap();
}

/// Donation form as posted by the browser; every field arrives as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationForm {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub amount: String,
    pub payment_method: String,
    pub payment_reference: String,
    pub message: String,
    pub guest_id: Option<i64>,
}

impl DonationForm {
    pub fn errors(&self) -> Vec<ErrorDetail> {
        let mut errors = Vec::new();

        if let Err(reason) = check_text(&self.donor_name, "Donor name", 2, 100) {
            errors.push(ErrorDetail::field("donorName", reason));
        }

        if self.donor_email.trim().is_empty() {
            errors.push(ErrorDetail::field("donorEmail", "Email is required"));
        } else if !is_valid_email(&self.donor_email) {
            errors.push(ErrorDetail::field(
                "donorEmail",
                "Please provide a valid email address",
            ));
        }

        if !self.donor_phone.trim().is_empty() && !is_valid_phone(&self.donor_phone) {
            errors.push(ErrorDetail::field(
                "donorPhone",
                "Please provide a valid phone number (e.g., 555-123-4567)",
            ));
        }

        if let Err(reason) = parse_amount_cents(&self.amount) {
            errors.push(ErrorDetail::field("amount", reason));
        }

        let method = self.payment_method.trim().to_uppercase();
        if method.is_empty() {
            errors.push(ErrorDetail::field(
                "paymentMethod",
                "Please select a payment method",
            ));
        } else if !PAYMENT_METHODS.contains(&method.as_str()) {
            errors.push(ErrorDetail::field(
                "paymentMethod",
                format!("Payment method must be one of: {}", PAYMENT_METHODS.join(", ")),
            ));
        }

        if !self.payment_reference.trim().is_empty() {
            if let Err(reason) = check_text(
                &self.payment_reference,
                "Payment reference/transaction ID",
                3,
                100,
            ) {
                errors.push(ErrorDetail::field("paymentReference", reason));
            }
        }

        if self.message.trim().chars().count() > 500 {
            errors.push(ErrorDetail::field(
                "message",
                "Message must be no more than 500 characters long",
            ));
        }

        errors
    }

    /// Validates and produces the sanitized pledge.
    pub fn to_payload(&self) -> Result<DonationPayload, ApiError> {
        let errors = self.errors();
        if !errors.is_empty() {
            let summary = errors
                .iter()
                .map(|e| e.reason.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::new(
                ErrorKind::ClientValidation,
                format!("Please correct the following errors: {summary}"),
                errors,
            ));
        }

        let cents = parse_amount_cents(&self.amount).unwrap_or_default();
        Ok(DonationPayload {
            donor_name: self.donor_name.trim().to_string(),
            donor_email: self.donor_email.trim().to_lowercase(),
            donor_phone: self.donor_phone.trim().to_string(),
            amount: cents as f64 / 100.0,
            payment_method: self.payment_method.trim().to_uppercase(),
            payment_reference: self.payment_reference.trim().to_string(),
            message: self.message.trim().to_string(),
            guest_id: self.guest_id,
        })
    }
}

fn check_text(value: &str, name: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len == 0 {
        Err(format!("{name} is required"))
    } else if len < min {
        Err(format!(
            "{name} must be at least {min} character{} long",
            if min == 1 { "" } else { "s" }
        ))
    } else if len > max {
        Err(format!("{name} must be no more than {max} characters long"))
    } else {
        Ok(())
    }
}

pub fn is_valid_phone(raw: &str) -> bool {
    let cleaned = PHONE_PUNCTUATION.replace_all(raw.trim(), "");
    US_PHONE.is_match(&cleaned)
}

/// Parses a dollar amount into cents.
pub fn parse_amount_cents(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Donation amount is required".into());
    }
    let caps = AMOUNT
        .captures(raw)
        .ok_or_else(|| "Please enter a valid donation amount".to_string())?;

    let dollars: u64 = caps[1]
        .parse()
        .map_err(|_| "Please enter a valid donation amount".to_string())?;
    let fraction = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    if fraction.len() > 2 {
        return Err("Donation amount cannot have more than 2 decimal places".into());
    }
    let cents = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().unwrap_or(0) * 10,
        _ => fraction.parse::<u64>().unwrap_or(0),
    };

    let total = dollars
        .checked_mul(100)
        .and_then(|d| d.checked_add(cents))
        .ok_or_else(|| "Please enter a valid donation amount".to_string())?;
    if total < MIN_DONATION_CENTS {
        return Err("Donation amount must be at least $1.00".into());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> DonationForm {
        DonationForm {
            donor_name: "Aunt May".into(),
            donor_email: "May@Example.com".into(),
            amount: "50".into(),
            payment_method: "venmo".into(),
            ..Default::default()
        }
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount_cents("50"), Ok(5000));
        assert_eq!(parse_amount_cents("$12.5"), Ok(1250));
        assert_eq!(parse_amount_cents(" 1.00 "), Ok(100));
        assert!(parse_amount_cents("0.99").is_err());
        assert!(parse_amount_cents("").is_err());
        assert!(parse_amount_cents("ten").is_err());
        assert_eq!(
            parse_amount_cents("5.555"),
            Err("Donation amount cannot have more than 2 decimal places".into())
        );
    }

    #[test]
    fn phones() {
        assert!(is_valid_phone("555-123-4567"));
        assert!(is_valid_phone("(555) 123.4567"));
        assert!(is_valid_phone("+15551234567"));
        assert!(!is_valid_phone("12345"));
    }

    #[test]
    fn valid_form_produces_sanitized_payload() {
        let payload = valid().to_payload().unwrap();
        assert_eq!(payload.amount, 50.0);
        assert_eq!(payload.payment_method, "VENMO");
        assert_eq!(payload.donor_email, "may@example.com");
    }

    #[test]
    fn optional_fields_are_checked_only_when_present() {
        let mut form = valid();
        form.payment_reference = "ab".into();
        form.donor_phone = "not a phone".into();
        let fields: Vec<_> = form
            .errors()
            .into_iter()
            .filter_map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["donorPhone", "paymentReference"]);
    }

    #[test]
    fn invalid_form_lists_every_problem() {
        let form = DonationForm {
            donor_name: "A".into(),
            payment_method: "PAYPAL".into(),
            ..Default::default()
        };
        let err = form.to_payload().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ClientValidation);
        let fields: Vec<_> = err.details.iter().filter_map(|d| d.field.as_deref()).collect();
        assert_eq!(fields, vec!["donorName", "donorEmail", "amount", "paymentMethod"]);
    }
}
