use lazy_static::lazy_static;
use regex::Regex;

use super::{FormState, GuestType};
use crate::error::{ApiError, ErrorDetail, ErrorKind};

pub const MAX_DIETARY_LEN: usize = 500;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

/// Gate for the submit action.
pub fn is_form_valid(form: &FormState) -> bool {
    form_errors(form).is_empty()
}

/// Same rules as [`is_form_valid`], reported per field.
pub fn form_errors(form: &FormState) -> Vec<ErrorDetail> {
    let mut errors = Vec::new();

    if form.guest_id.is_none() {
        errors.push(ErrorDetail::field(
            "guestId",
            "Guest information is missing. Please refresh and try again.",
        ));
    }

    if form.email.trim().is_empty() {
        errors.push(ErrorDetail::field("email", "Email is required"));
    } else if !is_valid_email(&form.email) {
        errors.push(ErrorDetail::field(
            "email",
            "Please provide a valid email address",
        ));
    }

    if form.dietary_restrictions.chars().count() > MAX_DIETARY_LEN {
        errors.push(ErrorDetail::field(
            "dietaryRestrictions",
            "Dietary restrictions must be no more than 500 characters long",
        ));
    }

    // Companions only matter when the primary guest is coming.
    if form.attending {
        member_errors(form, &mut errors);
    }

    errors
}

fn member_errors(form: &FormState, errors: &mut Vec<ErrorDetail>) {
    let checked = match form.guest_type {
        GuestType::Solo => return,
        GuestType::SoloWithPlusOne => &form.family_members[..form.family_members.len().min(1)],
        GuestType::FamilyPrimary => &form.family_members[..],
    };

    for (index, member) in checked.iter().enumerate() {
        if !member.is_attending() {
            continue;
        }
        if !member.has_full_name() {
            let reason = if form.guest_type == GuestType::SoloWithPlusOne {
                "Please provide your plus one's first and last name"
            } else {
                "Please provide a first and last name for each attending guest"
            };
            errors.push(ErrorDetail::field(format!("familyMembers[{index}]"), reason));
        }
        if member.dietary_restrictions.chars().count() > MAX_DIETARY_LEN {
            errors.push(ErrorDetail::field(
                format!("familyMembers[{index}].dietaryRestrictions"),
                "Dietary restrictions must be no more than 500 characters long",
            ));
        }
    }

    if form.guest_type == GuestType::FamilyPrimary {
        if let Some(max) = form.max_attendees {
            if form.attending_headcount() > max as usize {
                errors.push(ErrorDetail::field(
                    "familyMembers",
                    format!("Your party exceeds the maximum of {max} guests"),
                ));
            }
        }
    }
}

/// Final guard run by the submission controller.
pub fn check_form(form: &FormState) -> Result<(), ApiError> {
    let errors = form_errors(form);
    if errors.is_empty() {
        return Ok(());
    }
    let summary = errors
        .iter()
        .map(|e| e.reason.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Err(ApiError::new(
        ErrorKind::ClientValidation,
        format!("Please correct the following errors: {summary}"),
        errors,
    ))
}
