use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::code;
use super::members::{MemberError, MemberPatch};
use super::seed::seed_form;
use super::validate::{check_form, is_form_valid};
use super::view::{Status, View, select_view};
use super::{ExistingRsvp, FormState, Invitation, MemberEntry};
use crate::api::WeddingBackend;
use crate::api::rsvp::RsvpPayload;
use crate::error::{ApiError, ErrorDetail, ErrorKind};

/// Failed validations after which the visitor is pointed at the couple.
pub const REPEATED_FAILURE_THRESHOLD: u32 = 5;

/// Identifies one issued validation request. A result is applied only while
/// its ticket is still the most recent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    pub seq: u64,
    pub code: String,
}

/// Per-visitor RSVP state: the invitation validator, the form being edited and
/// the submission controller. Validation and submission each keep their own
/// status and error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsvpWorkflow {
    invitation_code: String,
    last_validated_code: Option<String>,
    validation_status: Status,
    submission_status: Status,
    validation_error: Option<ApiError>,
    submission_error: Option<ApiError>,
    validation_attempts: u32,
    validation_seq: u64,
    invitation: Option<Invitation>,
    form: Option<FormState>,
}

impl RsvpWorkflow {
    pub fn view(&self) -> View {
        select_view(
            self.validation_status,
            self.submission_status,
            !self.invitation_code.is_empty(),
            self.invitation.is_some(),
        )
    }

    pub fn invitation_code(&self) -> &str {
        &self.invitation_code
    }

    pub fn validation_status(&self) -> Status {
        self.validation_status
    }

    pub fn submission_status(&self) -> Status {
        self.submission_status
    }

    pub fn validation_error(&self) -> Option<&ApiError> {
        self.validation_error.as_ref()
    }

    pub fn submission_error(&self) -> Option<&ApiError> {
        self.submission_error.as_ref()
    }

    pub fn validation_attempts(&self) -> u32 {
        self.validation_attempts
    }

    pub fn invitation(&self) -> Option<&Invitation> {
        self.invitation.as_ref()
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        self.form.as_mut()
    }

    pub fn existing_rsvp(&self) -> Option<&ExistingRsvp> {
        self.invitation.as_ref()?.existing_rsvp.as_ref()
    }

    pub fn has_repeated_failures(&self) -> bool {
        self.validation_attempts >= REPEATED_FAILURE_THRESHOLD
    }

    /// True when `raw` names a code other than the one last sent for
    /// validation. Blank input never triggers validation.
    pub fn needs_validation(&self, raw: &str) -> bool {
        if raw.trim().is_empty() {
            return false;
        }
        let code = code::normalize(raw);
        self.last_validated_code.as_deref() != Some(code.as_str())
    }

    /// Starts validating `raw`. Guest state and any previous submission are
    /// dropped. A code that fails the local checks is recorded as a failed
    /// validation and returned as `Err` without a ticket, so no request is
    /// made for it.
    pub fn begin_validation(&mut self, raw: &str) -> Result<ValidationTicket, ApiError> {
        self.validation_seq += 1;
        let normalized = code::normalize(raw);
        self.invitation_code = normalized.clone();
        self.last_validated_code = Some(normalized);
        self.invitation = None;
        self.form = None;
        self.submission_status = Status::Idle;
        self.submission_error = None;

        match code::parse(raw) {
            Ok(code) => {
                debug!("Validating invitation code {} (#{})", code, self.validation_seq);
                self.validation_status = Status::Loading;
                self.validation_error = None;
                Ok(ValidationTicket {
                    seq: self.validation_seq,
                    code,
                })
            }
            Err(err) => {
                self.fail_validation(err.clone());
                Err(err)
            }
        }
    }

    /// Applies the outcome of a validation request. Returns `false` when the
    /// ticket has been superseded and the outcome was discarded.
    pub fn complete_validation(
        &mut self,
        ticket: &ValidationTicket,
        outcome: Result<Invitation, ApiError>,
    ) -> bool {
        if ticket.seq != self.validation_seq || self.validation_status != Status::Loading {
            debug!(
                "Discarding stale validation result for {} (#{}, current #{})",
                ticket.code, ticket.seq, self.validation_seq
            );
            return false;
        }

        match outcome {
            Ok(invitation) => {
                debug!(
                    "Invitation {} belongs to guest {} ({:?})",
                    ticket.code, invitation.guest.id, invitation.guest_type
                );
                self.form = Some(seed_form(&invitation));
                self.invitation = Some(invitation);
                self.validation_status = Status::Succeeded;
                self.validation_error = None;
                self.validation_attempts = 0;
            }
            Err(err) => self.fail_validation(err),
        }
        true
    }

    fn fail_validation(&mut self, err: ApiError) {
        debug!("Invitation validation failed: {}", err);
        self.validation_status = Status::Failed;
        self.validation_error = Some(err);
        self.validation_attempts += 1;
        self.invitation = None;
        self.form = None;
    }

    /// Validates `raw` against `backend` in one step.
    pub async fn validate(
        &mut self,
        backend: &dyn WeddingBackend,
        raw: &str,
    ) -> Result<(), ApiError> {
        let ticket = self.begin_validation(raw)?;
        let outcome = backend.validate_invitation(&ticket.code).await;
        let result = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
        self.complete_validation(&ticket, outcome);
        result
    }

    pub fn can_submit(&self) -> bool {
        self.submission_status != Status::Loading && self.form.as_ref().is_some_and(is_form_valid)
    }

    /// Runs the final checks and marks the submission as in flight. A
    /// submission already in flight is refused without touching state.
    pub fn begin_submission(&mut self, now: DateTime<Utc>) -> Result<RsvpPayload, ApiError> {
        if self.submission_status == Status::Loading {
            return Err(ApiError::in_flight());
        }

        let payload = match self.form.as_ref() {
            Some(form) => check_form(form).and_then(|_| RsvpPayload::from_form(form, now)),
            None => Err(ApiError::new(
                ErrorKind::ClientValidation,
                "Please enter your invitation code first.",
                vec![ErrorDetail::field("invitationCode", "No invitation loaded")],
            )),
        };

        match payload {
            Ok(payload) => {
                debug!("Submitting RSVP for guest {}", payload.guest_id);
                self.submission_status = Status::Loading;
                self.submission_error = None;
                Ok(payload)
            }
            Err(err) => {
                self.submission_status = Status::Failed;
                self.submission_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Applies the outcome of a submission. The form is kept as entered on
    /// failure. Returns `false` if no submission was in flight any more.
    pub fn complete_submission(&mut self, outcome: Result<ExistingRsvp, ApiError>) -> bool {
        if self.submission_status != Status::Loading {
            debug!("Discarding submission result, nothing in flight");
            return false;
        }

        match outcome {
            Ok(rsvp) => {
                if let Some(invitation) = self.invitation.as_mut() {
                    invitation.existing_rsvp = Some(rsvp);
                    invitation.has_existing_rsvp = true;
                }
                self.submission_status = Status::Succeeded;
                self.submission_error = None;
            }
            Err(err) => {
                debug!("RSVP submission failed: {}", err);
                self.submission_status = Status::Failed;
                self.submission_error = Some(err);
            }
        }
        true
    }

    pub async fn submit(
        &mut self,
        backend: &dyn WeddingBackend,
        now: DateTime<Utc>,
    ) -> Result<ExistingRsvp, ApiError> {
        let payload = self.begin_submission(now)?;
        let outcome = backend.submit_rsvp(&payload).await;
        let result = outcome.clone();
        self.complete_submission(outcome);
        result
    }

    /// Back to code entry. The sequence number keeps counting so a result
    /// still in flight is discarded, and the attempt counter survives.
    pub fn reset(&mut self) {
        *self = Self {
            validation_seq: self.validation_seq + 1,
            validation_attempts: self.validation_attempts,
            ..Self::default()
        };
    }

    pub fn set_attending(&mut self, attending: bool) {
        if let Some(form) = self.form.as_mut() {
            form.set_attending(attending);
        }
    }

    pub fn add_member(&mut self, patch: MemberPatch) -> Result<usize, MemberError> {
        match self.form.as_mut() {
            Some(form) => form.add_member(patch),
            None => Err(MemberError::AtCapacity { limit: 0 }),
        }
    }

    pub fn update_member(&mut self, index: usize, patch: MemberPatch) -> Result<(), MemberError> {
        match self.form.as_mut() {
            Some(form) => form.update_member(index, patch),
            None => Err(MemberError::OutOfRange { index }),
        }
    }

    pub fn remove_member(&mut self, index: usize) -> Result<MemberEntry, MemberError> {
        match self.form.as_mut() {
            Some(form) => form.remove_member(index),
            None => Err(MemberError::OutOfRange { index }),
        }
    }
}
