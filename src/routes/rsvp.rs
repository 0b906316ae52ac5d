use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use lazy_static::lazy_static;
use minijinja::context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_sessions::{Session, SessionStore};
use tracing::{debug, warn};

use crate::{
    error::{ApiError, AppError, ErrorKind},
    router::AppState,
    rsvp::{
        AgeGroup, FormState, GuestType, MemberEntry, code,
        members::{MemberPatch, member_title},
        view::{Status, View},
        workflow::RsvpWorkflow,
    },
};

pub const WORKFLOW_KEY: &str = "rsvp.workflow";

lazy_static! {
    static ref MEMBER_FIELD: Regex = Regex::new(r"^members\[(\d+)\]\.(\w+)$").unwrap();
}

#[derive(Debug, Deserialize)]
pub struct RsvpQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CodeForm {
    #[serde(default)]
    pub code: String,
}

/// Raw form fields in submission order. Member fields are named
/// `members[{index}].{field}`.
pub type Fields = Vec<(String, String)>;

#[derive(Serialize)]
struct MemberView<'a> {
    index: usize,
    title: String,
    member: &'a MemberEntry,
}

pub async fn rsvp(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RsvpQuery>,
) -> Result<Response, AppError> {
    let mut workflow = load(&session).await?;
    if let Some(raw) = query
        .code
        .as_deref()
        .filter(|raw| workflow.needs_validation(raw))
    {
        workflow = validate(&state, &session, workflow, raw).await?;
    }
    render(&state, &workflow, None)
}

pub async fn submit_code(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CodeForm>,
) -> Result<Response, AppError> {
    let mut workflow = load(&session).await?;
    workflow.reset();
    store(&session, &workflow).await?;

    match code::parse(&form.code) {
        Err(err) if err.kind == ErrorKind::EmptyCode => render(&state, &workflow, Some(&err)),
        _ => {
            let normalized = code::normalize(&form.code);
            Ok(Redirect::to(&format!("/rsvp?code={normalized}")).into_response())
        }
    }
}

pub async fn submit_rsvp(
    State(state): State<AppState>,
    session: Session,
    Form(fields): Form<Fields>,
) -> Result<Response, AppError> {
    let mut workflow = load(&session).await?;
    if let Some(form) = workflow.form_mut() {
        apply_fields(form, &fields);
    }

    let payload = match workflow.begin_submission(Utc::now()) {
        Ok(payload) => payload,
        Err(err) => {
            debug!("RSVP not sent: {}", err);
            if err.kind != ErrorKind::InFlight {
                store(&session, &workflow).await?;
            }
            return Ok(Redirect::to("/rsvp").into_response());
        }
    };
    store(&session, &workflow).await?;
    session.save().await?;

    let outcome = state.backend.submit_rsvp(&payload).await;

    let mut latest = latest(&state, &session).await?.unwrap_or(workflow);
    latest.complete_submission(outcome);
    store(&session, &latest).await?;
    Ok(Redirect::to("/rsvp").into_response())
}

pub async fn add_member(
    session: Session,
    Form(fields): Form<Fields>,
) -> Result<Redirect, AppError> {
    let mut workflow = load(&session).await?;
    if let Some(form) = workflow.form_mut() {
        apply_fields(form, &fields);
    }
    if let Err(e) = workflow.add_member(MemberPatch::default()) {
        debug!("Guest not added: {}", e);
    }
    store(&session, &workflow).await?;
    Ok(Redirect::to("/rsvp#guests"))
}

pub async fn remove_member(
    session: Session,
    Path(index): Path<usize>,
    Form(fields): Form<Fields>,
) -> Result<Redirect, AppError> {
    let mut workflow = load(&session).await?;
    if let Some(form) = workflow.form_mut() {
        apply_fields(form, &fields);
    }
    if let Err(e) = workflow.remove_member(index) {
        debug!("Guest not removed: {}", e);
    }
    store(&session, &workflow).await?;
    Ok(Redirect::to("/rsvp#guests"))
}

pub async fn reset(session: Session) -> Result<Redirect, AppError> {
    let mut workflow = load(&session).await?;
    workflow.reset();
    store(&session, &workflow).await?;
    Ok(Redirect::to("/rsvp"))
}

pub(crate) async fn load(session: &Session) -> Result<RsvpWorkflow, AppError> {
    Ok(session
        .get::<RsvpWorkflow>(WORKFLOW_KEY)
        .await?
        .unwrap_or_default())
}

async fn store(session: &Session, workflow: &RsvpWorkflow) -> Result<(), AppError> {
    session.insert(WORKFLOW_KEY, workflow).await?;
    Ok(())
}

/// The workflow as last written by any request in this session, bypassing the
/// copy this request loaded.
async fn latest(state: &AppState, session: &Session) -> Result<Option<RsvpWorkflow>, AppError> {
    let Some(id) = session.id() else {
        return Ok(None);
    };
    let Some(record) = state.sessions.load(&id).await? else {
        return Ok(None);
    };
    Ok(record.data.get(WORKFLOW_KEY).and_then(|value| {
        serde_json::from_value(value.clone())
            .map_err(|e| warn!("Stored RSVP state is unreadable: {}", e))
            .ok()
    }))
}

async fn validate(
    state: &AppState,
    session: &Session,
    mut workflow: RsvpWorkflow,
    raw: &str,
) -> Result<RsvpWorkflow, AppError> {
    let ticket = match workflow.begin_validation(raw) {
        Ok(ticket) => ticket,
        Err(err) => {
            debug!("Invitation code rejected before lookup: {}", err);
            store(session, &workflow).await?;
            return Ok(workflow);
        }
    };
    // Saved now so a reload while the lookup runs shows the loading page.
    store(session, &workflow).await?;
    session.save().await?;

    let outcome = state.backend.validate_invitation(&ticket.code).await;

    let mut latest = latest(state, session).await?.unwrap_or(workflow);
    latest.complete_validation(&ticket, outcome);
    store(session, &latest).await?;
    Ok(latest)
}

fn render(
    state: &AppState,
    workflow: &RsvpWorkflow,
    code_error: Option<&ApiError>,
) -> Result<Response, AppError> {
    let html = match workflow.view() {
        View::CodeEntry => state.render(
            "rsvp/code_entry.html",
            context! {
                page => "rsvp",
                error => code_error.map(ApiError::friendly_message),
            },
        )?,
        View::Loading => state.render(
            "rsvp/loading.html",
            context! {
                page => "rsvp",
                code => workflow.invitation_code(),
            },
        )?,
        View::ErrorInvalidCode => {
            let error = workflow.validation_error();
            state.render(
                "rsvp/error.html",
                context! {
                    page => "rsvp",
                    code => workflow.invitation_code(),
                    message => error.map(ApiError::friendly_message),
                    is_network => error.is_some_and(ApiError::is_network),
                    repeated_failures => workflow.has_repeated_failures(),
                },
            )?
        }
        View::MainForm => render_form(state, workflow)?,
        View::Success => {
            let form = workflow.form();
            state.render(
                "rsvp/success.html",
                context! {
                    page => "rsvp",
                    guest => workflow.invitation().map(|i| &i.guest),
                    guest_name => workflow.invitation().map(|i| i.guest.first_name.clone()),
                    form => form,
                    headcount => form.map(FormState::attending_headcount),
                    attending_members => form.map(|f| {
                        f.family_members
                            .iter()
                            .filter(|m| f.attending && m.is_attending())
                            .collect::<Vec<_>>()
                    }),
                },
            )?
        }
    };
    Ok(html.into_response())
}

fn render_form(state: &AppState, workflow: &RsvpWorkflow) -> Result<Html<String>, AppError> {
    let (Some(invitation), Some(form)) = (workflow.invitation(), workflow.form()) else {
        return state.render("rsvp/code_entry.html", context! { page => "rsvp" });
    };

    let members: Vec<MemberView> = form
        .family_members
        .iter()
        .enumerate()
        .map(|(index, member)| MemberView {
            index,
            title: member_title(form.guest_type, member),
            member,
        })
        .collect();
    let error = workflow.submission_error();

    state.render(
        "rsvp/form.html",
        context! {
            page => "rsvp",
            code => workflow.invitation_code(),
            guest => &invitation.guest,
            guest_name => invitation.guest.full_name(),
            group_name => invitation.family_group.as_ref().map(|g| g.group_name.clone()),
            is_family => form.guest_type == GuestType::FamilyPrimary,
            is_plus_one => form.guest_type == GuestType::SoloWithPlusOne,
            has_existing_rsvp => invitation.has_existing_rsvp,
            submitted_at => workflow
                .existing_rsvp()
                .and_then(|r| r.submitted_at)
                .map(|at| at.format("%B %-d, %Y").to_string()),
            form => form,
            members => members,
            age_groups => [AgeGroup::Adult, AgeGroup::Child, AgeGroup::Infant]
                .iter()
                .map(AgeGroup::as_str)
                .collect::<Vec<_>>(),
            can_add_member => form.can_add_member(),
            max_attendees => form.max_attendees,
            submitting => workflow.submission_status() == Status::Loading,
            error => error.map(ApiError::friendly_message),
            error_details => error.map(|e| &e.details),
        },
    )
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "true" | "on" | "1"
    )
}

/// Copies posted fields onto the form. Dietary notes are applied before the
/// attendance choice so that declining in the same post still clears them.
pub fn apply_fields(form: &mut FormState, fields: &[(String, String)]) {
    let mut attending = None;
    let mut dietary = None;
    let mut patches: BTreeMap<usize, MemberPatch> = BTreeMap::new();

    for (name, value) in fields {
        match name.as_str() {
            "attending" => attending = Some(is_truthy(value)),
            "email" => form.email = value.clone(),
            "dietaryRestrictions" => dietary = Some(value.clone()),
            "sendConfirmationEmail" => form.send_confirmation_email = is_truthy(value),
            other => {
                let Some(caps) = MEMBER_FIELD.captures(other) else {
                    continue;
                };
                let Ok(index) = caps[1].parse::<usize>() else {
                    continue;
                };
                let patch = patches.entry(index).or_default();
                match &caps[2] {
                    "firstName" => patch.first_name = Some(value.clone()),
                    "lastName" => patch.last_name = Some(value.clone()),
                    "ageGroup" => patch.age_group = Some(AgeGroup::parse_lenient(value)),
                    "attending" => patch.is_attending = Some(is_truthy(value)),
                    "dietaryRestrictions" => patch.dietary_restrictions = Some(value.clone()),
                    _ => {}
                }
            }
        }
    }

    if let Some(dietary) = dietary {
        form.dietary_restrictions = dietary;
    }
    if let Some(attending) = attending {
        form.set_attending(attending);
    }
    for (index, patch) in patches {
        if let Err(e) = form.update_member(index, patch) {
            debug!("Ignoring posted fields: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn family_form() -> FormState {
        FormState {
            guest_id: Some(1),
            guest_type: GuestType::FamilyPrimary,
            max_attendees: Some(3),
            member_limit: 2,
            family_members: vec![MemberEntry {
                id: Some(10),
                first_name: "Tim".into(),
                last_name: "Doe".into(),
                is_attending: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn applies_primary_fields() {
        let mut form = family_form();
        apply_fields(
            &mut form,
            &fields(&[
                ("attending", "yes"),
                ("email", "jane@example.com"),
                ("dietaryRestrictions", "vegan"),
                ("sendConfirmationEmail", "no"),
                ("sendConfirmationEmail", "yes"),
            ]),
        );
        assert!(form.attending);
        assert_eq!(form.email, "jane@example.com");
        assert_eq!(form.dietary_restrictions, "vegan");
        assert!(form.send_confirmation_email);
    }

    #[test]
    fn declining_in_the_same_post_drops_dietary() {
        let mut form = family_form();
        apply_fields(
            &mut form,
            &fields(&[
                ("dietaryRestrictions", "vegan"),
                ("attending", "no"),
                ("members[0].dietaryRestrictions", "nuts"),
                ("members[0].attending", "no"),
            ]),
        );
        assert!(!form.attending);
        assert!(form.dietary_restrictions.is_empty());
        assert_eq!(form.family_members[0].is_attending, Some(false));
        assert!(form.family_members[0].dietary_restrictions.is_empty());
    }

    #[test]
    fn member_fields_are_matched_by_index() {
        let mut form = family_form();
        apply_fields(
            &mut form,
            &fields(&[
                ("members[0].firstName", "Timmy"),
                ("members[0].ageGroup", "child"),
                ("members[3].firstName", "Ghost"),
                ("members[x].firstName", "Nope"),
                ("unrelated", "field"),
            ]),
        );
        assert_eq!(form.family_members.len(), 1);
        assert_eq!(form.family_members[0].first_name, "Timmy");
        assert_eq!(form.family_members[0].last_name, "Doe");
        assert_eq!(form.family_members[0].age_group, AgeGroup::Child);
    }

    #[test]
    fn truthy_values() {
        for yes in ["yes", "true", "on", "1", " YES "] {
            assert!(is_truthy(yes), "{yes}");
        }
        for no in ["no", "false", "", "off"] {
            assert!(!is_truthy(no), "{no}");
        }
    }
}
