use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::{ApiError, ErrorDetail, ErrorKind};
use crate::rsvp::{AgeGroup, ExistingRsvp, FamilyMember, FormState, GuestType, MemberEntry};

const RSVPS_PATH: &str = "/v1/api/rsvps";

/// Body of `POST /v1/api/rsvps`: trimmed strings, the guest id as a number
/// and the submission time attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpPayload {
    pub guest_id: i64,
    pub attending: bool,
    pub email: String,
    pub dietary_restrictions: String,
    pub send_confirmation_email: bool,
    pub submitted_at: DateTime<Utc>,
    pub bringing_plus_one: bool,
    pub plus_one_name: String,
    pub family_members: Vec<MemberPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub age_group: AgeGroup,
    pub is_attending: bool,
    pub dietary_restrictions: String,
}

impl RsvpPayload {
    pub fn from_form(form: &FormState, submitted_at: DateTime<Utc>) -> Result<Self, ApiError> {
        let guest_id = form.guest_id.ok_or_else(|| {
            ApiError::new(
                ErrorKind::ClientValidation,
                "Guest information is missing. Please refresh and try again.",
                vec![ErrorDetail::field("guestId", "Missing guest ID")],
            )
        })?;

        let members: &[MemberEntry] = match form.guest_type {
            GuestType::Solo => &[],
            GuestType::SoloWithPlusOne => {
                &form.family_members[..form.family_members.len().min(1)]
            }
            GuestType::FamilyPrimary => &form.family_members,
        };
        let family_members: Vec<MemberPayload> = members
            .iter()
            .map(|m| member_payload(m, form.attending))
            .collect();

        let plus_one = (form.guest_type == GuestType::SoloWithPlusOne)
            .then(|| family_members.first())
            .flatten()
            .filter(|m| m.is_attending);

        Ok(Self {
            guest_id,
            attending: form.attending,
            email: form.email.trim().to_lowercase(),
            dietary_restrictions: if form.attending {
                form.dietary_restrictions.trim().to_string()
            } else {
                String::new()
            },
            send_confirmation_email: form.send_confirmation_email,
            submitted_at,
            bringing_plus_one: plus_one.is_some(),
            plus_one_name: plus_one
                .map(|m| format!("{} {}", m.first_name, m.last_name).trim().to_string())
                .unwrap_or_default(),
            family_members,
        })
    }
}

fn member_payload(member: &MemberEntry, primary_attending: bool) -> MemberPayload {
    // Nobody in the party attends without the primary guest.
    let is_attending = primary_attending && member.is_attending();
    MemberPayload {
        id: member.id,
        first_name: member.first_name.trim().to_string(),
        last_name: member.last_name.trim().to_string(),
        age_group: member.age_group,
        is_attending,
        dietary_restrictions: if is_attending {
            member.dietary_restrictions.trim().to_string()
        } else {
            String::new()
        },
    }
}

/// RSVP record as returned by the backend, both from submission and nested
/// in a validation response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpDto {
    pub id: Option<i64>,
    pub guest_id: Option<i64>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub attending: bool,
    pub guest_email: Option<String>,
    pub email: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub submitted_at: Option<String>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub bringing_plus_one: bool,
    pub plus_one_name: Option<String>,
    #[serde(
        default,
        alias = "familyMemberResponses",
        deserialize_with = "crate::util::null_as_default"
    )]
    pub family_members: Vec<FamilyMemberDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberDto {
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub last_name: String,
    pub age_group: Option<String>,
    pub is_attending: Option<bool>,
    pub dietary_restrictions: Option<String>,
}

impl From<FamilyMemberDto> for FamilyMember {
    fn from(dto: FamilyMemberDto) -> Self {
        FamilyMember {
            id: dto.id,
            first_name: dto.first_name,
            last_name: dto.last_name,
            age_group: dto
                .age_group
                .as_deref()
                .map(AgeGroup::parse_lenient)
                .unwrap_or_default(),
            is_attending: dto.is_attending,
            dietary_restrictions: dto.dietary_restrictions,
        }
    }
}

impl From<RsvpDto> for ExistingRsvp {
    fn from(dto: RsvpDto) -> Self {
        ExistingRsvp {
            id: dto.id,
            guest_id: dto.guest_id,
            attending: dto.attending,
            email: dto.guest_email.or(dto.email),
            dietary_restrictions: dto.dietary_restrictions,
            submitted_at: dto.submitted_at.as_deref().and_then(parse_timestamp),
            bringing_plus_one: dto.bringing_plus_one,
            plus_one_name: dto.plus_one_name,
            family_members: dto.family_members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Accepts RFC 3339 as well as the zone-less timestamps some backends emit,
/// which are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

impl ApiClient {
    pub async fn post_rsvp(&self, payload: &RsvpPayload) -> Result<ExistingRsvp, ApiError> {
        let dto: RsvpDto = self.post_json(RSVPS_PATH, payload).await?;
        Ok(dto.into())
    }
}
