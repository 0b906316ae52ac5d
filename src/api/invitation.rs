use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use tracing::debug;

use super::rsvp::{FamilyMemberDto, RsvpDto};
use super::{ApiClient, PATH_SEGMENT};
use crate::error::ApiError;
use crate::rsvp::{ExistingRsvp, FamilyGroup, GuestType, Invitation, PrimaryGuest};

const VALIDATE_PATH: &str = "/v1/api/invitation/validate";

/// Response of `GET /v1/api/invitation/validate/{code}`.
///
/// Older backends answer with `{guest, existingRsvp, hasExistingRsvp}`; newer
/// ones with `primaryGuest` plus the family fields. Both are accepted here and
/// funnelled through [`ValidationResponse::into_invitation`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub primary_guest: Option<GuestDto>,
    pub guest: Option<GuestDto>,
    pub guest_type: Option<String>,
    pub family_group: Option<FamilyGroupDto>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub family_members: Vec<FamilyMemberDto>,
    pub existing_rsvp: Option<RsvpDto>,
    pub has_existing_rsvp: Option<bool>,
    pub can_bring_plus_one: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDto {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub last_name: String,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub plus_one_allowed: bool,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub has_rsvp: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyGroupDto {
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub id: i64,
    #[serde(default, alias = "name", deserialize_with = "crate::util::null_as_default")]
    pub group_name: String,
    pub max_attendees: Option<u32>,
}

fn parse_guest_type(raw: &str) -> Option<GuestType> {
    match raw.trim().to_uppercase().as_str() {
        "SOLO" => Some(GuestType::Solo),
        "SOLO_WITH_PLUS_ONE" => Some(GuestType::SoloWithPlusOne),
        "FAMILY_PRIMARY" => Some(GuestType::FamilyPrimary),
        _ => None,
    }
}

impl ValidationResponse {
    pub fn into_invitation(self) -> Result<Invitation, ApiError> {
        let guest = self
            .primary_guest
            .or(self.guest)
            .ok_or_else(|| ApiError::malformed("Guest information not found in response"))?;

        let guest_type = self
            .guest_type
            .as_deref()
            .and_then(parse_guest_type)
            .unwrap_or(if self.family_group.is_some() {
                GuestType::FamilyPrimary
            } else if self.can_bring_plus_one == Some(true) {
                GuestType::SoloWithPlusOne
            } else {
                GuestType::Solo
            });

        let member_count = self.family_members.len() as u32;
        let family_group = match (self.family_group, guest_type) {
            (Some(group), _) => Some(FamilyGroup {
                id: group.id,
                group_name: group.group_name,
                max_attendees: group.max_attendees.unwrap_or(member_count + 1),
            }),
            (None, GuestType::FamilyPrimary) => {
                debug!("Family invitation for guest {} has no group, sizing from members", guest.id);
                Some(FamilyGroup {
                    id: 0,
                    group_name: String::new(),
                    max_attendees: member_count + 1,
                })
            }
            (None, _) => None,
        };

        let existing_rsvp: Option<ExistingRsvp> = self.existing_rsvp.map(Into::into);
        let has_existing_rsvp = self.has_existing_rsvp.unwrap_or(existing_rsvp.is_some());

        Ok(Invitation {
            guest: PrimaryGuest {
                id: guest.id,
                first_name: guest.first_name,
                last_name: guest.last_name,
                email: guest.email,
                plus_one_allowed: guest.plus_one_allowed,
                has_rsvp: guest.has_rsvp,
            },
            guest_type,
            family_group,
            family_members: self.family_members.into_iter().map(Into::into).collect(),
            existing_rsvp,
            has_existing_rsvp,
        })
    }
}

impl ApiClient {
    /// Validates an already normalized code.
    pub async fn fetch_invitation(&self, code: &str) -> Result<Invitation, ApiError> {
        let path = format!(
            "{}/{}",
            VALIDATE_PATH,
            utf8_percent_encode(code, PATH_SEGMENT)
        );
        let response: ValidationResponse = self.get_json(&path).await?;
        response.into_invitation()
    }
}
