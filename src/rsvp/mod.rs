use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod code;
pub mod members;
pub mod seed;
pub mod validate;
pub mod view;
pub mod workflow;

/// Decides which companion rules apply to an invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestType {
    #[default]
    Solo,
    SoloWithPlusOne,
    FamilyPrimary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeGroup {
    #[default]
    Adult,
    Child,
    Infant,
}

impl AgeGroup {
    /// Case-insensitive parse. The backend is not consistent about casing, and
    /// an unknown value is treated as an adult rather than rejected.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "CHILD" => AgeGroup::Child,
            "INFANT" => AgeGroup::Infant,
            _ => AgeGroup::Adult,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Adult => "ADULT",
            AgeGroup::Child => "CHILD",
            AgeGroup::Infant => "INFANT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryGuest {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub plus_one_allowed: bool,
    pub has_rsvp: bool,
}

impl PrimaryGuest {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyGroup {
    pub id: i64,
    pub group_name: String,
    pub max_attendees: u32,
}

/// An additional invitee as known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub age_group: AgeGroup,
    pub is_attending: Option<bool>,
    pub dietary_restrictions: Option<String>,
}

/// A previously submitted response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRsvp {
    pub id: Option<i64>,
    pub guest_id: Option<i64>,
    pub attending: bool,
    pub email: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub bringing_plus_one: bool,
    pub plus_one_name: Option<String>,
    pub family_members: Vec<FamilyMember>,
}

/// Everything a successful invitation validation yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub guest: PrimaryGuest,
    pub guest_type: GuestType,
    pub family_group: Option<FamilyGroup>,
    pub family_members: Vec<FamilyMember>,
    pub existing_rsvp: Option<ExistingRsvp>,
    pub has_existing_rsvp: bool,
}

impl Invitation {
    /// How many companions may be listed besides the primary guest.
    pub fn member_limit(&self) -> usize {
        member_limit(self.guest_type, self.family_group.as_ref())
    }
}

pub fn member_limit(guest_type: GuestType, family_group: Option<&FamilyGroup>) -> usize {
    match guest_type {
        GuestType::Solo => 0,
        GuestType::SoloWithPlusOne => 1,
        // One slot is always reserved for the primary guest.
        GuestType::FamilyPrimary => family_group
            .map(|g| g.max_attendees.saturating_sub(1) as usize)
            .unwrap_or(0),
    }
}

/// A family member or plus-one as edited in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub age_group: AgeGroup,
    pub is_attending: Option<bool>,
    pub dietary_restrictions: String,
}

impl MemberEntry {
    pub fn is_attending(&self) -> bool {
        self.is_attending == Some(true)
    }

    pub fn has_full_name(&self) -> bool {
        !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty()
    }
}

/// The mutable working copy of an RSVP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub guest_id: Option<i64>,
    pub guest_type: GuestType,
    pub max_attendees: Option<u32>,
    pub member_limit: usize,
    pub attending: bool,
    pub email: String,
    pub dietary_restrictions: String,
    pub send_confirmation_email: bool,
    pub family_members: Vec<MemberEntry>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            guest_id: None,
            guest_type: GuestType::Solo,
            max_attendees: None,
            member_limit: 0,
            attending: true,
            email: String::new(),
            dietary_restrictions: String::new(),
            send_confirmation_email: true,
            family_members: Vec::new(),
        }
    }
}

impl FormState {
    /// Declining clears the primary guest's dietary notes; accepting again
    /// does not bring them back.
    pub fn set_attending(&mut self, attending: bool) {
        if !attending {
            self.dietary_restrictions.clear();
        }
        self.attending = attending;
    }

    /// Primary guest plus every companion marked as attending.
    pub fn attending_headcount(&self) -> usize {
        if !self.attending {
            return 0;
        }
        1 + self
            .family_members
            .iter()
            .filter(|m| m.is_attending())
            .count()
    }
}
