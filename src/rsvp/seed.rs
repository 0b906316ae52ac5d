use tracing::warn;

use super::{ExistingRsvp, FamilyMember, FormState, GuestType, Invitation, MemberEntry};

/// Builds the initial form from a validated invitation. Pure: the same
/// invitation always yields the same form.
pub fn seed_form(invitation: &Invitation) -> FormState {
    let guest = &invitation.guest;
    let existing = invitation
        .existing_rsvp
        .as_ref()
        .filter(|_| invitation.has_existing_rsvp);

    let mut form = FormState {
        guest_id: Some(guest.id),
        guest_type: invitation.guest_type,
        max_attendees: invitation.family_group.as_ref().map(|g| g.max_attendees),
        member_limit: invitation.member_limit(),
        email: guest.email.clone().unwrap_or_default(),
        ..Default::default()
    };

    if let Some(rsvp) = existing {
        form.attending = rsvp.attending;
        if let Some(email) = rsvp.email.as_ref().filter(|e| !e.trim().is_empty()) {
            form.email = email.clone();
        }
        if rsvp.attending {
            form.dietary_restrictions = rsvp.dietary_restrictions.clone().unwrap_or_default();
        }
    }

    form.family_members = match invitation.guest_type {
        GuestType::Solo => Vec::new(),
        GuestType::SoloWithPlusOne => vec![match existing {
            Some(rsvp) => plus_one_from_rsvp(rsvp),
            None => MemberEntry {
                is_attending: Some(true),
                ..Default::default()
            },
        }],
        // Always the current member records, never the snapshot stored with
        // an older response.
        GuestType::FamilyPrimary => invitation
            .family_members
            .iter()
            .map(member_entry)
            .collect(),
    };

    if form.family_members.len() > form.member_limit {
        warn!(
            "Invitation for guest {} lists {} members but allows {}, truncating",
            guest.id,
            form.family_members.len(),
            form.member_limit
        );
        form.family_members.truncate(form.member_limit);
    }

    form
}

fn member_entry(member: &FamilyMember) -> MemberEntry {
    let is_attending = member.is_attending.unwrap_or(true);
    MemberEntry {
        id: member.id,
        first_name: member.first_name.clone(),
        last_name: member.last_name.clone(),
        age_group: member.age_group,
        is_attending: Some(is_attending),
        dietary_restrictions: if is_attending {
            member.dietary_restrictions.clone().unwrap_or_default()
        } else {
            String::new()
        },
    }
}

fn plus_one_from_rsvp(rsvp: &ExistingRsvp) -> MemberEntry {
    if let Some(member) = rsvp.family_members.first() {
        return member_entry(member);
    }

    // Older responses only carry a single free-text name.
    match rsvp.plus_one_name.as_deref().map(str::trim) {
        Some(name) if rsvp.bringing_plus_one && !name.is_empty() => {
            let (first, last) = name.split_once(' ').unwrap_or((name, ""));
            MemberEntry {
                first_name: first.to_string(),
                last_name: last.trim().to_string(),
                is_attending: Some(true),
                ..Default::default()
            }
        }
        _ => MemberEntry {
            is_attending: Some(false),
            ..Default::default()
        },
    }
}
