use serde::Deserialize;

use super::{AgeGroup, FormState, GuestType, MemberEntry};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemberError {
    #[error("No more guests can be added to this invitation (limit {limit})")]
    AtCapacity { limit: usize },

    #[error("There is no guest at position {index}")]
    OutOfRange { index: usize },
}

/// Partial update for a member; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemberPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age_group: Option<AgeGroup>,
    pub is_attending: Option<bool>,
    pub dietary_restrictions: Option<String>,
}

impl MemberPatch {
    fn apply(self, member: &mut MemberEntry) {
        if let Some(first_name) = self.first_name {
            member.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            member.last_name = last_name;
        }
        if let Some(age_group) = self.age_group {
            member.age_group = age_group;
        }
        if let Some(dietary) = self.dietary_restrictions {
            member.dietary_restrictions = dietary;
        }
        if let Some(is_attending) = self.is_attending {
            member.is_attending = Some(is_attending);
            if !is_attending {
                member.dietary_restrictions.clear();
            }
        }
    }
}

impl FormState {
    pub fn can_add_member(&self) -> bool {
        self.family_members.len() < self.member_limit
    }

    /// Appends a member built from `patch`, attending unless the patch says
    /// otherwise. At capacity the list is left untouched.
    pub fn add_member(&mut self, patch: MemberPatch) -> Result<usize, MemberError> {
        if !self.can_add_member() {
            return Err(MemberError::AtCapacity {
                limit: self.member_limit,
            });
        }
        let mut member = MemberEntry {
            is_attending: Some(true),
            ..Default::default()
        };
        patch.apply(&mut member);
        self.family_members.push(member);
        Ok(self.family_members.len() - 1)
    }

    pub fn update_member(&mut self, index: usize, patch: MemberPatch) -> Result<(), MemberError> {
        let member = self
            .family_members
            .get_mut(index)
            .ok_or(MemberError::OutOfRange { index })?;
        patch.apply(member);
        Ok(())
    }

    /// Removal is allowed for new and existing members alike; the backend
    /// reconciles on submit.
    pub fn remove_member(&mut self, index: usize) -> Result<MemberEntry, MemberError> {
        if index >= self.family_members.len() {
            return Err(MemberError::OutOfRange { index });
        }
        Ok(self.family_members.remove(index))
    }
}

/// Heading shown above a member's fields. Members added on this form are
/// always "Additional Guest"; backend members keep their name unless it is a
/// placeholder.
pub fn member_title(guest_type: GuestType, member: &MemberEntry) -> String {
    if guest_type == GuestType::SoloWithPlusOne {
        return "Plus One".to_string();
    }
    if member.id.is_none() {
        return "Additional Guest".to_string();
    }

    let full_name = format!("{} {}", member.first_name, member.last_name)
        .trim()
        .to_string();
    let lowered = full_name.to_lowercase();
    let placeholder = full_name.is_empty()
        || lowered.contains("guest")
        || lowered.contains("member")
        || lowered.contains("placeholder");
    if placeholder {
        "Group Member (Please Update Name)".to_string()
    } else {
        full_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family_form(max_attendees: u32, existing: usize) -> FormState {
        FormState {
            guest_id: Some(1),
            guest_type: GuestType::FamilyPrimary,
            max_attendees: Some(max_attendees),
            member_limit: max_attendees.saturating_sub(1) as usize,
            family_members: (0..existing)
                .map(|i| MemberEntry {
                    id: Some(i as i64 + 100),
                    first_name: "Kid".into(),
                    last_name: "Doe".into(),
                    is_attending: Some(true),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn add_member_respects_family_capacity() {
        let mut form = family_form(3, 1);
        assert_eq!(form.add_member(MemberPatch::default()), Ok(1));
        assert_eq!(form.family_members.len(), 2);
        assert_eq!(
            form.add_member(MemberPatch::default()),
            Err(MemberError::AtCapacity { limit: 2 })
        );
        assert_eq!(form.family_members.len(), 2);
    }

    #[test]
    fn capacity_holds_across_add_and_remove() {
        let mut form = family_form(4, 0);
        for step in 0..50 {
            if step % 3 == 2 {
                let _ = form.remove_member(0);
            } else {
                let _ = form.add_member(MemberPatch::default());
            }
            assert!(form.family_members.len() <= 3);
        }
    }

    #[test]
    fn plus_one_allows_single_member() {
        let mut form = FormState {
            guest_type: GuestType::SoloWithPlusOne,
            member_limit: 1,
            ..Default::default()
        };
        assert!(form.add_member(MemberPatch::default()).is_ok());
        assert!(form.add_member(MemberPatch::default()).is_err());
    }

    #[test]
    fn solo_cannot_add() {
        let mut form = FormState::default();
        assert!(!form.can_add_member());
        assert!(form.add_member(MemberPatch::default()).is_err());
        assert!(form.family_members.is_empty());
    }

    #[test]
    fn new_member_defaults_to_attending() {
        let mut form = family_form(3, 0);
        let idx = form
            .add_member(MemberPatch {
                first_name: Some("Lil".into()),
                ..Default::default()
            })
            .unwrap();
        let added = &form.family_members[idx];
        assert_eq!(added.is_attending, Some(true));
        assert_eq!(added.first_name, "Lil");
        assert!(added.id.is_none());
    }

    #[test]
    fn declining_member_clears_dietary_for_good() {
        let mut form = family_form(3, 1);
        form.update_member(
            0,
            MemberPatch {
                dietary_restrictions: Some("gluten free".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(form.family_members[0].dietary_restrictions, "gluten free");

        form.update_member(
            0,
            MemberPatch {
                is_attending: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(form.family_members[0].dietary_restrictions.is_empty());

        form.update_member(
            0,
            MemberPatch {
                is_attending: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(form.family_members[0].dietary_restrictions.is_empty());
    }

    #[test]
    fn existing_members_can_be_removed() {
        let mut form = family_form(3, 2);
        let removed = form.remove_member(0).unwrap();
        assert_eq!(removed.id, Some(100));
        assert_eq!(form.family_members.len(), 1);
        assert_eq!(
            form.remove_member(5),
            Err(MemberError::OutOfRange { index: 5 })
        );
        assert_eq!(
            form.update_member(1, MemberPatch::default()),
            Err(MemberError::OutOfRange { index: 1 })
        );
    }

    #[test]
    fn titles() {
        let mut member = MemberEntry::default();
        assert_eq!(member_title(GuestType::SoloWithPlusOne, &member), "Plus One");
        assert_eq!(member_title(GuestType::FamilyPrimary, &member), "Additional Guest");

        member.first_name = "Lil".into();
        member.last_name = "Doe".into();
        assert_eq!(member_title(GuestType::FamilyPrimary, &member), "Additional Guest");

        member.id = Some(4);
        member.first_name = "Guest".into();
        member.last_name = "2".into();
        assert_eq!(
            member_title(GuestType::FamilyPrimary, &member),
            "Group Member (Please Update Name)"
        );

        member.first_name = "Rosa".into();
        member.last_name = "Parks".into();
        assert_eq!(member_title(GuestType::FamilyPrimary, &member), "Rosa Parks");
    }
}
