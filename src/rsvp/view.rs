use serde::{Deserialize, Serialize};

/// Lifecycle of one asynchronous call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// The single screen the RSVP page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    CodeEntry,
    Loading,
    ErrorInvalidCode,
    MainForm,
    Success,
}

/// Picks the view from the two call statuses. A failed validation only shows
/// the error screen when a code was actually supplied; otherwise the visitor
/// lands back on code entry.
pub fn select_view(validation: Status, submission: Status, has_code: bool, has_guest: bool) -> View {
    if validation == Status::Loading {
        View::Loading
    } else if validation == Status::Failed && has_code {
        View::ErrorInvalidCode
    } else if submission == Status::Succeeded {
        View::Success
    } else if validation == Status::Succeeded && has_guest {
        View::MainForm
    } else {
        View::CodeEntry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Status; 4] = [Status::Idle, Status::Loading, Status::Succeeded, Status::Failed];

    #[test]
    fn loading_wins_over_everything() {
        for submission in ALL {
            for has_code in [true, false] {
                assert_eq!(
                    select_view(Status::Loading, submission, has_code, true),
                    View::Loading
                );
            }
        }
    }

    #[test]
    fn failure_without_code_falls_back_to_code_entry() {
        assert_eq!(
            select_view(Status::Failed, Status::Idle, false, false),
            View::CodeEntry
        );
        assert_eq!(
            select_view(Status::Failed, Status::Idle, true, false),
            View::ErrorInvalidCode
        );
    }

    #[test]
    fn main_form_needs_a_guest_and_no_success() {
        assert_eq!(
            select_view(Status::Succeeded, Status::Idle, true, true),
            View::MainForm
        );
        assert_eq!(
            select_view(Status::Succeeded, Status::Failed, true, true),
            View::MainForm
        );
        assert_eq!(
            select_view(Status::Succeeded, Status::Loading, true, true),
            View::MainForm
        );
        assert_eq!(
            select_view(Status::Succeeded, Status::Succeeded, true, true),
            View::Success
        );
        assert_eq!(
            select_view(Status::Succeeded, Status::Idle, true, false),
            View::CodeEntry
        );
    }

    #[test]
    fn idle_is_code_entry() {
        assert_eq!(
            select_view(Status::Idle, Status::Idle, false, false),
            View::CodeEntry
        );
        assert_eq!(
            select_view(Status::Idle, Status::Idle, true, false),
            View::CodeEntry
        );
    }

    #[test]
    fn every_combination_matches_the_decision_table() {
        for validation in ALL {
            for submission in ALL {
                for has_code in [true, false] {
                    let view = select_view(validation, submission, has_code, true);
                    let expected = match (validation, submission, has_code) {
                        (Status::Loading, _, _) => View::Loading,
                        (Status::Failed, _, true) => View::ErrorInvalidCode,
                        (_, Status::Succeeded, _) => View::Success,
                        (Status::Succeeded, _, _) => View::MainForm,
                        _ => View::CodeEntry,
                    };
                    assert_eq!(view, expected, "{validation:?}/{submission:?}/{has_code}");
                }
            }
        }
    }
}
