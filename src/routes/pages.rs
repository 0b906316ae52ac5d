use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{Local, NaiveDate};
use minijinja::context;
use serde::Serialize;

use crate::{error::AppError, router::AppState};

/// Display-only countdown to the wedding day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub days: i64,
    pub weeks: i64,
    pub is_today: bool,
    pub has_passed: bool,
}

impl Countdown {
    pub fn between(today: NaiveDate, wedding_date: NaiveDate) -> Self {
        let days = (wedding_date - today).num_days();
        Self {
            days: days.max(0),
            weeks: days.max(0) / 7,
            is_today: days == 0,
            has_passed: days < 0,
        }
    }
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let countdown = Countdown::between(Local::now().date_naive(), state.config.wedding_date);
    state.render("index.html", context! { countdown, page => "home" })
}

pub async fn our_story(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    state.render("our_story.html", context! { page => "our-story" })
}

pub async fn venue(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    state.render("venue.html", context! { page => "venue" })
}

pub async fn not_found(State(state): State<AppState>) -> Result<Response, AppError> {
    let html = state.render("not_found.html", context! {})?;
    Ok((StatusCode::NOT_FOUND, html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn counts_down_in_days_and_weeks() {
        let c = Countdown::between(date(2026, 3, 1), date(2026, 4, 10));
        assert_eq!(c.days, 40);
        assert_eq!(c.weeks, 5);
        assert!(!c.is_today && !c.has_passed);
    }

    #[test]
    fn wedding_day_and_after() {
        assert!(Countdown::between(date(2026, 4, 10), date(2026, 4, 10)).is_today);
        let after = Countdown::between(date(2026, 5, 1), date(2026, 4, 10));
        assert!(after.has_passed);
        assert_eq!(after.days, 0);
    }
}
