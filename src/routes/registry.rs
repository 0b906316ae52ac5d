use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use serde::Serialize;
use std::collections::HashMap;
use tower_sessions::Session;
use tracing::{info, warn};

use super::rsvp::load as load_workflow;
use crate::{
    api::registry::{Donation, RegistryOverview},
    error::{ApiError, AppError},
    registry::{DonationForm, PAYMENT_METHODS},
    router::AppState,
};

const PLEDGE_KEY: &str = "registry.pledge";

#[derive(Debug, Serialize)]
struct DonationView<'a> {
    donor_name: &'a str,
    amount: String,
    message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OverviewView<'a> {
    overview: &'a RegistryOverview,
    total_donated: String,
    goal_amount: String,
    progress: String,
}

pub fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

pub async fn registry(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let pledge: Option<Donation> = session.remove(PLEDGE_KEY).await?;
    render(&state, &DonationForm::default(), None, pledge.as_ref(), StatusCode::OK).await
}

pub async fn submit_donation(
    State(state): State<AppState>,
    session: Session,
    Form(mut form): Form<DonationForm>,
) -> Result<Response, AppError> {
    form.guest_id = load_workflow(&session)
        .await?
        .invitation()
        .map(|i| i.guest.id);

    let payload = match form.to_payload() {
        Ok(payload) => payload,
        Err(err) => {
            return render(&state, &form, Some(&err), None, StatusCode::UNPROCESSABLE_ENTITY).await;
        }
    };

    match state.backend.submit_donation(&payload).await {
        Ok(donation) => {
            info!("Recorded {} pledge of {}", donation.payment_method, money(donation.amount));
            session.insert(PLEDGE_KEY, &donation).await?;
            Ok(Redirect::to("/registry").into_response())
        }
        Err(err) => {
            warn!("Donation pledge failed: {}", err);
            let status = if err.is_network() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            render(&state, &form, Some(&err), None, status).await
        }
    }
}

async fn render(
    state: &AppState,
    form: &DonationForm,
    error: Option<&ApiError>,
    pledge: Option<&Donation>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let overview = state.backend.registry_overview().await;
    // Recent donations are decoration; the page works without them.
    let donations = state.backend.recent_donations().await.unwrap_or_else(|e| {
        warn!("Could not load recent donations: {}", e);
        Vec::new()
    });

    let overview_view = overview.as_ref().ok().map(|o| OverviewView {
        overview: o,
        total_donated: money(o.total_donated),
        goal_amount: money(o.goal_amount),
        progress: format!("{:.0}", o.progress_percentage),
    });
    let donation_views: Vec<DonationView> = donations
        .iter()
        .map(|d| DonationView {
            donor_name: &d.donor_name,
            amount: money(d.amount),
            message: d.message.as_deref().filter(|m| !m.trim().is_empty()),
        })
        .collect();
    let field_errors: HashMap<&str, &str> = error
        .map(|e| {
            e.details
                .iter()
                .filter_map(|d| Some((d.field.as_deref()?, d.reason.as_str())))
                .collect()
        })
        .unwrap_or_default();

    let html = state.render(
        "registry.html",
        context! {
            page => "registry",
            registry => overview_view,
            overview_error => overview.as_ref().err().map(ApiError::friendly_message),
            donations => donation_views,
            form => form,
            payment_methods => PAYMENT_METHODS,
            error => error.map(ApiError::friendly_message),
            field_errors => field_errors,
            pledge => pledge.map(|p| context! { donor_name => &p.donor_name, amount => money(p.amount) }),
        },
    )?;
    Ok((status, html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(50.0), "$50.00");
        assert_eq!(money(12.5), "$12.50");
    }
}
