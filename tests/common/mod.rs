//! Shared helpers for integration tests: an in-memory backend, a throwaway
//! HTTP backend, and request/response helpers for the router.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use std::sync::{Arc, Mutex};
use tokio::{net::TcpListener, sync::Notify};
use wedding_site::{
    api::{
        WeddingBackend,
        registry::{Donation, DonationPayload, RegistryOverview, RegistrySettings},
        rsvp::RsvpPayload,
    },
    config::Config,
    error::{ApiError, ErrorDetail, ErrorKind},
    router::create_router,
    rsvp::{
        AgeGroup, ExistingRsvp, FamilyGroup, FamilyMember, GuestType, Invitation, PrimaryGuest,
    },
};

pub const VALID_CODE: &str = "ABC123";
pub const FAMILY_CODE: &str = "FAM123";

#[derive(Default)]
pub struct FakeBackend {
    pub validated: Mutex<Vec<String>>,
    pub rsvps: Mutex<Vec<RsvpPayload>>,
    pub donations: Mutex<Vec<DonationPayload>>,
    /// When set, each lookup signals `lookup_started` and then waits here.
    pub release: Option<Notify>,
    pub lookup_started: Notify,
}

impl FakeBackend {
    /// A backend whose lookups block until `release` is notified.
    pub fn held() -> Self {
        Self {
            release: Some(Notify::new()),
            ..Default::default()
        }
    }
}

pub fn jane() -> Invitation {
    Invitation {
        guest: PrimaryGuest {
            id: 7,
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: None,
            plus_one_allowed: false,
            has_rsvp: false,
        },
        guest_type: GuestType::Solo,
        family_group: None,
        family_members: Vec::new(),
        existing_rsvp: None,
        has_existing_rsvp: false,
    }
}

/// Ana Ruiz and her son Leo, invited as a family of up to three.
pub fn ruiz_family() -> Invitation {
    Invitation {
        guest: PrimaryGuest {
            id: 21,
            first_name: "Ana".into(),
            last_name: "Ruiz".into(),
            email: Some("ana@example.com".into()),
            plus_one_allowed: false,
            has_rsvp: false,
        },
        guest_type: GuestType::FamilyPrimary,
        family_group: Some(FamilyGroup {
            id: 5,
            group_name: "Ruiz Family".into(),
            max_attendees: 3,
        }),
        family_members: vec![FamilyMember {
            id: Some(22),
            first_name: "Leo".into(),
            last_name: "Ruiz".into(),
            age_group: AgeGroup::Child,
            is_attending: None,
            dietary_restrictions: None,
        }],
        existing_rsvp: None,
        has_existing_rsvp: false,
    }
}

#[async_trait]
impl WeddingBackend for FakeBackend {
    async fn validate_invitation(&self, code: &str) -> Result<Invitation, ApiError> {
        self.validated.lock().unwrap().push(code.to_string());
        if let Some(release) = &self.release {
            self.lookup_started.notify_one();
            release.notified().await;
        }
        match code {
            VALID_CODE => Ok(jane()),
            FAMILY_CODE => Ok(ruiz_family()),
            _ => Err(ApiError::new(
                ErrorKind::ServerRejected,
                "Invalid invitation code",
                vec![ErrorDetail::reason("Invitation not found")],
            )
            .with_status(404)),
        }
    }

    async fn submit_rsvp(&self, payload: &RsvpPayload) -> Result<ExistingRsvp, ApiError> {
        self.rsvps.lock().unwrap().push(payload.clone());
        Ok(ExistingRsvp {
            id: Some(100),
            guest_id: Some(payload.guest_id),
            attending: payload.attending,
            email: Some(payload.email.clone()),
            dietary_restrictions: Some(payload.dietary_restrictions.clone()),
            submitted_at: Some(payload.submitted_at),
            bringing_plus_one: payload.bringing_plus_one,
            plus_one_name: None,
            family_members: Vec::new(),
        })
    }

    async fn registry_overview(&self) -> Result<RegistryOverview, ApiError> {
        Ok(RegistryOverview {
            settings: RegistrySettings {
                id: 1,
                honeymoon_goal_amount: 5000.0,
                venmo_handle: Some("@jane-and-sam".into()),
                zelle_handle: None,
                registry_description: Some("Help us get to Lisbon".into()),
                is_active: true,
            },
            total_donated: 1250.0,
            goal_amount: 5000.0,
            progress_percentage: 25.0,
            total_donations: 5,
            pending_donations: 1,
            average_donation: 250.0,
        })
    }

    async fn recent_donations(&self) -> Result<Vec<Donation>, ApiError> {
        Err(ApiError::network())
    }

    async fn submit_donation(&self, payload: &DonationPayload) -> Result<Donation, ApiError> {
        self.donations.lock().unwrap().push(payload.clone());
        Ok(Donation {
            id: 1,
            donor_name: payload.donor_name.clone(),
            amount: payload.amount,
            payment_method: payload.payment_method.clone(),
            message: None,
            status: Some("PENDING".into()),
            donation_date: None,
        })
    }
}

pub fn create_test_app(backend: Arc<FakeBackend>) -> Router {
    create_router(Config::for_backend("http://backend.invalid"), backend)
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// The `name=value` part of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
