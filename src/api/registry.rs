use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::ApiError;

const OVERVIEW_PATH: &str = "/v1/api/registry/overview";
const DONATIONS_PATH: &str = "/v1/api/registry/donations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySettings {
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub honeymoon_goal_amount: f64,
    pub venmo_handle: Option<String>,
    pub zelle_handle: Option<String>,
    pub registry_description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryOverview {
    pub settings: RegistrySettings,
    pub total_donated: f64,
    pub goal_amount: f64,
    pub progress_percentage: f64,
    pub total_donations: u32,
    pub pending_donations: u32,
    pub average_donation: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverviewDto {
    settings: Option<RegistrySettings>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    total_donated: f64,
    goal_amount: Option<f64>,
    progress_percentage: Option<f64>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    total_donations: u32,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pending_donations: u32,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    average_donation: f64,
}

impl OverviewDto {
    fn into_overview(self) -> Result<RegistryOverview, ApiError> {
        let settings = self
            .settings
            .ok_or_else(|| ApiError::malformed("Registry settings not found in response"))?;
        let goal_amount = self.goal_amount.unwrap_or(settings.honeymoon_goal_amount);
        let progress_percentage = self.progress_percentage.unwrap_or_else(|| {
            if goal_amount > 0.0 {
                self.total_donated / goal_amount * 100.0
            } else {
                0.0
            }
        });
        Ok(RegistryOverview {
            settings,
            total_donated: self.total_donated,
            goal_amount,
            progress_percentage: progress_percentage.clamp(0.0, 100.0),
            total_donations: self.total_donations,
            pending_donations: self.pending_donations,
            average_donation: self.average_donation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: i64,
    pub donor_name: String,
    pub amount: f64,
    pub payment_method: String,
    pub message: Option<String>,
    pub status: Option<String>,
    pub donation_date: Option<String>,
}

/// Body of `POST /v1/api/registry/donations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationPayload {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub amount: f64,
    pub payment_method: String,
    pub payment_reference: String,
    pub message: String,
    pub guest_id: Option<i64>,
}

impl ApiClient {
    pub async fn fetch_registry_overview(&self) -> Result<RegistryOverview, ApiError> {
        let dto: OverviewDto = self.get_json(OVERVIEW_PATH).await?;
        dto.into_overview()
    }

    pub async fn fetch_recent_donations(&self) -> Result<Vec<Donation>, ApiError> {
        self.get_json(&format!("{DONATIONS_PATH}?status=CONFIRMED"))
            .await
    }

    pub async fn post_donation(&self, payload: &DonationPayload) -> Result<Donation, ApiError> {
        self.post_json(DONATIONS_PATH, payload).await
    }
}
