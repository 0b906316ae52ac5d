use anyhow::Context;
use chrono::NaiveDate;
use std::{env, net::SocketAddr, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub api_timeout: Duration,
    pub wedding_date: NaiveDate,
    pub rsvp_deadline: NaiveDate,
    pub template_dir: String,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine in production; the variables come from the environment.
        dotenvy::dotenv().ok();

        let api_base_url = env::var("WEDDING_API_URL")
            .context("WEDDING_API_URL should be provided")?
            .trim_end_matches('/')
            .to_string();
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".into())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;
        let api_timeout = env::var("API_TIMEOUT_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("API_TIMEOUT_SECS should be a whole number of seconds")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_API_TIMEOUT);
        let wedding_date = parse_date("WEDDING_DATE", "2026-04-10")?;
        let rsvp_deadline = parse_date("RSVP_DEADLINE", "2026-02-10")?;
        let template_dir = env::var("TEMPLATE_DIR").unwrap_or_else(|_| "templates".into());
        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "static".into());

        Ok(Self {
            api_base_url,
            rust_log,
            bind_addr,
            api_timeout,
            wedding_date,
            rsvp_deadline,
            template_dir,
            static_dir,
        })
    }

    /// Configuration pointing at the given backend, with every other value at
    /// its default. Used by tests and tooling that don't read the environment.
    pub fn for_backend(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            rust_log: "info".into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            api_timeout: DEFAULT_API_TIMEOUT,
            wedding_date: NaiveDate::from_ymd_opt(2026, 4, 10).unwrap_or_default(),
            rsvp_deadline: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap_or_default(),
            template_dir: "templates".into(),
            static_dir: "static".into(),
        }
    }
}

pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(20);

fn parse_date(key: &str, default: &str) -> anyhow::Result<NaiveDate> {
    let raw = env::var(key).unwrap_or_else(|_| default.into());
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").with_context(|| format!("{key} should be YYYY-MM-DD"))
}
