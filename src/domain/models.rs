use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MIN_CYCLE_LENGTH_DAYS: u32 = 21;
pub const MAX_CYCLE_LENGTH_DAYS: u32 = 40;
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Fertile,
    Ovulation,
    Luteal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: i64,
    pub user: User,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub cycle_type: Option<String>,
    // The backend keeps the cycle anchor under this historical wire name.
    #[serde(default, rename = "last_ovulation")]
    pub last_cycle_start: Option<NaiveDate>,
    #[serde(default)]
    pub cycle_length: Option<u32>,
    #[serde(default)]
    pub period_length: Option<u32>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<String>,
    #[serde(rename = "last_ovulation", skip_serializing_if = "Option::is_none")]
    pub last_cycle_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(cycle_length) = self.cycle_length {
            validate_cycle_length(cycle_length)?;
        }
        if let (Some(period_length), Some(cycle_length)) = (self.period_length, self.cycle_length) {
            validate_period_length(period_length, cycle_length)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub cramps: u8,
    pub bloating: u8,
    pub tender_breasts: u8,
    pub headache: u8,
    pub acne: u8,
    pub mood: u8,
    pub stress: u8,
    pub energy: u8,
    pub cervical_mucus: String,
    pub sleep_quality: u8,
    pub libido: u8,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyEntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cramps: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tender_breasts: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headache: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acne: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cervical_mucus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libido: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<String>,
    #[serde(rename = "last_ovulation", skip_serializing_if = "Option::is_none")]
    pub last_cycle_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferences: Vec<String>,
}

impl RegistrationRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.username, "registration.username")?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "registration.password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        if let Some(cycle_length) = self.cycle_length {
            validate_cycle_length(cycle_length)?;
        }
        if let Some(period_length) = self.period_length {
            let cycle_length = self.cycle_length.unwrap_or(MAX_CYCLE_LENGTH_DAYS);
            validate_period_length(period_length, cycle_length)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

impl SessionTokens {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.access, "tokens.access")?;
        validate_non_empty(&self.refresh, "tokens.refresh")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

impl AuthResponse {
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens::new(self.access.clone(), self.refresh.clone())
    }
}

/// One cycle day as reported by the `calendar/` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteCycleDay {
    pub date: NaiveDate,
    pub day_num: u32,
    pub phase: CyclePhase,
    pub is_past: bool,
    pub is_today: bool,
    #[serde(default)]
    pub new_month: bool,
    pub angle: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardData {
    pub days: Vec<u32>,
    pub fsh: Vec<f64>,
    pub lh: Vec<f64>,
    pub estradiol: Vec<f64>,
    pub progesterone: Vec<f64>,
}

impl DashboardData {
    pub fn validate(&self) -> Result<(), String> {
        let expected = self.days.len();
        for (name, series) in [
            ("fsh", &self.fsh),
            ("lh", &self.lh),
            ("estradiol", &self.estradiol),
            ("progesterone", &self.progesterone),
        ] {
            if series.len() != expected {
                return Err(format!(
                    "dashboard.{name} has {} points, expected {expected}",
                    series.len()
                ));
            }
        }
        Ok(())
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_cycle_length(cycle_length: u32) -> Result<(), String> {
    if !(MIN_CYCLE_LENGTH_DAYS..=MAX_CYCLE_LENGTH_DAYS).contains(&cycle_length) {
        return Err(format!(
            "cycle_length must be between {MIN_CYCLE_LENGTH_DAYS} and {MAX_CYCLE_LENGTH_DAYS} days"
        ));
    }
    Ok(())
}

fn validate_period_length(period_length: u32, cycle_length: u32) -> Result<(), String> {
    if period_length == 0 {
        return Err("period_length must be > 0".to_string());
    }
    if period_length >= cycle_length {
        return Err("period_length must be shorter than cycle_length".to_string());
    }
    Ok(())
}
