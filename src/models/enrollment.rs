use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Approved,
    Waitlisted,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Waitlisted => "waitlisted",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(EnrollmentStatus::Pending),
            "approved" => Ok(EnrollmentStatus::Approved),
            "waitlisted" => Ok(EnrollmentStatus::Waitlisted),
            other => Err(format!("unknown enrollment status: {}", other)),
        }
    }
}

/// Submission time as the store holds it: epoch-millis from newer forms,
/// an ISO string from older ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Iso(String),
    #[default]
    Missing,
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Timestamp::Iso(text) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Some(dt.with_timezone(&Utc));
                }
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }
            Timestamp::Missing => None,
        }
    }

    /// `YYYY-MM-DD` when the value parses, otherwise the raw text.
    pub fn display_date(&self) -> String {
        match (self.to_datetime(), self) {
            (Some(dt), _) => dt.format("%Y-%m-%d").to_string(),
            (None, Timestamp::Iso(text)) => text.clone(),
            (None, Timestamp::Millis(ms)) => ms.to_string(),
            (None, Timestamp::Missing) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub child_name: String,
    pub child_age: String,
    pub child_gender: String,
    pub parent_name: String,
    pub parent_email: String,
    pub parent_phone: String,
    pub parent_relation: String,
    pub course: String,
    pub course_id: String,
    pub preferred_time: String,
    pub start_date: String,
    pub submitted_at: Timestamp,
    pub interests: Vec<String>,
    pub status: EnrollmentStatus,
    pub notes: String,
}
