use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a company's interest in a student.
/// `pending -> accepted | rejected`; both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InterestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestStatus::Pending => "pending",
            InterestStatus::Accepted => "accepted",
            InterestStatus::Rejected => "rejected",
        }
    }
}

/// Denormalized company snapshot carried on every interest record so the
/// client can render matches without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: String,
    pub industry: Option<String>,
    pub logo_url: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
}

/// A company's expressed interest in a student. The backend keeps exactly
/// one of these per (company, student) pair, so `id` doubles as the
/// company id; everything besides `status` is immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRecord {
    pub id: String,
    #[serde(rename = "companyProfile")]
    pub company: CompanyProfile,
    pub status: InterestStatus,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub internship_details: Option<String>,
    pub message: Option<String>,
}

/// A company's preferred-applicant marking of a student. At most one per
/// (company, student); add/remove are inverse operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistEntry {
    pub student_id: String,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// One entry of the student's application listing. Applications carry no
/// richer status than set membership: applied or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub slot_id: String,
    pub company_id: Option<String>,
}
