use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::identity::CanonicalId;
use crate::models::{ApplicationRecord, InterestRecord, ShortlistEntry};

// --- Collaborator contract ---

/// The marketplace REST surface the client consumes. Everything behind
/// this trait is authoritative; the local cache only papers over it being
/// unreachable or slow.
pub trait MarketplaceBackend {
    /// Current interest records for a student.
    fn fetch_interests(&self, student: &CanonicalId) -> Result<Vec<InterestRecord>>;

    /// Accept a company's interest. One record exists per (company,
    /// student), so the company id addresses it.
    fn accept_interest(&self, company_id: &str) -> Result<()>;

    /// Decline a company's interest.
    fn decline_interest(&self, company_id: &str) -> Result<()>;

    /// Add a student to a company's preferred applicants.
    fn add_shortlist(
        &self,
        company: &CanonicalId,
        student_id: &str,
        notes: Option<&str>,
    ) -> Result<ShortlistEntry>;

    /// Remove a student from a company's preferred applicants.
    fn remove_shortlist(&self, company: &CanonicalId, student_id: &str) -> Result<()>;

    /// Submit an application for a company's internship slot. The backend
    /// rejects with a structured message when the slot is closed, full,
    /// or already applied to.
    fn submit_application(&self, company_id: &str, slot_id: &str) -> Result<()>;

    /// The student's submitted applications, used to seed the applied-set.
    fn fetch_applications(&self, student: &CanonicalId) -> Result<Vec<ApplicationRecord>>;
}

// --- HTTP implementation ---

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// The interest listing is the first thing every screen waits on, so it
// races against a tighter deadline and falls back to cache on loss.
const LISTING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShortlistRequest<'a> {
    student_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationRequest<'a> {
    company_id: &'a str,
    slot_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(anyhow!("{}", error_message(status, &body)))
    }
}

/// The backend's `message` field is shown to the user verbatim when
/// present; anything else gets the generic fallback.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed ({})", status))
}

impl MarketplaceBackend for HttpBackend {
    fn fetch_interests(&self, student: &CanonicalId) -> Result<Vec<InterestRecord>> {
        let request = self
            .client
            .get(self.url(&format!("/students/{}/interests", student)))
            .timeout(LISTING_TIMEOUT);
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?
            .json()
            .context("Failed to parse interest listing")
    }

    fn accept_interest(&self, company_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/interests/{}/accept", company_id)));
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?;
        Ok(())
    }

    fn decline_interest(&self, company_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/interests/{}/decline", company_id)));
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?;
        Ok(())
    }

    fn add_shortlist(
        &self,
        company: &CanonicalId,
        student_id: &str,
        notes: Option<&str>,
    ) -> Result<ShortlistEntry> {
        let request = self
            .client
            .post(self.url(&format!("/companies/{}/shortlist", company)))
            .json(&ShortlistRequest { student_id, notes });
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?
            .json()
            .context("Failed to parse shortlist entry")
    }

    fn remove_shortlist(&self, company: &CanonicalId, student_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/companies/{}/shortlist/{}", company, student_id)));
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?;
        Ok(())
    }

    fn submit_application(&self, company_id: &str, slot_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("/applications"))
            .json(&ApplicationRequest {
                company_id,
                slot_id,
            });
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?;
        Ok(())
    }

    fn fetch_applications(&self, student: &CanonicalId) -> Result<Vec<ApplicationRecord>> {
        let request = self
            .client
            .get(self.url(&format!("/students/{}/applications", student)));
        let response = self
            .authed(request)
            .send()
            .context("Failed to reach marketplace backend")?;
        Self::check(response)?
            .json()
            .context("Failed to parse application listing")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InterestStatus;

    #[test]
    fn test_error_message_uses_backend_message_verbatim() {
        let msg = error_message(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "Application deadline has passed"}"#,
        );
        assert_eq!(msg, "Application deadline has passed");
    }

    #[test]
    fn test_error_message_falls_back_on_missing_message() {
        let msg = error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "boom"}"#);
        assert_eq!(msg, "Request failed (500 Internal Server Error)");
    }

    #[test]
    fn test_error_message_falls_back_on_non_json_body() {
        let msg = error_message(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(msg, "Request failed (502 Bad Gateway)");
    }

    #[test]
    fn test_error_message_falls_back_on_blank_message() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"message": "  "}"#);
        assert_eq!(msg, "Request failed (400 Bad Request)");
    }

    #[test]
    fn test_interest_record_wire_shape() {
        let json = r#"{
            "id": "c1",
            "companyProfile": {
                "name": "Acme Robotics",
                "industry": "Robotics",
                "location": "Rotterdam",
                "logoUrl": null,
                "size": "50-200",
                "description": "We build arms.",
                "contactEmail": "jobs@acme.example"
            },
            "status": "pending",
            "skillsRequired": ["rust", "ros"],
            "internshipDetails": "6 months, paid",
            "message": "We liked your profile."
        }"#;

        let record: InterestRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "c1");
        assert_eq!(record.status, InterestStatus::Pending);
        assert_eq!(record.company.name, "Acme Robotics");
        assert_eq!(record.skills_required, vec!["rust", "ros"]);
    }

    #[test]
    fn test_interest_record_tolerates_missing_skills() {
        let json = r#"{
            "id": "c2",
            "companyProfile": {
                "name": "Tiny Co",
                "industry": null,
                "location": null,
                "logoUrl": null,
                "size": null,
                "description": null,
                "contactEmail": null
            },
            "status": "accepted",
            "internshipDetails": null,
            "message": null
        }"#;

        let record: InterestRecord = serde_json::from_str(json).unwrap();
        assert!(record.skills_required.is_empty());
        assert_eq!(record.status, InterestStatus::Accepted);
    }
}
