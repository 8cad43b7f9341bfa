use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::case::{Case, CaseStatus};
use crate::evidence::EvidenceItem;

pub const SUPPORTED_PLATFORMS: &[&str] = &[
    "Twitter/X",
    "Facebook",
    "Instagram",
    "TikTok",
    "YouTube",
    "Telegram",
    "WhatsApp",
    "Reddit",
    "Threads",
    "VK",
    "Snapchat",
    "Website/Blog",
    "News Site",
    "Other",
];

/// Tags offered by the intake form. Free-form tags are still accepted.
pub const EVIDENCE_TAGS: &[&str] = &[
    "Slurs/Epithets",
    "Threats of Violence",
    "Incitement to Violence",
    "Vandalism/Destruction",
    "Doxxing/Personal Info",
    "Holocaust Denial",
    "Blood Libel",
    "Conspiracy Theories",
    "Hate Symbol/Imagery",
    "Harassment Campaign",
    "Other",
];

const TITLE_LEN: (usize, usize) = (5, 200);
const DESCRIPTION_LEN: (usize, usize) = (10, 2000);
/// Real-world offsets run from UTC-12:00 to UTC+14:00.
const UTC_OFFSET_MINUTES: (i32, i32) = (-12 * 60, 14 * 60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("title must be {min}-{max} characters")]
    Title { min: usize, max: usize },

    #[error("description must be {min}-{max} characters")]
    Description { min: usize, max: usize },

    #[error("unsupported platform {0:?}")]
    Platform(String),

    #[error("invalid URL {0:?}")]
    Url(String),

    #[error("at least one tag is required")]
    NoTags,

    #[error("invalid contact email {0:?}")]
    Contact(String),

    #[error("consent is required to proceed")]
    NoConsent,

    #[error("UTC offset {0} minutes is out of range")]
    UtcOffset(i32),
}

/// Reporter-supplied form values, as posted by the intake form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSubmission {
    pub title: String,
    pub platform: String,
    #[serde(default)]
    pub url: Option<String>,
    pub date_observed: NaiveDate,
    /// Wall-clock time of the observation. Read as UTC (the form labels the
    /// field that way) unless `utc_offset_minutes` says otherwise.
    pub time_observed: NaiveTime,
    /// Reporter's offset from UTC, e.g. `120` for UTC+02:00.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub reporter_contact: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub consent: bool,
}

impl CaseSubmission {
    /// Checks every field; the first problem found is returned.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        let title_len = self.title.trim().chars().count();
        if title_len < TITLE_LEN.0 || title_len > TITLE_LEN.1 {
            return Err(SubmissionError::Title {
                min: TITLE_LEN.0,
                max: TITLE_LEN.1,
            });
        }

        if !SUPPORTED_PLATFORMS.contains(&self.platform.as_str()) {
            return Err(SubmissionError::Platform(self.platform.clone()));
        }

        if let Some(url) = self.url() {
            if !is_valid_url(url) {
                return Err(SubmissionError::Url(url.to_string()));
            }
        }

        let description_len = self.description.trim().chars().count();
        if description_len < DESCRIPTION_LEN.0 || description_len > DESCRIPTION_LEN.1 {
            return Err(SubmissionError::Description {
                min: DESCRIPTION_LEN.0,
                max: DESCRIPTION_LEN.1,
            });
        }

        if self.tags.iter().all(|t| t.trim().is_empty()) {
            return Err(SubmissionError::NoTags);
        }

        if let Some(contact) = self.contact() {
            if !looks_like_email(contact) {
                return Err(SubmissionError::Contact(contact.to_string()));
            }
        }

        if let Some(offset) = self.utc_offset_minutes {
            if offset < UTC_OFFSET_MINUTES.0 || offset > UTC_OFFSET_MINUTES.1 {
                return Err(SubmissionError::UtcOffset(offset));
            }
        }

        if !self.consent {
            return Err(SubmissionError::NoConsent);
        }
        Ok(())
    }

    /// Observation time normalised to UTC.
    pub fn observed_utc(&self) -> NaiveDateTime {
        let local = self.date_observed.and_time(self.time_observed);
        local - Duration::minutes(i64::from(self.utc_offset_minutes.unwrap_or(0)))
    }

    /// The URL, with an empty field treated as absent.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    fn contact(&self) -> Option<&str> {
        if self.anonymous {
            return None;
        }
        self.reporter_contact
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Turns validated form values plus hashed evidence into a new case.
    ///
    /// A URL in the form becomes a `url_snapshot` evidence item appended
    /// after the uploaded files.
    pub fn into_case(
        self,
        id: String,
        mut evidence: Vec<EvidenceItem>,
        now: DateTime<Utc>,
    ) -> Result<Case, SubmissionError> {
        self.validate()?;

        let date_observed = self.observed_utc();
        let url = self.url().map(str::to_string);
        if let Some(url) = &url {
            evidence.push(EvidenceItem::url_snapshot(url, &extract_domain(url)));
        }
        let contact = self.contact().map(str::to_string);
        let tags = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut case = Case {
            id,
            title: self.title.trim().to_string(),
            platform: self.platform,
            url,
            date_observed,
            description: self.description.trim().to_string(),
            location: self.location.filter(|l| !l.trim().is_empty()),
            tags,
            jurisdiction: self.jurisdiction.filter(|j| !j.trim().is_empty()),
            anonymous: self.anonymous,
            contact,
            evidence,
            status: CaseStatus::Submitted,
            timeline: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        case.advance(
            CaseStatus::Submitted,
            "Case created",
            "Evidence submitted and case ID assigned",
            now,
        );
        Ok(case)
    }
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Host part of a URL, or an empty string when it does not parse.
pub fn extract_domain(s: &str) -> String {
    Url::parse(s)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}
