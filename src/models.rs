//! Typed request and response models for the AccuLynx v2 API.
//!
//! Field names follow Rust conventions; the wire names are camelCase and the
//! hypermedia `_link` member is exposed as `link`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeType {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub system_default: bool,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContact {
    pub id: String,
    pub contact: Contact,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub relation_to_primary: Option<String>,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A job record as returned by `GET /jobs` and `GET /jobs/{id}`.
///
/// `id` is the opaque identifier; `job_number` is the human-readable number
/// (e.g. `BNX-5179`) and is absent for jobs that were never numbered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub contacts: Vec<JobContact>,
    #[serde(default)]
    pub location_address: Option<Address>,
    #[serde(default)]
    pub geo_location: Option<GeoLocation>,
    #[serde(default)]
    pub trade_types: Vec<TradeType>,
    #[serde(default)]
    pub job_category: Option<JobCategory>,
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[serde(default)]
    pub lead_source: Option<LeadSource>,
    #[serde(default)]
    pub lead_dead_reason: Option<String>,
    #[serde(default)]
    pub current_milestone: Option<String>,
    #[serde(default, with = "flexible_datetime::option")]
    pub milestone_date: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_datetime::option")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_datetime::option")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub job_number: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Job {
    /// Minimal job with only an id; remaining fields empty.
    pub fn new(id: impl Into<String>) -> Self {
        Job {
            id: id.into(),
            contacts: Vec::new(),
            location_address: None,
            geo_location: None,
            trade_types: Vec::new(),
            job_category: None,
            work_type: None,
            lead_source: None,
            lead_dead_reason: None,
            current_milestone: None,
            milestone_date: None,
            created_date: None,
            modified_date: None,
            job_name: None,
            job_number: None,
            priority: None,
            link: None,
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.job_number = Some(number.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    /// The primary contact of the job, if one is flagged.
    pub fn customer(&self) -> Option<&Contact> {
        self.contacts
            .iter()
            .find(|jc| jc.is_primary)
            .map(|jc| &jc.contact)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub status: String,
    pub source: String,
    pub customer: Customer,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A user referenced by a lead history entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// One action recorded against a lead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadHistory {
    pub id: String,
    pub action: String,
    #[serde(with = "flexible_datetime")]
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<User>,
    #[serde(rename = "_link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Body of `POST /leads` (v1 API). `None` fields are omitted on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_rep_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_type_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl CreateLeadRequest {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        CreateLeadRequest {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }
}

/// Body of `POST /jobs/{id}/payments/received` and `.../paid`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: f64, payment_date: NaiveDate, payment_type: impl Into<String>) -> Self {
        PaymentRequest {
            amount,
            payment_date,
            payment_type: payment_type.into(),
            check_number: None,
            notes: None,
        }
    }

    pub fn with_check_number(mut self, check_number: impl Into<String>) -> Self {
        self.check_number = Some(check_number.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Body of `POST /jobs/{id}/messages`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub message: String,
}

/// Timestamps arrive both as RFC 3339 and as naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// strings; naive values are taken as UTC.
mod flexible_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.is_empty() => Ok(None),
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {}", raw))
                }),
            }
        }
    }
}
