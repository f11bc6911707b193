use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[serde(alias = "patient")]
    Patient,
    #[serde(alias = "doctor")]
    Doctor,
    #[serde(alias = "admin")]
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Patient => "PATIENT",
            UserRole::Doctor => "DOCTOR",
            UserRole::Admin => "ADMIN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_code: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatientStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: i64,
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default = "patient_role")]
    pub role: UserRole,
    #[serde(default)]
    pub status: Option<PatientStatus>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub chronic_diseases: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

fn patient_role() -> UserRole {
    UserRole::Patient
}

impl Patient {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Chronic diseases are stored as free text; entries are comma separated.
    pub fn chronic_disease_list(&self) -> Vec<String> {
        self.chronic_diseases
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPatient {
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronic_diseases: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronic_diseases: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, alias = "heart_rate", skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(
        default,
        alias = "oxygen_saturation",
        alias = "spo2",
        skip_serializing_if = "Option::is_none"
    )]
    pub oxygen_saturation: Option<f64>,
    #[serde(default, alias = "respiratory_rate", skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertType {
    #[serde(alias = "red")]
    Critical,
    #[serde(alias = "yellow")]
    Warning,
    #[serde(alias = "blue")]
    Mild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    #[serde(rename = "patientId", alias = "patient_id")]
    pub patient_id: i64,
    #[serde(rename = "type", alias = "severity")]
    pub alert_type: AlertType,
    pub message: String,
    #[serde(alias = "created_at")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<AlertStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_resolved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Alert {
    /// The backend reports resolution either as a status or as an `is_resolved` flag.
    pub fn status(&self) -> AlertStatus {
        match (self.status, self.is_resolved) {
            (Some(status), _) => status,
            (None, Some(true)) => AlertStatus::Resolved,
            _ => AlertStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == AlertStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Server(i64),
    Pending(Uuid),
}

impl MessageId {
    pub fn pending() -> MessageId {
        MessageId::Pending(Uuid::new_v4())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MessageId::Pending(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{id}"),
            MessageId::Pending(id) => write!(f, "temp-{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(alias = "senderId")]
    pub sender_id: i64,
    #[serde(alias = "receiverId")]
    pub receiver_id: i64,
    #[serde(default, alias = "senderRole")]
    pub sender_role: Option<UserRole>,
    #[serde(default, alias = "receiverRole")]
    pub receiver_role: Option<UserRole>,
    pub content: String,
    pub timestamp: String,
    #[serde(default, alias = "isRead")]
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPartner {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<String>,
    #[serde(default, alias = "lastMessageTimestamp")]
    pub last_message_timestamp: Option<String>,
    #[serde(default, alias = "unreadCount")]
    pub unread_count: Option<u32>,
    #[serde(default, alias = "profilePictureUrl")]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NoteType {
    General,
    Prescription,
    Diagnosis,
    Treatment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    #[serde(alias = "patientId")]
    pub patient_id: i64,
    #[serde(alias = "doctorId")]
    pub doctor_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(alias = "note")]
    pub content: String,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(default, rename = "type")]
    pub note_type: Option<NoteType>,
    #[serde(default, alias = "doctorName")]
    pub doctor_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    #[serde(alias = "patientId")]
    pub patient_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMetric {
    HeartRate,
    Temperature,
    Spo2,
    SystolicBp,
    DiastolicBp,
}

impl ThresholdMetric {
    pub const ALL: [ThresholdMetric; 5] = [
        ThresholdMetric::HeartRate,
        ThresholdMetric::Temperature,
        ThresholdMetric::Spo2,
        ThresholdMetric::SystolicBp,
        ThresholdMetric::DiastolicBp,
    ];

    /// Reading for this metric in a vital-signs record, if present.
    pub fn reading(&self, vitals: &VitalSigns) -> Option<f64> {
        match self {
            ThresholdMetric::HeartRate => vitals.heart_rate,
            ThresholdMetric::Temperature => vitals.temperature,
            ThresholdMetric::Spo2 => vitals.oxygen_saturation,
            ThresholdMetric::SystolicBp => vitals.systolic,
            ThresholdMetric::DiastolicBp => vitals.diastolic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseThreshold {
    pub id: i64,
    pub disease: String,
    pub heart_rate_min: f64,
    pub heart_rate_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub spo2_min: f64,
    pub spo2_max: f64,
    pub systolic_bp_min: f64,
    pub systolic_bp_max: f64,
    pub diastolic_bp_min: f64,
    pub diastolic_bp_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSignStat {
    pub month: String,
    pub count: u64,
}

/// Server-side aggregates for the clinical overview. Alert counts are keyed
/// by severity (`red`, `yellow`, `blue`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClinicalOverviewStats {
    pub total_patient_count: usize,
    #[serde(default)]
    pub active_alerts_by_severity: BTreeMap<String, usize>,
    #[serde(default)]
    pub chronic_disease_distribution: BTreeMap<String, usize>,
}

/// Parses backend timestamps. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
