use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Alert, AlertType, ClinicalOverviewStats, Patient, User, UserRole, VitalSigns,
};
use crate::vitals::{assess, latest_reading, VitalAssessment};

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    /// The backend has no patient profile for this user.
    ProfileNotFound,
    NotPatient,
    Ready(PatientDashboard),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientDashboard {
    pub profile: Patient,
    pub vitals: Vec<VitalSigns>,
    pub latest: Option<VitalSigns>,
    pub assessment: VitalAssessment,
    pub alerts: Vec<Alert>,
}

impl PatientDashboard {
    pub fn active_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| a.is_active())
    }
}

/// Loads what a patient sees on their dashboard. A missing profile is its
/// own outcome, not an error.
pub async fn load_patient_dashboard(client: &ApiClient, user: &User) -> DashboardView {
    if user.role != UserRole::Patient {
        return DashboardView::NotPatient;
    }

    let profile = match client.patients().current_profile().await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            warn!("No patient profile for user {}", user.id);
            return DashboardView::ProfileNotFound;
        }
        Err(err) => {
            error!("Failed to load patient profile: {}", err);
            return DashboardView::Error(err.to_string());
        }
    };

    // vitals and alerts are keyed on the user id, not the profile id
    let vitals = match client.patients().vitals(profile.user_id).await {
        Ok(vitals) => vitals,
        Err(err) => {
            error!("Failed to load vital signs: {}", err);
            return DashboardView::Error(err.to_string());
        }
    };
    let alerts = match client.alerts().for_patient(profile.user_id).await {
        Ok(alerts) => alerts,
        Err(err) => {
            warn!("Alerts unavailable for {}: {}", profile.user_id, err);
            Vec::new()
        }
    };

    let latest = latest_reading(&vitals).cloned();
    let assessment = latest.as_ref().map(assess).unwrap_or_default();
    info!(
        "Dashboard for {}: {} readings, {} alerts",
        profile.display_name(),
        vitals.len(),
        alerts.len()
    );

    DashboardView::Ready(PatientDashboard {
        profile,
        vitals,
        latest,
        assessment,
        alerts,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClinicalOverview {
    pub patients: usize,
    pub active_alerts: usize,
    pub critical_alerts: usize,
    /// Patients per chronic disease, names lowercased.
    pub chronic_diseases: BTreeMap<String, usize>,
}

impl ClinicalOverview {
    pub fn from_records(patients: &[Patient], alerts: &[Alert]) -> Self {
        let active: Vec<&Alert> = alerts.iter().filter(|a| a.is_active()).collect();
        let mut chronic_diseases = BTreeMap::new();
        for disease in patients.iter().flat_map(Patient::chronic_disease_list) {
            *chronic_diseases.entry(disease.to_lowercase()).or_insert(0) += 1;
        }
        ClinicalOverview {
            patients: patients.len(),
            active_alerts: active.len(),
            critical_alerts: active
                .iter()
                .filter(|a| a.alert_type == AlertType::Critical)
                .count(),
            chronic_diseases,
        }
    }
}

impl From<ClinicalOverviewStats> for ClinicalOverview {
    fn from(stats: ClinicalOverviewStats) -> Self {
        ClinicalOverview {
            patients: stats.total_patient_count,
            active_alerts: stats.active_alerts_by_severity.values().sum(),
            critical_alerts: stats
                .active_alerts_by_severity
                .get("red")
                .copied()
                .unwrap_or(0),
            chronic_diseases: stats.chronic_disease_distribution,
        }
    }
}

/// Overview counts from the backend's aggregate endpoint. Older backends
/// lack it; then the first page of `/patient-records` and `/alerts` is
/// counted here, which undercounts past the backend's 100-row page.
pub async fn load_clinical_overview(client: &ApiClient) -> ApiResult<ClinicalOverview> {
    match client.patients().clinical_overview_stats().await {
        Ok(stats) => return Ok(stats.into()),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
        Err(err) => warn!("Clinical overview stats unavailable ({}), counting records", err),
    }
    let patients = client.patients().list().await?;
    let alerts = client.alerts().list().await?;
    Ok(ClinicalOverview::from_records(&patients, &alerts))
}
