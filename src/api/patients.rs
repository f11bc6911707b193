use reqwest::Method;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ClinicalOverviewStats, NewPatient, Patient, PatientUpdate, VitalSignStat, VitalSigns,
};

pub struct Patients<'a> {
    pub(super) client: &'a ApiClient,
}

#[derive(Serialize)]
struct PairRequest<'r> {
    doctor_code: &'r str,
}

impl<'a> Patients<'a> {
    pub async fn list(&self) -> ApiResult<Vec<Patient>> {
        self.client
            .get_json("/patient-records", "Failed to fetch patients")
            .await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Patient> {
        self.client
            .get_json(&format!("/patient-records/{}", id), "Failed to fetch patient")
            .await
    }

    /// The caller's own patient profile. `Ok(None)` when the backend has no
    /// profile for this user (404 or 422).
    pub async fn current_profile(&self) -> ApiResult<Option<Patient>> {
        match self
            .client
            .get_json("/patient-records/me", "Failed to fetch current patient profile")
            .await
        {
            Ok(profile) => Ok(Some(profile)),
            Err(err) if err.is_not_found() => {
                debug!("No patient profile for the current user");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn create(&self, patient: &NewPatient) -> ApiResult<Patient> {
        let created: Patient = self
            .client
            .send_json(Method::POST, "/patient-records", patient, "Failed to create patient")
            .await?;
        info!("Created patient record for {}", created.email);
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &PatientUpdate) -> ApiResult<Patient> {
        self.client
            .send_json(
                Method::PUT,
                &format!("/patient-records/{}", id),
                update,
                "Failed to update patient",
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.client
            .send_empty(Method::DELETE, &format!("/patient-records/{}", id), "Failed to delete patient")
            .await
    }

    /// Vital-sign history for a patient. Older deployments expose the series
    /// under different paths, so each known path is tried in turn.
    pub async fn vitals(&self, patient_id: i64) -> ApiResult<Vec<VitalSigns>> {
        let paths = [
            format!("/patient-records/{}/vitals/", patient_id),
            format!("/patient-records/{}/vitals", patient_id),
            format!("/patients/{}/vitals", patient_id),
        ];

        let mut last_err: Option<ApiError> = None;
        for path in &paths {
            match self.client.get_json(path, "Failed to fetch vital signs").await {
                Ok(vitals) => return Ok(vitals),
                // a bad token fails the same way on every path
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                Err(err) => {
                    warn!("Vital signs endpoint {} failed: {}", path, err);
                    last_err = Some(err);
                }
            }
        }
        error!("All vital signs endpoints failed for patient {}", patient_id);
        Err(last_err.unwrap_or(ApiError::NotFound))
    }

    pub async fn add_vitals(&self, patient_id: i64, vitals: &VitalSigns) -> ApiResult<VitalSigns> {
        self.client
            .send_json(
                Method::POST,
                &format!("/patient-records/{}/vitals", patient_id),
                vitals,
                "Failed to add vital signs",
            )
            .await
    }

    pub async fn vital_stats(&self) -> ApiResult<Vec<VitalSignStat>> {
        self.client
            .get_json(
                "/patient-records/vital-signs/stats",
                "Failed to fetch vital signs activity stats",
            )
            .await
    }

    pub async fn clinical_overview_stats(&self) -> ApiResult<ClinicalOverviewStats> {
        self.client
            .get_json(
                "/patient-records/clinical-overview/stats",
                "Failed to fetch clinical overview statistics",
            )
            .await
    }

    pub async fn doctor_patients(&self) -> ApiResult<Vec<Patient>> {
        self.client
            .get_json("/doctors/me/patients", "Failed to fetch doctor patients")
            .await
    }

    pub async fn pair_with_doctor(&self, doctor_code: &str) -> ApiResult<serde_json::Value> {
        self.client
            .send_json(
                Method::POST,
                "/pair/pair-with-doctor",
                &PairRequest { doctor_code },
                "Failed to pair with doctor",
            )
            .await
    }
}
