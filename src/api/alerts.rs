use reqwest::Method;
use tracing::debug;

use super::ApiClient;
use crate::error::ApiResult;
use crate::models::Alert;

pub struct Alerts<'a> {
    pub(super) client: &'a ApiClient,
}

impl<'a> Alerts<'a> {
    pub async fn list(&self) -> ApiResult<Vec<Alert>> {
        self.client.get_json("/alerts", "Failed to fetch alerts").await
    }

    pub async fn active(&self) -> ApiResult<Vec<Alert>> {
        let builder = self
            .client
            .request(Method::GET, "/alerts")
            .query(&[("status", "ACTIVE")]);
        let res = self.client.execute(builder, "Failed to fetch active alerts").await?;
        let alerts: Vec<Alert> = ApiClient::decode(res).await?;
        // not every backend honours the filter
        let active: Vec<Alert> = alerts.into_iter().filter(Alert::is_active).collect();
        debug!("{} active alerts", active.len());
        Ok(active)
    }

    pub async fn for_patient(&self, patient_id: i64) -> ApiResult<Vec<Alert>> {
        self.client
            .get_json(
                &format!("/alerts/patient/{}", patient_id),
                "Failed to fetch alerts for patient",
            )
            .await
    }

    pub async fn resolve(&self, alert_id: i64) -> ApiResult<Alert> {
        let res = self
            .client
            .execute(
                self.client.request(Method::PUT, &format!("/alerts/{}/resolve", alert_id)),
                "Failed to resolve alert",
            )
            .await?;
        ApiClient::decode(res).await
    }
}
