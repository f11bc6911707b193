use reqwest::Method;
use tracing::{info, warn};

use super::ApiClient;
use crate::error::ApiResult;
use crate::models::DiseaseThreshold;
use crate::vitals::reference_thresholds;

pub struct Thresholds<'a> {
    pub(super) client: &'a ApiClient,
}

impl<'a> Thresholds<'a> {
    /// Configured thresholds, or the built-in reference table when the
    /// endpoint is unavailable.
    pub async fn list(&self) -> Vec<DiseaseThreshold> {
        match self
            .client
            .get_json::<Vec<DiseaseThreshold>>("/disease-thresholds", "Failed to fetch thresholds")
            .await
        {
            Ok(thresholds) => {
                info!("Fetched {} disease thresholds", thresholds.len());
                thresholds
            }
            Err(err) => {
                warn!("Threshold endpoint unavailable ({}), using reference table", err);
                reference_thresholds()
            }
        }
    }

    pub async fn get(&self, id: i64) -> Option<DiseaseThreshold> {
        match self
            .client
            .get_json::<DiseaseThreshold>(&format!("/disease-thresholds/{}", id), "Failed to fetch threshold")
            .await
        {
            Ok(threshold) => Some(threshold),
            Err(err) => {
                warn!("Could not fetch threshold {} ({}), using reference table", id, err);
                reference_thresholds().into_iter().find(|t| t.id == id)
            }
        }
    }

    pub async fn for_disease(&self, disease: &str) -> ApiResult<Vec<DiseaseThreshold>> {
        let builder = self
            .client
            .request_segments(Method::GET, &["disease-thresholds", "disease", disease])?;
        let res = self
            .client
            .execute(builder, "Failed to fetch disease thresholds")
            .await?;
        ApiClient::decode(res).await
    }
}
