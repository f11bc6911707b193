use super::ApiClient;
use crate::error::ApiResult;
use crate::models::Location;

pub struct Locations<'a> {
    pub(super) client: &'a ApiClient,
}

impl<'a> Locations<'a> {
    pub async fn list(&self) -> ApiResult<Vec<Location>> {
        self.client.get_json("/locations", "Failed to fetch locations").await
    }

    pub async fn for_patient(&self, patient_id: i64) -> ApiResult<Location> {
        self.client
            .get_json(
                &format!("/patients/{}/location", patient_id),
                "Failed to fetch patient location",
            )
            .await
    }
}
