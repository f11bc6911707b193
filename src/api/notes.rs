use reqwest::Method;
use serde::Serialize;

use super::ApiClient;
use crate::error::ApiResult;
use crate::models::Note;

pub struct Notes<'a> {
    pub(super) client: &'a ApiClient,
}

#[derive(Serialize)]
struct NewNote<'r> {
    patient_id: i64,
    note: &'r str,
}

impl<'a> Notes<'a> {
    pub async fn for_patient(&self, patient_id: i64) -> ApiResult<Vec<Note>> {
        self.client
            .get_json(&format!("/notes/{}", patient_id), "Failed to fetch notes")
            .await
    }

    pub async fn add(&self, patient_id: i64, content: &str) -> ApiResult<Note> {
        self.client
            .send_json(
                Method::POST,
                "/notes/add",
                &NewNote { patient_id, note: content },
                "Failed to add note",
            )
            .await
    }
}
