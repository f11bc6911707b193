use reqwest::Method;
use serde::Serialize;
use tracing::{debug, error};

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{ChatPartner, Message, MessageId};

pub struct Messaging<'a> {
    pub(super) client: &'a ApiClient,
}

#[derive(Serialize)]
struct SendMessage<'r> {
    receiver_id: i64,
    content: &'r str,
}

impl<'a> Messaging<'a> {
    pub async fn partners(&self) -> ApiResult<Vec<ChatPartner>> {
        self.client
            .get_json("/messaging/partners", "Failed to fetch chat partners")
            .await
    }

    pub async fn messages(&self, partner_id: i64) -> ApiResult<Vec<Message>> {
        let messages: Vec<Message> = self
            .client
            .get_json(
                &format!("/messaging/messages/{}", partner_id),
                &format!("Failed to fetch messages for partner {}", partner_id),
            )
            .await?;
        debug!("Fetched {} messages with partner {}", messages.len(), partner_id);
        Ok(messages)
    }

    pub async fn send(&self, receiver_id: i64, content: &str) -> ApiResult<Message> {
        self.client
            .send_json(
                Method::POST,
                "/messaging/messages",
                &SendMessage { receiver_id, content },
                "Failed to send message",
            )
            .await
            .map_err(|err| {
                error!("Failed to send message to {}: {}", receiver_id, err);
                err
            })
    }

    pub async fn mark_read(&self, message_id: &MessageId) -> ApiResult<()> {
        let id = match message_id {
            MessageId::Server(id) => *id,
            // never reached the server, nothing to mark
            MessageId::Pending(_) => return Err(ApiError::NotFound),
        };
        self.client
            .send_empty(
                Method::PUT,
                &format!("/messaging/messages/{}/read", id),
                "Failed to mark message as read",
            )
            .await
    }
}
