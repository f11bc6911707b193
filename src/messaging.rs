//! Inbox state and the polling/optimistic-send flow around it.
//!
//! [`Inbox`] is plain state with no I/O so the send and rollback rules can be
//! checked directly. [`MessagingSession`] drives an inbox against the API.

use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{parse_timestamp, ChatPartner, Message, MessageId, User};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// An optimistic message waiting for the server's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub id: MessageId,
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct Inbox {
    current_user: Option<User>,
    partners: Vec<ChatPartner>,
    selected: Option<i64>,
    messages: Vec<Message>,
    pub draft: String,
    error: Option<String>,
}

impl Inbox {
    pub fn new(current_user: Option<User>) -> Self {
        Inbox {
            current_user,
            ..Default::default()
        }
    }

    pub fn partners(&self) -> &[ChatPartner] {
        &self.partners
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn selected(&self) -> Option<&ChatPartner> {
        let id = self.selected?;
        self.partners.iter().find(|p| p.id == id)
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.selected
    }

    /// Replaces the partner list, newest conversation first. Partners that
    /// have never exchanged a message go last.
    pub fn set_partners(&mut self, mut partners: Vec<ChatPartner>) {
        partners.sort_by(compare_by_last_message);
        self.partners = partners;
    }

    /// Returns true when the selection changed. Selecting the current partner
    /// again is a no-op so an open conversation is not reloaded.
    pub fn select(&mut self, partner_id: i64) -> bool {
        if self.selected == Some(partner_id) {
            return false;
        }
        self.selected = Some(partner_id);
        self.messages.clear();
        self.error = None;
        true
    }

    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Appends the draft as an optimistic message and clears the draft.
    /// Nothing happens for a blank draft, without a selected partner, or
    /// without a logged-in user.
    pub fn begin_send(&mut self) -> Option<PendingSend> {
        if self.draft.trim().is_empty() {
            return None;
        }
        let (sender_id, sender_role) = self.current_user.as_ref().map(|u| (u.id, u.role))?;
        let partner_id = self.selected?;
        let receiver_role = self.selected().map(|p| p.role);

        let content = std::mem::take(&mut self.draft);
        let pending = PendingSend {
            id: MessageId::pending(),
            receiver_id: partner_id,
            content: content.clone(),
        };
        self.messages.push(Message {
            id: pending.id.clone(),
            sender_id,
            receiver_id: partner_id,
            sender_role: Some(sender_role),
            receiver_role,
            content,
            timestamp: Utc::now().to_rfc3339(),
            is_read: false,
        });
        Some(pending)
    }

    pub fn confirm_send(&mut self, pending: &PendingSend, confirmed: Message) {
        match self.messages.iter_mut().find(|m| m.id == pending.id) {
            Some(slot) => *slot = confirmed,
            // a poll replaced the list while the send was in flight
            None => {
                if !self.messages.iter().any(|m| m.id == confirmed.id) {
                    self.messages.push(confirmed);
                }
            }
        }
    }

    /// Drops the optimistic message and puts its text back in the draft.
    pub fn fail_send(&mut self, pending: PendingSend, error: impl Into<String>) {
        self.messages.retain(|m| m.id != pending.id);
        self.draft = pending.content;
        self.error = Some(error.into());
    }

    pub fn unread_from(&self, partner_id: i64) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id == partner_id && !m.is_read)
            .count()
    }
}

fn compare_by_last_message(a: &ChatPartner, b: &ChatPartner) -> Ordering {
    let a_ts = a.last_message_timestamp.as_deref().and_then(parse_timestamp);
    let b_ts = b.last_message_timestamp.as_deref().and_then(parse_timestamp);
    match (a_ts, b_ts) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct MessagingSession {
    client: ApiClient,
    inbox: Inbox,
    visible: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl MessagingSession {
    pub fn new(client: ApiClient, current_user: User) -> Self {
        MessagingSession {
            client,
            inbox: Inbox::new(Some(current_user)),
            visible: Arc::new(AtomicBool::new(true)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Shared flag; polling skips its reload while this is false.
    pub fn visibility(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.visible)
    }

    pub async fn load_partners(&mut self) -> ApiResult<()> {
        match self.client.messaging().partners().await {
            Ok(partners) => {
                self.inbox.set_partners(partners);
                Ok(())
            }
            Err(err) => {
                error!("Error loading chat partners: {}", err);
                self.inbox.set_error(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn select(&mut self, partner_id: i64) -> ApiResult<()> {
        if self.inbox.select(partner_id) {
            self.load_messages().await?;
        }
        Ok(())
    }

    /// Reloads the open conversation, then the partner list so unread
    /// counts and previews follow.
    pub async fn load_messages(&mut self) -> ApiResult<()> {
        let partner_id = self.inbox.selected_id().ok_or(ApiError::NotFound)?;
        match self.client.messaging().messages(partner_id).await {
            Ok(messages) => self.inbox.set_messages(messages),
            Err(err) => {
                error!("Error loading messages: {}", err);
                self.inbox.set_error(err.to_string());
                return Err(err);
            }
        }
        self.load_partners().await
    }

    /// Sends `text` to the selected partner with an optimistic append.
    /// Returns `Ok(None)` when there was nothing to send.
    pub async fn send(&mut self, text: &str) -> ApiResult<Option<Message>> {
        self.inbox.draft = text.to_string();
        let pending = match self.inbox.begin_send() {
            Some(pending) => pending,
            None => return Ok(None),
        };

        match self
            .client
            .messaging()
            .send(pending.receiver_id, &pending.content)
            .await
        {
            Ok(message) => {
                self.inbox.confirm_send(&pending, message.clone());
                if let Err(err) = self.load_partners().await {
                    warn!("Sent, but could not refresh partners: {}", err);
                }
                Ok(Some(message))
            }
            Err(err) => {
                self.inbox.fail_send(pending, err.to_string());
                Err(err)
            }
        }
    }

    /// Reloads the selected conversation every poll interval until
    /// `shutdown` flips to true. `on_update` sees the inbox after each reload.
    pub async fn poll_until<F>(&mut self, mut shutdown: watch::Receiver<bool>, mut on_update: F)
    where
        F: FnMut(&Inbox),
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the conversation was loaded on selection
        ticker.tick().await;

        info!("Polling messages every {:?}", self.poll_interval);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.visible.load(AtomicOrdering::Relaxed) {
                        debug!("Inbox hidden, skipping poll");
                        continue;
                    }
                    if self.inbox.selected_id().is_none() {
                        continue;
                    }
                    match self.load_messages().await {
                        Ok(()) => on_update(&self.inbox),
                        Err(err) => warn!("Poll failed: {}", err),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Message polling stopped");
    }
}

/// `HH:MM` for today, `Yesterday`, otherwise `dd/mm/yyyy`, in `now`'s zone.
pub fn format_partner_timestamp<Tz>(timestamp: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let ts = match parse_timestamp(timestamp) {
        Some(ts) => ts.with_timezone(&now.timezone()),
        None => return String::new(),
    };
    let today = now.date_naive();
    if ts.date_naive() == today {
        ts.format("%H:%M").to_string()
    } else if today.pred_opt() == Some(ts.date_naive()) {
        "Yesterday".to_string()
    } else {
        ts.format("%d/%m/%Y").to_string()
    }
}

pub fn initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let letters: String = match parts.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(2).collect(),
        [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
    };
    letters.to_uppercase()
}
