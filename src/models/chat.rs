use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Shared read cursor for the admin pool: every admin reads and replies on
/// behalf of this id, so support-thread read state is shared across admins.
pub const ADMIN_POOL_ID: Uuid = Uuid::from_u128(0xad717_0000_0000_0000_0000);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Restaurant,
    Driver,
    Admin,
}

/// Thread key: order-scoped group chat, or per-user support conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadId {
    Order(Uuid),
    Support(Uuid),
}

#[derive(Debug, Error)]
#[error("invalid thread id: expected order:<uuid> or support:<uuid>")]
pub struct ThreadIdParseError;

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadId::Order(id) => write!(f, "order:{id}"),
            ThreadId::Support(id) => write!(f, "support:{id}"),
        }
    }
}

impl FromStr for ThreadId {
    type Err = ThreadIdParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (kind, id) = raw.split_once(':').ok_or(ThreadIdParseError)?;
        let id = Uuid::parse_str(id).map_err(|_| ThreadIdParseError)?;
        match kind {
            "order" => Ok(ThreadId::Order(id)),
            "support" => Ok(ThreadId::Support(id)),
            _ => Err(ThreadIdParseError),
        }
    }
}

impl Serialize for ThreadId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ThreadId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_type: SenderType,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Insertion sequence, the tie-breaker for equal timestamps.
    pub seq: u64,
}

/// Append-only conversation. Messages are never mutated or deleted;
/// participants are tracked lazily as they send or are referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ThreadId,
    pub participants: HashMap<Uuid, String>,
    pub messages: Vec<ChatMessage>,
    unread: HashMap<Uuid, u32>,
}

impl ChatThread {
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            participants: HashMap::new(),
            messages: Vec::new(),
            unread: HashMap::new(),
        }
    }

    /// Register a referenced participant without overwriting a name they
    /// chose themselves by sending.
    pub fn track(&mut self, participant_id: Uuid, display_name: &str) {
        self.participants
            .entry(participant_id)
            .or_insert_with(|| display_name.to_string());
    }

    /// The id a participant's read state lives under. Admins on support
    /// threads share one cursor.
    fn read_cursor(&self, participant_id: Uuid, sender_type: SenderType) -> Uuid {
        match (self.id, sender_type) {
            (ThreadId::Support(_), SenderType::Admin) => ADMIN_POOL_ID,
            _ => participant_id,
        }
    }

    /// Every read cursor that must be notified of a new message.
    fn recipient_cursors(&self) -> Vec<Uuid> {
        match self.id {
            ThreadId::Support(owner) => vec![owner, ADMIN_POOL_ID],
            ThreadId::Order(_) => self.participants.keys().copied().collect(),
        }
    }

    /// Appends a message with a server-assigned monotonic timestamp and
    /// bumps the unread counter of every recipient except the sender.
    pub fn append(
        &mut self,
        sender_id: Uuid,
        sender_name: String,
        sender_type: SenderType,
        text: String,
    ) -> ChatMessage {
        let last = self.messages.last().map(|m| m.timestamp);
        let timestamp = match last {
            Some(prev) => Utc::now().max(prev),
            None => Utc::now(),
        };

        self.participants.insert(sender_id, sender_name.clone());

        let message = ChatMessage {
            sender_id,
            sender_name,
            sender_type,
            text,
            timestamp,
            seq: self.messages.len() as u64,
        };

        let sender_cursor = self.read_cursor(sender_id, sender_type);
        for cursor in self.recipient_cursors() {
            if cursor != sender_cursor {
                *self.unread.entry(cursor).or_insert(0) += 1;
            }
        }

        self.messages.push(message.clone());
        message
    }

    /// Resets the participant's unread counter. Idempotent.
    pub fn mark_read(&mut self, participant_id: Uuid) {
        self.unread.insert(participant_id, 0);
    }

    pub fn unread_for(&self, participant_id: Uuid) -> u32 {
        self.unread.get(&participant_id).copied().unwrap_or(0)
    }
}

/// Change-feed event published for every appended message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEvent {
    pub thread_id: ThreadId,
    pub message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::{ChatThread, SenderType, ThreadId, ADMIN_POOL_ID};
    use uuid::Uuid;

    #[test]
    fn thread_id_round_trips_through_display() {
        let order = ThreadId::Order(Uuid::new_v4());
        let support = ThreadId::Support(Uuid::new_v4());
        assert_eq!(order.to_string().parse::<ThreadId>().unwrap(), order);
        assert_eq!(support.to_string().parse::<ThreadId>().unwrap(), support);
        assert!("group:123".parse::<ThreadId>().is_err());
        assert!("order:not-a-uuid".parse::<ThreadId>().is_err());
    }

    #[test]
    fn unread_counts_messages_since_last_mark_read() {
        let customer = Uuid::new_v4();
        let restaurant = Uuid::new_v4();
        let mut thread = ChatThread::new(ThreadId::Order(Uuid::new_v4()));
        thread.track(restaurant, "restaurant");

        thread.append(customer, "Ada".into(), SenderType::Customer, "hi".into());
        thread.append(customer, "Ada".into(), SenderType::Customer, "there?".into());
        assert_eq!(thread.unread_for(restaurant), 2);
        assert_eq!(thread.unread_for(customer), 0);

        thread.mark_read(restaurant);
        assert_eq!(thread.unread_for(restaurant), 0);

        thread.append(customer, "Ada".into(), SenderType::Customer, "hello".into());
        assert_eq!(thread.unread_for(restaurant), 1);

        // mark_read is idempotent
        thread.mark_read(restaurant);
        thread.mark_read(restaurant);
        assert_eq!(thread.unread_for(restaurant), 0);
    }

    #[test]
    fn admins_share_one_read_cursor_on_support_threads() {
        let user = Uuid::new_v4();
        let admin_a = Uuid::new_v4();
        let admin_b = Uuid::new_v4();
        let mut thread = ChatThread::new(ThreadId::Support(user));

        thread.append(user, "Kai".into(), SenderType::Customer, "help".into());
        assert_eq!(thread.unread_for(ADMIN_POOL_ID), 1);

        // Any admin reply counts as the pool; no admin sees their own reply
        // as unread, and the user gets exactly one.
        thread.append(admin_a, "Support".into(), SenderType::Admin, "hi".into());
        thread.append(admin_b, "Support".into(), SenderType::Admin, "how can we help".into());
        assert_eq!(thread.unread_for(ADMIN_POOL_ID), 1);
        assert_eq!(thread.unread_for(user), 2);

        thread.mark_read(ADMIN_POOL_ID);
        assert_eq!(thread.unread_for(ADMIN_POOL_ID), 0);
    }

    #[test]
    fn timestamps_never_go_backwards_and_seq_breaks_ties() {
        let sender = Uuid::new_v4();
        let mut thread = ChatThread::new(ThreadId::Support(sender));

        for i in 0..10 {
            thread.append(sender, "Kai".into(), SenderType::Customer, format!("m{i}"));
        }

        for pair in thread.messages.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
            assert_eq!(pair[1].seq, pair[0].seq + 1);
        }
    }

    #[test]
    fn sender_display_name_wins_over_referenced_placeholder() {
        let customer = Uuid::new_v4();
        let mut thread = ChatThread::new(ThreadId::Order(Uuid::new_v4()));

        thread.track(customer, "customer");
        thread.append(customer, "Ada".into(), SenderType::Customer, "hi".into());
        assert_eq!(thread.participants[&customer], "Ada");
    }
}
