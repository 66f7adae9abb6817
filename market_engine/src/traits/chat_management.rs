use crate::{
    db_types::{Chat, MemberPair, Message, NewMessage, ObjectId},
    traits::MarketError,
};

/// Two-party chats.
///
/// The backend keeps one invariant across chats and messages: `chat.unread_by[m]` only goes up when a message for `m`
/// is written, and goes back to zero when `m` marks the chat as read.
#[allow(async_fn_in_trait)]
pub trait ChatManagement {
    /// Returns the chat for this pair of users, creating it (with both unread counts at zero) if it does not exist.
    /// The flag is `true` when the chat was created by this call.
    ///
    /// Concurrent calls for the same pair return the same chat.
    ///
    /// ## Failure modes:
    /// - `NotFound` if either user does not exist.
    async fn create_or_get_chat(&self, members: MemberPair) -> Result<(Chat, bool), MarketError>;

    async fn fetch_chat(&self, chat_id: &ObjectId) -> Result<Option<Chat>, MarketError>;

    /// Chats the user is a member of, most recently updated first.
    async fn fetch_chats_for_member(&self, member: &ObjectId) -> Result<Vec<Chat>, MarketError>;

    /// Stores the message (read by its sender), updates the chat's last-message preview and timestamp, and adds one to
    /// the other member's unread count. All in one transaction.
    ///
    /// ## Failure modes:
    /// - `NotFound` if the chat does not exist.
    /// - `Unauthorized` if the sender is not a member of the chat.
    async fn insert_message(&self, message: NewMessage) -> Result<(Message, Chat), MarketError>;

    /// The newest messages in the chat, newest first, at most `limit` of them.
    async fn fetch_messages(&self, chat_id: &ObjectId, limit: i64) -> Result<Vec<Message>, MarketError>;

    /// Adds `reader` to the read receipts of the chat's messages and resets the reader's unread count to zero.
    ///
    /// If `upto` names a message in this chat, only messages up to and including it are marked. Otherwise every
    /// message is. Returns the number of messages that gained a receipt. Calling this twice has the same effect as
    /// calling it once.
    ///
    /// ## Failure modes:
    /// - `NotFound` if the chat does not exist.
    /// - `Unauthorized` if the reader is not a member of the chat.
    async fn mark_read(&self, chat_id: &ObjectId, reader: &ObjectId, upto: Option<ObjectId>)
        -> Result<u64, MarketError>;
}
