use std::fmt::Debug;

use log::*;

use super::{page_limit, validate_text};
use crate::{
    db_types::{Chat, MemberPair, Message, NewMessage, ObjectId},
    events::{EventProducers, MessageSentEvent},
    helpers::KeyLocks,
    traits::{ChatManagement, MarketError},
};

/// `ChatApi` manages two-party chats. It keeps each member's unread counter consistent with the read receipts on the
/// chat's messages: sending a message bumps the other member's counter, and marking the chat as read adds receipts and
/// resets the reader's counter.
pub struct ChatApi<B> {
    db: B,
    producers: EventProducers,
    locks: KeyLocks,
}

impl<B> Debug for ChatApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChatApi")
    }
}

impl<B> ChatApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, locks: KeyLocks::default() }
    }

    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ChatApi<B>
where B: ChatManagement
{
    /// Returns the chat between `user_id` and `peer_id`, creating it if necessary. The flag is `true` if the chat was
    /// created by this call. The order of the two users does not matter.
    pub async fn create_or_get_chat(
        &self,
        user_id: &ObjectId,
        peer_id: &ObjectId,
    ) -> Result<(Chat, bool), MarketError> {
        let members = MemberPair::new(user_id.clone(), peer_id.clone())
            .ok_or_else(|| MarketError::ValidationFailed("You cannot start a chat with yourself".into()))?;
        let (chat, created) = self.db.create_or_get_chat(members).await?;
        if created {
            info!("💬️ Chat {} created between {user_id} and {peer_id}", chat.id);
        } else {
            trace!("💬️ Found existing chat {} between {user_id} and {peer_id}", chat.id);
        }
        Ok((chat, created))
    }

    pub async fn chats_for_user(&self, user_id: &ObjectId) -> Result<Vec<Chat>, MarketError> {
        self.db.fetch_chats_for_member(user_id).await
    }

    /// Stores the message and adds one to the other member's unread count.
    pub async fn send_message(
        &self,
        chat_id: &ObjectId,
        sender_id: &ObjectId,
        text: String,
    ) -> Result<Message, MarketError> {
        validate_text("Message text", &text)?;
        let _guard = self.locks.lock(KeyLocks::chat_key(chat_id)).await;
        let message = NewMessage { chat_id: chat_id.clone(), sender_id: sender_id.clone(), text };
        let (message, chat) = self.db.insert_message(message).await?;
        debug!("💬️ Message {} sent by {sender_id} in chat {chat_id}", message.id);
        self.call_message_sent_hook(&message, &chat).await;
        Ok(message)
    }

    /// The newest messages in the chat, newest first. Only members of the chat may read them.
    pub async fn messages(
        &self,
        chat_id: &ObjectId,
        user_id: &ObjectId,
        limit: i64,
    ) -> Result<Vec<Message>, MarketError> {
        let chat = self.member_chat(chat_id, user_id).await?;
        self.db.fetch_messages(&chat.id, page_limit(limit)).await
    }

    /// Marks the chat's messages as read by `reader_id`, up to and including `upto` if it names a message in the chat,
    /// and resets the reader's unread count. Returns the number of messages that gained a read receipt.
    pub async fn mark_read(
        &self,
        chat_id: &ObjectId,
        reader_id: &ObjectId,
        upto: Option<ObjectId>,
    ) -> Result<u64, MarketError> {
        let _guard = self.locks.lock(KeyLocks::chat_key(chat_id)).await;
        let marked = self.db.mark_read(chat_id, reader_id, upto).await?;
        debug!("💬️ {reader_id} read {marked} new messages in chat {chat_id}");
        Ok(marked)
    }

    async fn member_chat(&self, chat_id: &ObjectId, user_id: &ObjectId) -> Result<Chat, MarketError> {
        let chat =
            self.db.fetch_chat(chat_id).await?.ok_or_else(|| MarketError::NotFound(format!("Chat {chat_id}")))?;
        if !chat.is_member(user_id) {
            warn!("💬️ {user_id} tried to read chat {chat_id}, but is not a member");
            return Err(MarketError::Unauthorized(format!("{user_id} is not a member of chat {chat_id}")));
        }
        Ok(chat)
    }

    async fn call_message_sent_hook(&self, message: &Message, chat: &Chat) {
        for emitter in &self.producers.message_sent_producer {
            debug!("💬️ Notifying message sent hook subscribers");
            let event = MessageSentEvent { message: message.clone(), chat: chat.clone() };
            emitter.publish_event(event).await;
        }
    }
}
