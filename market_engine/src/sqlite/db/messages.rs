use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{Message, ObjectId};

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub seq: i64,
    pub id: ObjectId,
    pub chat_id: ObjectId,
    pub sender_id: ObjectId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self, read_by: BTreeSet<ObjectId>) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            text: self.text,
            created_at: self.created_at,
            read_by,
        }
    }
}

#[derive(FromRow)]
struct ReadRow {
    message_id: ObjectId,
    reader_id: ObjectId,
}

/// Stores the message and records its sender as the first reader.
pub async fn insert_message(message: &Message, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let seq: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO messages (id, chat_id, sender_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING seq;
        "#,
    )
    .bind(&message.id)
    .bind(&message.chat_id)
    .bind(&message.sender_id)
    .bind(&message.text)
    .bind(message.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for reader in &message.read_by {
        sqlx::query("INSERT OR IGNORE INTO message_reads (message_id, reader_id) VALUES ($1, $2)")
            .bind(&message.id)
            .bind(reader)
            .execute(&mut *conn)
            .await?;
    }
    trace!("💬️ Message {} stored in chat {} as #{seq}", message.id, message.chat_id);
    Ok(seq)
}

/// Looks the message up, but only if it belongs to the given chat.
pub async fn fetch_message_in_chat(
    chat_id: &ObjectId,
    message_id: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<Option<MessageRow>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM messages WHERE id = $1 AND chat_id = $2")
        .bind(message_id)
        .bind(chat_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// The newest messages in the chat, newest first.
pub async fn fetch_messages(
    chat_id: &ObjectId,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows: Vec<MessageRow> = sqlx::query_as(
        r#"
            SELECT * FROM messages
            WHERE chat_id = $1
            ORDER BY seq DESC
            LIMIT $2;
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    let oldest = match rows.last() {
        Some(row) => row.seq,
        None => return Ok(vec![]),
    };
    let reads: Vec<ReadRow> = sqlx::query_as(
        r#"
            SELECT r.message_id, r.reader_id FROM message_reads r JOIN messages m ON m.id = r.message_id
            WHERE m.chat_id = $1 AND m.seq >= $2;
        "#,
    )
    .bind(chat_id)
    .bind(oldest)
    .fetch_all(conn)
    .await?;
    let mut read_by: HashMap<ObjectId, BTreeSet<ObjectId>> = HashMap::new();
    for read in reads {
        read_by.entry(read.message_id).or_default().insert(read.reader_id);
    }
    let messages = rows
        .into_iter()
        .map(|row| {
            let readers = read_by.remove(&row.id).unwrap_or_default();
            row.into_message(readers)
        })
        .collect();
    Ok(messages)
}

/// Adds the reader to the receipts of every message in the chat created at or before `upto`, or of every message if
/// `upto` is `None`. Messages sharing the bound's timestamp are included. Readers already present are left alone.
/// Returns the number of receipts added.
pub async fn mark_read_upto(
    chat_id: &ObjectId,
    reader: &ObjectId,
    upto: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT OR IGNORE INTO message_reads (message_id, reader_id)
            SELECT id, $2 FROM messages WHERE chat_id = $1 AND ($3 IS NULL OR created_at <= $3);
        "#,
    )
    .bind(chat_id)
    .bind(reader)
    .bind(upto)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
