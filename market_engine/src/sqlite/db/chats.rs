use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{Chat, LastMessage, MemberPair, ObjectId};

#[derive(Debug, Clone, FromRow)]
struct ChatRow {
    id: ObjectId,
    member_a: ObjectId,
    member_b: ObjectId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_text: Option<String>,
    last_sender: Option<ObjectId>,
    last_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
struct UnreadRow {
    chat_id: ObjectId,
    member_id: ObjectId,
    unread: i64,
}

impl ChatRow {
    fn into_chat(self, unread_by: BTreeMap<ObjectId, i64>) -> Chat {
        let last_message = match (self.last_text, self.last_sender, self.last_at) {
            (Some(text), Some(sender_id), Some(created_at)) => Some(LastMessage { text, sender_id, created_at }),
            _ => None,
        };
        Chat {
            id: self.id,
            members: [self.member_a, self.member_b],
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_message,
            unread_by,
        }
    }
}

/// Creates the chat for this pair unless one already exists. Returns `true` if a chat was created.
///
/// The unique index on the member pair makes this safe to race: the losing insert is ignored.
pub async fn insert_chat_if_absent(members: &MemberPair, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let id = ObjectId::new();
    let now = Utc::now();
    let result = sqlx::query(
        r#"
            INSERT OR IGNORE INTO chats (id, member_a, member_b, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4);
        "#,
    )
    .bind(&id)
    .bind(members.first())
    .bind(members.second())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }
    for member in [members.first(), members.second()] {
        sqlx::query("INSERT INTO chat_unread (chat_id, member_id, unread) VALUES ($1, $2, 0)")
            .bind(&id)
            .bind(member)
            .execute(&mut *conn)
            .await?;
    }
    debug!("💬️ Chat {id} created for {} and {}", members.first(), members.second());
    Ok(true)
}

async fn unread_for_chats(
    chat_ids: &[&ObjectId],
    conn: &mut SqliteConnection,
) -> Result<HashMap<ObjectId, BTreeMap<ObjectId, i64>>, sqlx::Error> {
    let mut result: HashMap<ObjectId, BTreeMap<ObjectId, i64>> = HashMap::new();
    for chat_id in chat_ids {
        let rows: Vec<UnreadRow> =
            sqlx::query_as("SELECT chat_id, member_id, unread FROM chat_unread WHERE chat_id = $1")
                .bind(*chat_id)
                .fetch_all(&mut *conn)
                .await?;
        for row in rows {
            result.entry(row.chat_id).or_default().insert(row.member_id, row.unread);
        }
    }
    Ok(result)
}

async fn hydrate(rows: Vec<ChatRow>, conn: &mut SqliteConnection) -> Result<Vec<Chat>, sqlx::Error> {
    let ids = rows.iter().map(|r| &r.id).collect::<Vec<_>>();
    let mut unread = unread_for_chats(&ids, conn).await?;
    let chats = rows
        .into_iter()
        .map(|row| {
            let counts = unread.remove(&row.id).unwrap_or_default();
            row.into_chat(counts)
        })
        .collect();
    Ok(chats)
}

pub async fn fetch_chat(chat_id: &ObjectId, conn: &mut SqliteConnection) -> Result<Option<Chat>, sqlx::Error> {
    let row: Option<ChatRow> =
        sqlx::query_as("SELECT * FROM chats WHERE id = $1").bind(chat_id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(hydrate(vec![row], conn).await?.pop()),
        None => Ok(None),
    }
}

pub async fn fetch_chat_by_members(
    members: &MemberPair,
    conn: &mut SqliteConnection,
) -> Result<Option<Chat>, sqlx::Error> {
    let row: Option<ChatRow> = sqlx::query_as("SELECT * FROM chats WHERE member_a = $1 AND member_b = $2")
        .bind(members.first())
        .bind(members.second())
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(hydrate(vec![row], conn).await?.pop()),
        None => Ok(None),
    }
}

/// Chats the user belongs to, most recently updated first.
pub async fn fetch_chats_for_member(member: &ObjectId, conn: &mut SqliteConnection) -> Result<Vec<Chat>, sqlx::Error> {
    let rows: Vec<ChatRow> = sqlx::query_as(
        r#"
            SELECT * FROM chats
            WHERE member_a = $1 OR member_b = $1
            ORDER BY updated_at DESC, id DESC;
        "#,
    )
    .bind(member)
    .fetch_all(&mut *conn)
    .await?;
    hydrate(rows, conn).await
}

/// Takes the write lock for the current transaction with a no-op write to the chat row. Returns `false` if the chat
/// does not exist.
pub async fn lock_chat(chat_id: &ObjectId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE chats SET updated_at = updated_at WHERE id = $1").bind(chat_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Sets the last-message preview and `updated_at` of the chat.
pub async fn set_last_message(
    chat_id: &ObjectId,
    last: &LastMessage,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE chats SET updated_at = $1, last_text = $2, last_sender = $3, last_at = $1
            WHERE id = $4;
        "#,
    )
    .bind(last.created_at)
    .bind(&last.text)
    .bind(&last.sender_id)
    .bind(chat_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Adds one to the member's unread count for the chat.
pub async fn increment_unread(
    chat_id: &ObjectId,
    member: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO chat_unread (chat_id, member_id, unread) VALUES ($1, $2, 1)
            ON CONFLICT (chat_id, member_id) DO UPDATE SET unread = unread + 1;
        "#,
    )
    .bind(chat_id)
    .bind(member)
    .execute(conn)
    .await?;
    trace!("💬️ Unread count for {member} in chat {chat_id} incremented");
    Ok(())
}

/// Sets the member's unread count for the chat to zero, whatever it was.
pub async fn reset_unread(
    chat_id: &ObjectId,
    member: &ObjectId,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO chat_unread (chat_id, member_id, unread) VALUES ($1, $2, 0)
            ON CONFLICT (chat_id, member_id) DO UPDATE SET unread = 0;
        "#,
    )
    .bind(chat_id)
    .bind(member)
    .execute(conn)
    .await?;
    trace!("💬️ Unread count for {member} in chat {chat_id} reset");
    Ok(())
}
