use std::collections::HashMap;

use crate::Database;
use crate::models::{AdRow, InboxRow, MessageRow, TranscriptRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn upsert_user(&self, id: &str, display_name: &str, avatar_url: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, avatar_url) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET display_name = ?2, avatar_url = ?3",
                rusqlite::params![id, display_name, avatar_url],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    // -- Ads --

    pub fn upsert_ad(
        &self,
        id: i64,
        owner_id: &str,
        title: &str,
        preview_image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ads (id, owner_id, title, preview_image_url) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET owner_id = ?2, title = ?3, preview_image_url = ?4",
                rusqlite::params![id, owner_id, title, preview_image_url],
            )?;
            Ok(())
        })
    }

    pub fn get_ad(&self, id: i64) -> Result<Option<AdRow>> {
        self.with_conn(|conn| query_ad(conn, id))
    }

    // -- Messages --

    /// Insert a message together with its image rows in one transaction, so a
    /// reader never observes a message with a partial image set. `sent_on` is
    /// the server-assigned RFC 3339 timestamp.
    pub fn insert_message(
        &self,
        ad_id: i64,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        image_urls: &[String],
        sent_on: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (ad_id, sender_id, receiver_id, content, sent_on)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![ad_id, sender_id, receiver_id, content, sent_on],
            )?;
            let message_id = tx.last_insert_rowid();

            for url in image_urls {
                tx.execute(
                    "INSERT INTO message_images (message_id, image_url) VALUES (?1, ?2)",
                    rusqlite::params![message_id, url],
                )?;
            }

            tx.commit()?;

            Ok(MessageRow {
                id: message_id,
                ad_id,
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                content: content.to_string(),
                sent_on: sent_on.to_string(),
                image_urls: image_urls.to_vec(),
            })
        })
    }

    /// Time-ordered transcript for one conversation. The participant pair
    /// match is order-independent; ties on sent_on break by id ascending.
    pub fn get_transcript(&self, ad_id: i64, user_a: &str, user_b: &str) -> Result<Vec<TranscriptRow>> {
        self.with_conn(|conn| query_transcript(conn, ad_id, user_a, user_b))
    }

    /// Latest message per (ad, counterparty) group for one side of the
    /// market: ads the user owns when `selling`, everyone else's otherwise.
    pub fn get_inbox(&self, user_id: &str, selling: bool) -> Result<Vec<InboxRow>> {
        self.with_conn(|conn| query_inbox(conn, user_id, selling))
    }
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare("SELECT id, display_name, avatar_url FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                display_name: row.get(1)?,
                avatar_url: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_ad(conn: &Connection, id: i64) -> Result<Option<AdRow>> {
    let mut stmt =
        conn.prepare("SELECT id, owner_id, title, preview_image_url FROM ads WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(AdRow {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                title: row.get(2)?,
                preview_image_url: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_transcript(
    conn: &Connection,
    ad_id: i64,
    user_a: &str,
    user_b: &str,
) -> Result<Vec<TranscriptRow>> {
    // JOIN users to fetch the sender display attributes in a single query
    let mut stmt = conn.prepare(
        "SELECT m.id, m.sender_id, u.display_name, u.avatar_url, m.content, m.sent_on
         FROM messages m
         LEFT JOIN users u ON u.id = m.sender_id
         WHERE m.ad_id = ?1
           AND ((m.sender_id = ?2 AND m.receiver_id = ?3)
             OR (m.sender_id = ?3 AND m.receiver_id = ?2))
         ORDER BY m.sent_on ASC, m.id ASC",
    )?;

    let mut rows = stmt
        .query_map(rusqlite::params![ad_id, user_a, user_b], |row| {
            Ok(TranscriptRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                sender_name: row
                    .get::<_, Option<String>>(2)?
                    .unwrap_or_else(|| "unknown".to_string()),
                sender_avatar_url: row.get(3)?,
                content: row.get(4)?,
                sent_on: row.get(5)?,
                image_urls: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let message_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut images = query_images(conn, &message_ids)?;
    for row in &mut rows {
        if let Some(urls) = images.remove(&row.id) {
            row.image_urls = urls;
        }
    }

    Ok(rows)
}

/// Batch-fetch attachment URLs for a set of message ids, in send order.
fn query_images(conn: &Connection, message_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT message_id, image_url FROM message_images
         WHERE message_id IN ({})
         ORDER BY message_id, id",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let mut map: HashMap<i64, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (message_id, url) = row?;
        map.entry(message_id).or_default().push(url);
    }

    Ok(map)
}

fn query_inbox(conn: &Connection, user_id: &str, selling: bool) -> Result<Vec<InboxRow>> {
    // ROW_NUMBER picks the latest message per (ad, counterparty) group;
    // ties on sent_on break by id, matching transcript ordering.
    let owner_filter = if selling {
        "a.owner_id = ?1"
    } else {
        "a.owner_id <> ?1"
    };
    let sql = format!(
        "SELECT lm.ad_id, lm.title, lm.other_id,
                u.display_name, u.avatar_url, lm.content, lm.sent_on
         FROM (
             SELECT m.id, m.ad_id, a.title, m.content, m.sent_on,
                    CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END AS other_id,
                    ROW_NUMBER() OVER (
                        PARTITION BY m.ad_id,
                                     CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
                        ORDER BY m.sent_on DESC, m.id DESC
                    ) AS rn
             FROM messages m
             JOIN ads a ON a.id = m.ad_id
             WHERE (m.sender_id = ?1 OR m.receiver_id = ?1) AND {owner_filter}
         ) lm
         LEFT JOIN users u ON u.id = lm.other_id
         WHERE lm.rn = 1
         ORDER BY lm.sent_on DESC, lm.id DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(InboxRow {
                ad_id: row.get(0)?,
                ad_title: row.get(1)?,
                other_user_id: row.get(2)?,
                other_user_name: row
                    .get::<_, Option<String>>(3)?
                    .unwrap_or_else(|| "unknown".to_string()),
                other_user_avatar_url: row.get(4)?,
                content: row.get(5)?,
                sent_on: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
