use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            avatar_url   TEXT
        );

        CREATE TABLE IF NOT EXISTS ads (
            id                INTEGER PRIMARY KEY,
            owner_id          TEXT NOT NULL REFERENCES users(id),
            title             TEXT NOT NULL,
            preview_image_url TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_ads_owner
            ON ads(owner_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            ad_id       INTEGER NOT NULL REFERENCES ads(id),
            sender_id   TEXT NOT NULL REFERENCES users(id),
            receiver_id TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL DEFAULT '',
            sent_on     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_ad_pair
            ON messages(ad_id, sender_id, receiver_id);
        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id);
        CREATE INDEX IF NOT EXISTS idx_messages_receiver
            ON messages(receiver_id);

        CREATE TABLE IF NOT EXISTS message_images (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            image_url  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_message_images_message
            ON message_images(message_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
