use rusqlite::{Connection, Result};
use std::path::Path;

/// 根条目 ID，新数据库创建时自动写入
pub const ROOT_ITEM_ID: i64 = 1;

pub fn init_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA encoding = 'UTF-8'; PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            parent_id INTEGER REFERENCES items(id),
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT,
            contents TEXT,
            status TEXT NOT NULL,
            priority REAL NOT NULL,
            template_id INTEGER,
            display INTEGER NOT NULL DEFAULT 0,
            added_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS selection (
            slot INTEGER PRIMARY KEY CHECK (slot = 0),
            item_id INTEGER NOT NULL REFERENCES items(id)
        )",
        [],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO items (id, parent_id, kind, title, status, priority)
         VALUES (?1, NULL, 'folder', '知识库', 'dismissed', 0)",
        [ROOT_ITEM_ID],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO selection (slot, item_id) VALUES (0, ?1)",
        [ROOT_ITEM_ID],
    )?;

    Ok(())
}
