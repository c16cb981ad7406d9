use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::*;
use crate::db;

/// 基于 SQLite 的本地知识库
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    /// 打开（或创建）数据库文件
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RegistryError::Rejected(format!("无法创建数据库目录: {}", e)))?;
            }
        }
        Ok(Self {
            conn: Mutex::new(db::init_db(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, RegistryError> {
        Ok(Self {
            conn: Mutex::new(db::init_memory_db()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn
            .lock()
            .map_err(|e| RegistryError::Lock(e.to_string()))
    }

    /// 切换当前选中条目
    pub fn select_item(&self, id: ItemId) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        if query_item(&conn, id)?.is_none() {
            return Err(RegistryError::ParentNotFound(id.0));
        }
        conn.execute("UPDATE selection SET item_id = ?1 WHERE slot = 0", [id.0])?;
        Ok(())
    }

    /// 列出子条目（按 ID 即创建顺序）
    pub fn children(&self, parent: ItemId) -> Result<Vec<ItemHandle>, RegistryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, kind, title, status FROM items WHERE parent_id = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map([parent.0], handle_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// 读取条目正文
    pub fn contents(&self, id: ItemId) -> Result<Option<String>, RegistryError> {
        let conn = self.lock()?;
        let contents = conn
            .query_row("SELECT contents FROM items WHERE id = ?1", [id.0], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?;
        Ok(contents.flatten())
    }

    /// 读取条目引用信息
    pub fn reference(&self, id: ItemId) -> Result<Option<Reference>, RegistryError> {
        let conn = self.lock()?;
        let reference = conn
            .query_row(
                "SELECT author, title FROM items WHERE id = ?1",
                [id.0],
                |row| {
                    Ok(Reference {
                        author: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(reference)
    }
}

impl Registry for SqliteRegistry {
    fn create_item(&self, item: NewItem<'_>) -> Result<ItemId, RegistryError> {
        let conn = self.lock()?;

        if query_item(&conn, item.parent)?.is_none() {
            return Err(RegistryError::ParentNotFound(item.parent.0));
        }

        conn.execute(
            "INSERT INTO items (parent_id, kind, title, author, contents, status, priority, template_id, display)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                item.parent.0,
                item.kind.as_str(),
                item.title,
                item.reference.author,
                item.contents,
                item.status.as_str(),
                item.priority,
                item.template_id,
                item.display,
            ],
        )?;

        let id = ItemId(conn.last_insert_rowid());
        debug!("创建条目 {} ({}) 于 {}", id, item.kind.as_str(), item.parent);
        Ok(id)
    }

    fn resolve_item(&self, id: ItemId) -> Option<ItemHandle> {
        let conn = self.lock().ok()?;
        match query_item(&conn, id) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("回查条目 {} 失败: {}", id, e);
                None
            }
        }
    }

    fn current_selected_item(&self) -> Option<ItemHandle> {
        let conn = self.lock().ok()?;
        let selected: Option<i64> = conn
            .query_row("SELECT item_id FROM selection WHERE slot = 0", [], |row| {
                row.get(0)
            })
            .optional()
            .ok()
            .flatten();
        query_item(&conn, ItemId(selected?)).ok().flatten()
    }
}

fn query_item(conn: &Connection, id: ItemId) -> Result<Option<ItemHandle>, RegistryError> {
    let handle = conn
        .query_row(
            "SELECT id, parent_id, kind, title, status FROM items WHERE id = ?1",
            [id.0],
            handle_from_row,
        )
        .optional()?;
    Ok(handle)
}

fn handle_from_row(row: &Row<'_>) -> rusqlite::Result<ItemHandle> {
    let kind: String = row.get(2)?;
    let status: String = row.get(4)?;
    Ok(ItemHandle {
        id: ItemId(row.get(0)?),
        parent: row.get::<_, Option<i64>>(1)?.map(ItemId),
        kind: ItemKind::parse(&kind).unwrap_or(ItemKind::Topic),
        title: row.get(3)?,
        status: ItemStatus::parse(&status).unwrap_or(ItemStatus::Memorized),
    })
}
