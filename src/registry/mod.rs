//! 知识库接口
//!
//! 导入器只依赖三个操作：创建条目、按 ID 回查条目、获取当前选中条目

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RegistryError;
use crate::reference::Reference;

pub mod sqlite_registry;

pub use sqlite_registry::SqliteRegistry;

/// 条目 ID，小于 1 视为无效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl ItemId {
    pub fn is_valid(&self) -> bool {
        self.0 >= 1
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// 书籍文件夹（无正文）
    Folder,
    /// 章节（HTML 正文）
    Topic,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::Topic => "topic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "folder" => Some(ItemKind::Folder),
            "topic" => Some(ItemKind::Topic),
            _ => None,
        }
    }
}

/// 条目学习状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// 不参与复习（书籍文件夹）
    Dismissed,
    /// 参与复习（章节）
    Memorized,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Dismissed => "dismissed",
            ItemStatus::Memorized => "memorized",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dismissed" => Some(ItemStatus::Dismissed),
            "memorized" => Some(ItemStatus::Memorized),
            _ => None,
        }
    }
}

/// 创建条目请求
#[derive(Debug, Clone)]
pub struct NewItem<'a> {
    pub parent: ItemId,
    pub kind: ItemKind,
    /// 条目标题（与引用标题一致）
    pub title: &'a str,
    /// HTML 正文，文件夹为 None
    pub contents: Option<&'a str>,
    pub reference: &'a Reference,
    /// 是否在创建后立即显示给用户
    pub display: bool,
    pub status: ItemStatus,
    /// 优先级（0 - 100）
    pub priority: f64,
    pub template_id: Option<i64>,
}

/// 已存在条目的句柄
#[derive(Debug, Clone, PartialEq)]
pub struct ItemHandle {
    pub id: ItemId,
    pub parent: Option<ItemId>,
    pub kind: ItemKind,
    pub title: String,
    pub status: ItemStatus,
}

/// 知识库
///
/// 并发创建时的加锁由实现负责
pub trait Registry: Send + Sync {
    /// 创建条目，返回新条目 ID
    fn create_item(&self, item: NewItem<'_>) -> Result<ItemId, RegistryError>;

    /// 按 ID 回查条目，不存在时返回 None
    fn resolve_item(&self, id: ItemId) -> Option<ItemHandle>;

    /// 当前选中的条目，新书籍文件夹创建在它下面
    fn current_selected_item(&self) -> Option<ItemHandle>;
}
