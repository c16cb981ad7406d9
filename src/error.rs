use std::path::PathBuf;
use thiserror::Error;

/// 导入错误
///
/// 每一种都会终止当前导入，已创建的条目不会回滚
#[derive(Error, Debug)]
pub enum ImportError {
    /// 解压失败（文件损坏、权限不足、磁盘已满等）
    #[error("解压 EPUB 失败 {path:?}: {reason}")]
    Staging { path: PathBuf, reason: String },
    /// EPUB 结构无效或版本不受支持
    #[error("EPUB 解析失败 {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
    /// 书籍文件夹创建失败或无法回查
    #[error("创建书籍文件夹失败: {0}")]
    FolderCreation(String),
    /// 无法确定内容文档目录
    #[error("无法解析内容资源目录: {0}")]
    ResourceResolution(String),
    /// 单个章节处理失败，剩余章节全部放弃
    #[error("导入第 {index} 章失败 ({path}): {reason}")]
    Chapter {
        index: usize,
        path: String,
        reason: String,
    },
}

/// 知识库接口错误
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("知识库拒绝创建条目: {0}")]
    Rejected(String),
    #[error("找不到父条目: {0}")]
    ParentNotFound(i64),
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("锁定知识库失败: {0}")]
    Lock(String),
}

/// 配置读写错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("配置格式错误: {0}")]
    Format(#[from] serde_json::Error),
    #[error("配置校验失败: {0}")]
    Validation(String),
}
