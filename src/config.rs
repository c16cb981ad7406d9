//! 导入器配置
//!
//! 以 JSON 文件持久化，字段缺失时使用默认值

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 默认优先级
pub const DEFAULT_PRIORITY: f64 = 30.0;

/// 阅读顺序模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingOrderMode {
    /// 按 spine 平铺，没有子章节
    #[default]
    Spine,
    /// 按目录（TOC）嵌套
    Toc,
}

/// 导入器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// 新建条目的优先级（0 - 100）
    pub default_priority: f64,
    /// 章节条目使用的模板 ID，None 表示不指定
    pub default_template: Option<i64>,
    /// 章节遍历方式
    pub reading_order: ReadingOrderMode,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY,
            default_template: None,
            reading_order: ReadingOrderMode::Spine,
        }
    }
}

impl ImporterConfig {
    /// 校验配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.default_priority) {
            return Err(ConfigError::Validation(format!(
                "优先级必须在 0 到 100 之间，当前为 {}",
                self.default_priority
            )));
        }
        Ok(())
    }
}

/// 配置存储
pub trait ConfigStore: Send + Sync {
    /// 读取配置；尚未保存过时返回 Ok(None)
    fn load(&self) -> Result<Option<ImporterConfig>, ConfigError>;

    fn save(&self, config: &ImporterConfig) -> Result<(), ConfigError>;
}

/// JSON 文件配置存储
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Option<ImporterConfig>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let config: ImporterConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(Some(config))
    }

    fn save(&self, config: &ImporterConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let raw = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// 读取配置，缺失或无效时退回默认值
pub fn load_or_default(store: &dyn ConfigStore) -> ImporterConfig {
    match store.load() {
        Ok(Some(config)) => config,
        Ok(None) => ImporterConfig::default(),
        Err(e) => {
            tracing::warn!("读取配置失败，使用默认配置: {}", e);
            ImporterConfig::default()
        }
    }
}
