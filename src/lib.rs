//! EPUB 导入器
//!
//! 解压 EPUB，按阅读顺序把每个章节导入知识库：书籍对应一个文件夹，
//! 章节对应文件夹下的主题条目，章节内的本地链接改写为解压目录下的绝对路径。

pub mod app;
pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod import_gate;
pub mod importer;
pub mod link_rewriter;
pub mod parser;
pub mod reference;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use app::{EpubImporterApp, FileDialog, OpenFileOutcome, PresetFileDialog, PromptFileDialog};
pub use config::{ConfigStore, ImporterConfig, JsonConfigStore, ReadingOrderMode};
pub use error::{ConfigError, ImportError, RegistryError};
pub use import_gate::{ImportGate, ImportPermit};
pub use importer::{EpubImporter, ImportReport, ImportState};
pub use parser::epub_parser::EpubBookReader;
pub use parser::{Book, BookReader, Chapter, ReadingOrder, ResourceFolders};
pub use reference::Reference;
pub use registry::{ItemHandle, ItemId, ItemKind, ItemStatus, NewItem, Registry, SqliteRegistry};
