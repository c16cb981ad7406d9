use std::path::{Path, PathBuf};

use crate::error::ImportError;

// 子模块声明
pub mod epub_parser;

/// 书籍
///
/// 解析后不可变，只在一次导入内存在
#[derive(Debug, Clone)]
pub struct Book {
    /// 书名
    pub title: String,
    /// 作者列表（保持声明顺序）
    pub authors: Vec<String>,
    /// 内容目录根（OPF 所在目录，相对于解压根目录）
    pub content_root: PathBuf,
    /// 阅读顺序
    pub reading_order: ReadingOrder,
    /// 内容文档路径（相对于内容目录根），第一个为阅读顺序中的首个文档
    pub content_resources: Vec<PathBuf>,
    /// 图片资源路径（相对于内容目录根）
    pub image_resources: Vec<PathBuf>,
}

impl Book {
    /// 作者显示文本，以 ", " 连接
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}

/// 阅读顺序
///
/// 二选一，不混用：
/// - Flat: spine 顺序，章节没有子章节
/// - Nested: 目录树，按先序遍历
#[derive(Debug, Clone)]
pub enum ReadingOrder {
    Flat(Vec<Chapter>),
    Nested(Vec<Chapter>),
}

impl ReadingOrder {
    pub fn chapters(&self) -> &[Chapter] {
        match self {
            ReadingOrder::Flat(chapters) | ReadingOrder::Nested(chapters) => chapters,
        }
    }

    /// 章节总数（含子章节）
    pub fn len(&self) -> usize {
        fn count(chapters: &[Chapter]) -> usize {
            chapters.iter().map(|c| 1 + count(&c.subchapters)).sum()
        }
        count(self.chapters())
    }

    pub fn is_empty(&self) -> bool {
        self.chapters().is_empty()
    }
}

/// 章节
#[derive(Debug, Clone)]
pub struct Chapter {
    /// 文档路径（相对于内容目录根）
    pub path: PathBuf,
    /// 原始 HTML；None 表示文档无法读取
    pub markup: Option<String>,
    /// 子章节（仅 Nested 模型）
    pub subchapters: Vec<Chapter>,
}

impl Chapter {
    pub fn new<P: Into<PathBuf>>(path: P, markup: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            markup: Some(markup.into()),
            subchapters: Vec::new(),
        }
    }

    pub fn with_subchapters(mut self, subchapters: Vec<Chapter>) -> Self {
        self.subchapters = subchapters;
        self
    }
}

/// 资源目录
///
/// 每本书解析一次，所有章节复用。为 None 时跳过对应类别的链接改写
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFolders {
    /// 内容文档目录
    pub content: Option<PathBuf>,
    /// 图片目录
    pub image: Option<PathBuf>,
}

/// 书籍读取器
///
/// 所有 EPUB 解析实现必须实现此 trait
pub trait BookReader: Send + Sync {
    /// 读取书籍
    ///
    /// # 参数
    /// - `archive_path`: EPUB 文件路径
    ///
    /// # 返回
    /// 书籍模型；结构无效时返回 ImportError::Parse
    fn read_book(&self, archive_path: &Path) -> Result<Book, ImportError>;
}

/// 根据首个资源定位内容目录与图片目录
///
/// 资源路径与内容目录根拼接、去掉开头的分隔符，取其所在目录，再接到解压根目录下
pub fn resolve_resource_folders(book: &Book, extraction_root: &Path) -> ResourceFolders {
    ResourceFolders {
        content: resolve_folder(book.content_resources.first(), &book.content_root, extraction_root),
        image: resolve_folder(book.image_resources.first(), &book.content_root, extraction_root),
    }
}

fn resolve_folder(
    resource: Option<&PathBuf>,
    content_root: &Path,
    extraction_root: &Path,
) -> Option<PathBuf> {
    let combined = content_root.join(resource?);
    let combined = combined.to_string_lossy();
    let relative = Path::new(combined.trim_start_matches(|c: char| c == '/' || c == '\\'));

    match relative.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Some(extraction_root.join(dir)),
        _ => Some(extraction_root.to_path_buf()),
    }
}
