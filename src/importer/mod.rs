//! 导入流程
//!
//! 解压 → 解析 → 创建书籍文件夹 → 按阅读顺序逐章创建条目。
//! 任何一步失败都终止本次导入并记录日志，已创建的条目保留，不做回滚。

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::archive;
use crate::config::ImporterConfig;
use crate::error::ImportError;
use crate::link_rewriter::rewrite_local_links;
use crate::parser::{resolve_resource_folders, Book, BookReader, Chapter, ReadingOrder, ResourceFolders};
use crate::reference::{book_reference, chapter_reference};
use crate::registry::{ItemHandle, ItemId, ItemKind, ItemStatus, NewItem, Registry};


/// 导入状态
///
/// Idle → Staging → Parsing → CreatingBookFolder → ImportingChapters → Done | Aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    /// 正在解压
    Staging,
    /// 正在解析 EPUB
    Parsing,
    /// 正在创建书籍文件夹
    CreatingBookFolder,
    /// 正在逐章导入
    ImportingChapters,
    /// 完成
    Done,
    /// 已终止
    Aborted,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportState::Idle => "idle",
            ImportState::Staging => "staging",
            ImportState::Parsing => "parsing",
            ImportState::CreatingBookFolder => "creating-book-folder",
            ImportState::ImportingChapters => "importing-chapters",
            ImportState::Done => "done",
            ImportState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// 一次导入的结果
#[derive(Debug)]
pub struct ImportReport {
    /// EPUB 文件路径
    pub archive: PathBuf,
    /// 终止时的状态（Done 或 Aborted）
    pub state: ImportState,
    /// 终止前最后进入的阶段
    pub last_phase: ImportState,
    /// 解压目录
    pub staging_dir: Option<PathBuf>,
    /// 书籍文件夹条目
    pub folder_id: Option<ItemId>,
    /// 已创建的章节条目（按创建顺序）
    pub chapter_ids: Vec<ItemId>,
    /// 导致终止的错误
    pub error: Option<ImportError>,
}

impl ImportReport {
    fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            state: ImportState::Idle,
            last_phase: ImportState::Idle,
            staging_dir: None,
            folder_id: None,
            chapter_ids: Vec::new(),
            error: None,
        }
    }

    fn enter(&mut self, state: ImportState) {
        debug!("导入 {:?}: {} -> {}", self.archive, self.state, state);
        self.state = state;
        self.last_phase = state;
    }

    pub fn is_done(&self) -> bool {
        self.state == ImportState::Done
    }
}

/// EPUB 导入器
///
/// 知识库与书籍读取器通过构造函数注入
pub struct EpubImporter {
    registry: Arc<dyn Registry>,
    reader: Arc<dyn BookReader>,
    config: ImporterConfig,
}

impl EpubImporter {
    pub fn new(
        registry: Arc<dyn Registry>,
        reader: Arc<dyn BookReader>,
        config: ImporterConfig,
    ) -> Self {
        Self {
            registry,
            reader,
            config,
        }
    }

    /// 导入一本 EPUB
    ///
    /// 错误不会向调用方抛出，只记录日志并体现在返回的报告中
    pub fn import_epub(&self, archive_path: &Path) -> ImportReport {
        let mut report = ImportReport::new(archive_path);
        info!("开始导入 {:?}", archive_path);

        match self.run(archive_path, &mut report) {
            Ok(()) => {
                report.state = ImportState::Done;
                info!(
                    "导入完成 {:?}: 共 {} 章",
                    archive_path,
                    report.chapter_ids.len()
                );
            }
            Err(e) => {
                error!(
                    "导入 {:?} 在 {} 阶段终止 (已创建 {} 章): {}",
                    archive_path,
                    report.last_phase,
                    report.chapter_ids.len(),
                    e
                );
                report.state = ImportState::Aborted;
                report.error = Some(e);
            }
        }

        report
    }

    fn run(&self, archive_path: &Path, report: &mut ImportReport) -> Result<(), ImportError> {
        report.enter(ImportState::Staging);
        let staged = archive::stage(archive_path)?;
        report.staging_dir = Some(staged.root().to_path_buf());

        report.enter(ImportState::Parsing);
        let book = self.reader.read_book(archive_path)?;

        report.enter(ImportState::CreatingBookFolder);
        let folder = self.create_book_folder(&book)?;
        report.folder_id = Some(folder.id);

        let folders = resolve_resource_folders(&book, staged.root());
        if folders.content.is_none() {
            return Err(ImportError::ResourceResolution(format!(
                "《{}》没有声明任何内容文档",
                book.title
            )));
        }
        if folders.image.is_none() {
            debug!("《{}》没有图片资源，跳过图片链接改写", book.title);
        }

        report.enter(ImportState::ImportingChapters);
        let mut session = ChapterSession {
            importer: self,
            book: &book,
            folders: &folders,
            report,
            next_index: 1,
        };

        match &book.reading_order {
            ReadingOrder::Flat(chapters) => {
                for chapter in chapters {
                    session.import_chapter(chapter, folder.id)?;
                }
            }
            ReadingOrder::Nested(chapters) => session.import_tree(chapters, folder.id)?,
        }

        Ok(())
    }

    /// 在当前选中条目下创建书籍文件夹
    fn create_book_folder(&self, book: &Book) -> Result<ItemHandle, ImportError> {
        let parent = self
            .registry
            .current_selected_item()
            .ok_or_else(|| ImportError::FolderCreation("没有选中的父条目".to_string()))?;

        let reference = book_reference(book);
        let id = self
            .registry
            .create_item(NewItem {
                parent: parent.id,
                kind: ItemKind::Folder,
                title: &reference.title,
                contents: None,
                reference: &reference,
                display: false,
                status: ItemStatus::Dismissed,
                priority: self.config.default_priority,
                template_id: None,
            })
            .map_err(|e| ImportError::FolderCreation(e.to_string()))?;

        if !id.is_valid() {
            return Err(ImportError::FolderCreation(format!("无效的条目 ID: {}", id)));
        }

        let handle = self
            .registry
            .resolve_item(id)
            .ok_or_else(|| ImportError::FolderCreation(format!("无法回查条目 {}", id)))?;

        debug!("书籍文件夹已创建: {} ({})", reference.title, id);
        Ok(handle)
    }
}

/// 单次导入中逐章创建条目的上下文
struct ChapterSession<'a> {
    importer: &'a EpubImporter,
    book: &'a Book,
    folders: &'a ResourceFolders,
    report: &'a mut ImportReport,
    /// 下一个章节在阅读顺序中的序号（从 1 开始）
    next_index: usize,
}

impl ChapterSession<'_> {
    /// 先序遍历目录树：父章节创建后立即处理其子章节，再处理下一个兄弟
    fn import_tree(&mut self, chapters: &[Chapter], parent: ItemId) -> Result<(), ImportError> {
        for chapter in chapters {
            let id = self.import_chapter(chapter, parent)?;
            self.import_tree(&chapter.subchapters, id)?;
        }
        Ok(())
    }

    /// 导入单个章节，失败时整个导入终止
    fn import_chapter(&mut self, chapter: &Chapter, parent: ItemId) -> Result<ItemId, ImportError> {
        let index = self.next_index;
        self.next_index += 1;

        let chapter_error = |reason: String| ImportError::Chapter {
            index,
            path: chapter.path.display().to_string(),
            reason,
        };

        // 章节边界：panic 与显式失败同样处理
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.create_chapter_item(chapter, parent)
        }));

        let id = match outcome {
            Ok(Ok(id)) => id,
            Ok(Err(reason)) => return Err(chapter_error(reason)),
            Err(payload) => return Err(chapter_error(panic_message(payload.as_ref()))),
        };

        debug!("第 {} 章已导入: {} ({})", index, chapter.path.display(), id);
        self.report.chapter_ids.push(id);
        Ok(id)
    }

    fn create_chapter_item(&self, chapter: &Chapter, parent: ItemId) -> Result<ItemId, String> {
        let markup = chapter
            .markup
            .as_deref()
            .ok_or_else(|| "章节文档缺失".to_string())?;

        let html = rewrite_local_links(markup, self.folders);
        let reference = chapter_reference(self.book, &html);
        let config = &self.importer.config;

        let id = self
            .importer
            .registry
            .create_item(NewItem {
                parent,
                kind: ItemKind::Topic,
                title: &reference.title,
                contents: Some(&html),
                reference: &reference,
                display: false,
                status: ItemStatus::Memorized,
                priority: config.default_priority,
                template_id: config.default_template,
            })
            .map_err(|e| e.to_string())?;

        if !id.is_valid() {
            return Err(format!("无效的条目 ID: {}", id));
        }
        if self.importer.registry.resolve_item(id).is_none() {
            return Err(format!("无法回查条目 {}", id));
        }

        Ok(id)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic".to_string()
    }
}
