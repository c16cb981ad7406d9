use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::import_gate::ImportGate;
use crate::importer::{EpubImporter, ImportReport};

/// EPUB 文件过滤
pub const EPUB_FILTER: &str = ".epub";

/// 文件选择
pub trait FileDialog: Send + Sync {
    /// 让用户选择文件，取消时返回 None
    fn choose_file(&self, filter: &str) -> Option<PathBuf>;
}

/// 预先给定路径的“对话框”，用于命令行参数
pub struct PresetFileDialog {
    path: Option<PathBuf>,
}

impl PresetFileDialog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl FileDialog for PresetFileDialog {
    fn choose_file(&self, _filter: &str) -> Option<PathBuf> {
        self.path.clone()
    }
}

/// 从标准输入读取路径，空行表示取消
pub struct PromptFileDialog;

impl FileDialog for PromptFileDialog {
    fn choose_file(&self, filter: &str) -> Option<PathBuf> {
        print!("请输入要导入的 {} 文件路径（直接回车取消）: ", filter);
        io::stdout().flush().ok()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        parse_prompt_answer(&line, filter)
    }
}

fn parse_prompt_answer(line: &str, filter: &str) -> Option<PathBuf> {
    let answer = line.trim().trim_matches('"');
    if answer.is_empty() {
        return None;
    }

    let path = PathBuf::from(answer);
    let extension = filter.trim_start_matches('.');
    let matches = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if !matches {
        debug!("所选文件不是 {}: {:?}", filter, path);
    }
    Some(path)
}

/// 一次“打开文件”操作的结果
#[derive(Debug)]
pub enum OpenFileOutcome {
    /// 已执行导入（成功或终止见报告）
    Imported(ImportReport),
    /// 用户取消选择
    Cancelled,
    /// 已有导入在进行，本次请求被丢弃
    AlreadyRunning,
}

/// 导入入口：闸门 → 选择文件 → 导入
pub struct EpubImporterApp {
    gate: ImportGate,
    importer: EpubImporter,
    dialog: Box<dyn FileDialog>,
}

impl EpubImporterApp {
    pub fn new(importer: EpubImporter, dialog: Box<dyn FileDialog>) -> Self {
        Self {
            gate: ImportGate::new(),
            importer,
            dialog,
        }
    }

    pub fn gate(&self) -> &ImportGate {
        &self.gate
    }

    /// 打开文件并导入
    ///
    /// 许可在函数返回时释放，包括取消与导入失败
    pub fn open_file(&self) -> OpenFileOutcome {
        let Some(_permit) = self.gate.try_enter() else {
            debug!("已有导入在进行，忽略本次请求");
            return OpenFileOutcome::AlreadyRunning;
        };

        let Some(path) = self.dialog.choose_file(EPUB_FILTER) else {
            info!("用户取消选择文件");
            return OpenFileOutcome::Cancelled;
        };

        OpenFileOutcome::Imported(self.importer.import_epub(&path))
    }
}
