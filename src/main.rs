//! epub-importer 命令行入口
//!
//! 本地知识库保存在 SQLite 文件中，导入结果可用 `tree` 子命令查看。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epub_importer_lib::config::{load_or_default, JsonConfigStore};
use epub_importer_lib::db::ROOT_ITEM_ID;
use epub_importer_lib::{
    EpubBookReader, EpubImporter, EpubImporterApp, FileDialog, ItemId, OpenFileOutcome,
    PresetFileDialog, PromptFileDialog, Registry, SqliteRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "epub-importer")]
#[command(about = "将 EPUB 电子书按章节导入本地知识库")]
#[command(version)]
struct Cli {
    /// 知识库数据库文件
    #[arg(long, default_value = "knowledge.db")]
    db: PathBuf,

    /// 导入器配置文件（JSON）
    #[arg(long, default_value = "epub-importer.json")]
    config: PathBuf,

    /// 日志级别，RUST_LOG 优先
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 导入一本 EPUB
    Import {
        /// EPUB 文件路径，省略时交互输入
        path: Option<PathBuf>,

        /// 在此条目下创建书籍文件夹（默认当前选中条目）
        #[arg(long)]
        parent: Option<i64>,
    },

    /// 打印知识库条目树
    Tree,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("{},epub_importer_lib={}", cli.log_level, cli.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    let registry = Arc::new(
        SqliteRegistry::open(&cli.db)
            .with_context(|| format!("无法打开知识库 {:?}", cli.db))?,
    );

    match cli.command {
        Commands::Import { path, parent } => {
            if let Some(parent) = parent {
                registry
                    .select_item(ItemId(parent))
                    .with_context(|| format!("无法选中父条目 {}", parent))?;
            }

            let store = JsonConfigStore::new(&cli.config);
            let config = load_or_default(&store);
            tracing::debug!("导入配置 {:?}: {:?}", store.path(), config);

            let reader = Arc::new(EpubBookReader::new(config.reading_order));
            let importer = EpubImporter::new(registry.clone(), reader, config);

            let dialog: Box<dyn FileDialog> = match path {
                Some(path) => Box::new(PresetFileDialog::new(Some(path))),
                None => Box::new(PromptFileDialog),
            };
            let app = EpubImporterApp::new(importer, dialog);

            match app.open_file() {
                OpenFileOutcome::Imported(report) => {
                    if let Some(e) = report.error {
                        anyhow::bail!(
                            "导入在 {} 阶段终止，已创建 {} 章: {}",
                            report.last_phase,
                            report.chapter_ids.len(),
                            e
                        );
                    }
                    println!(
                        "已导入 {:?}: 文件夹 {}，共 {} 章",
                        report.archive,
                        report.folder_id.map(|id| id.to_string()).unwrap_or_default(),
                        report.chapter_ids.len()
                    );
                }
                OpenFileOutcome::Cancelled => println!("已取消"),
                OpenFileOutcome::AlreadyRunning => println!("已有导入在进行"),
            }
        }
        Commands::Tree => {
            let root = registry
                .resolve_item(ItemId(ROOT_ITEM_ID))
                .context("知识库没有根条目")?;
            println!("[{}] {}", root.id, root.title);
            print_tree(&registry, root.id, 1)?;
        }
    }

    Ok(())
}

fn print_tree(registry: &SqliteRegistry, parent: ItemId, depth: usize) -> Result<()> {
    for item in registry.children(parent)? {
        println!(
            "{}[{}] {} ({}, {})",
            "  ".repeat(depth),
            item.id,
            item.title,
            item.kind.as_str(),
            item.status.as_str()
        );
        print_tree(registry, item.id, depth + 1)?;
    }
    Ok(())
}
