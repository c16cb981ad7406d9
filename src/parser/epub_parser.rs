use super::*;
use epub::doc::{EpubDoc, NavPoint};
use std::fs::File;
use std::io::BufReader;
use tracing::debug;

use crate::config::ReadingOrderMode;

type Doc = EpubDoc<BufReader<File>>;

const HTML_MIME_TYPES: &[&str] = &["application/xhtml+xml", "text/html"];

/// EPUB 书籍读取器
///
/// 基于 epub crate，按配置选择 spine 平铺或目录嵌套
#[derive(Clone)]
pub struct EpubBookReader {
    mode: ReadingOrderMode,
}

impl EpubBookReader {
    pub fn new(mode: ReadingOrderMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ReadingOrderMode {
        self.mode
    }

    /// 按 spine 顺序读取所有内容文档
    ///
    /// 每个 spine 条目都对应一个章节；文档无法读取时 markup 为 None，由导入流程按章节失败处理
    fn read_spine(&self, doc: &mut Doc) -> Vec<Chapter> {
        let root_base = doc.root_base.clone();
        let mut chapters = Vec::with_capacity(doc.spine.len());

        for index in 0..doc.spine.len() {
            let path = doc
                .spine
                .get(index)
                .and_then(|item| doc.resources.get(&item.idref))
                .map(|res| relative_to(&res.path, &root_base))
                .unwrap_or_else(|| PathBuf::from(format!("chapter_{}.xhtml", index)));

            let markup = if doc.set_current_chapter(index) {
                doc.get_current()
                    .map(|(bytes, _mime)| String::from_utf8_lossy(&bytes).into_owned())
            } else {
                None
            };

            if markup.is_none() {
                debug!("spine 第 {} 项找不到文档: {}", index + 1, path.display());
            }

            chapters.push(Chapter {
                path,
                markup,
                subchapters: Vec::new(),
            });
        }

        chapters
    }

    /// 按目录树读取，子节点挂在父章节下
    fn read_toc(&self, doc: &mut Doc) -> Vec<Chapter> {
        let toc = doc.toc.clone();
        toc.iter().map(|nav| self.read_nav_point(doc, nav)).collect()
    }

    fn read_nav_point(&self, doc: &mut Doc, nav: &NavPoint) -> Chapter {
        // 去掉 # 后面的锚点
        let content = nav.content.to_string_lossy().to_string();
        let file = content.split('#').next().unwrap_or(&content).to_string();

        let root_base = doc.root_base.clone();
        let markup = doc
            .get_resource_by_path(&file)
            .or_else(|| doc.get_resource_by_path(root_base.join(&file)))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

        if markup.is_none() {
            debug!("目录条目 \"{}\" 找不到文档: {}", nav.label, file);
        }

        Chapter {
            path: relative_to(Path::new(&file), &root_base),
            markup,
            subchapters: nav
                .children
                .iter()
                .map(|child| self.read_nav_point(doc, child))
                .collect(),
        }
    }
}

impl BookReader for EpubBookReader {
    fn read_book(&self, archive_path: &Path) -> Result<Book, ImportError> {
        // 打开 EPUB 文件
        let mut doc = EpubDoc::new(archive_path).map_err(|e| ImportError::Parse {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let title = doc
            .mdata("title")
            .map(|m| m.value.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                archive_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("未知书籍")
                    .to_string()
            });

        let authors: Vec<String> = doc
            .metadata
            .iter()
            .filter(|item| item.property == "creator")
            .map(|item| item.value.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let content_root = doc.root_base.clone();
        let content_resources = content_resources(&doc);
        let image_resources = image_resources(&doc);

        let reading_order = match self.mode {
            ReadingOrderMode::Spine => ReadingOrder::Flat(self.read_spine(&mut doc)),
            ReadingOrderMode::Toc => ReadingOrder::Nested(self.read_toc(&mut doc)),
        };

        debug!(
            "EPUB 解析 - 书名={}, 作者={:?}, 章节数={}, 图片数={}",
            title,
            authors,
            reading_order.len(),
            image_resources.len()
        );

        Ok(Book {
            title,
            authors,
            content_root,
            reading_order,
            content_resources,
            image_resources,
        })
    }
}

impl Default for EpubBookReader {
    fn default() -> Self {
        Self::new(ReadingOrderMode::Spine)
    }
}

/// 内容文档：先按 spine 顺序，再补上 spine 之外的 HTML 资源
fn content_resources(doc: &Doc) -> Vec<PathBuf> {
    let root_base = &doc.root_base;

    let mut paths: Vec<PathBuf> = doc
        .spine
        .iter()
        .filter_map(|item| doc.resources.get(&item.idref))
        .map(|res| relative_to(&res.path, root_base))
        .collect();

    let mut extra: Vec<PathBuf> = doc
        .resources
        .values()
        .filter(|res| HTML_MIME_TYPES.contains(&res.mime.as_str()))
        .map(|res| relative_to(&res.path, root_base))
        .filter(|p| !paths.contains(p))
        .collect();
    extra.sort();

    paths.extend(extra);
    paths
}

/// 图片资源：manifest 是无序的，按路径排序保证结果稳定
fn image_resources(doc: &Doc) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = doc
        .resources
        .values()
        .filter(|res| res.mime.starts_with("image/"))
        .map(|res| relative_to(&res.path, &doc.root_base))
        .collect();
    paths.sort();
    paths
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
