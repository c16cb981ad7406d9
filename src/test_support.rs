//! 测试辅助：EPUB 样例构建、记录调用的知识库、固定返回的书籍读取器

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ImportError, RegistryError};
use crate::parser::{Book, BookReader};
use crate::reference::Reference;
use crate::registry::{ItemHandle, ItemId, ItemKind, ItemStatus, NewItem, Registry};

/// 写一个只包含给定文件的 ZIP
pub fn write_zip<C: AsRef<[u8]>>(path: &Path, entries: &[(&str, C)]) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_ref()).unwrap();
    }
    writer.finish().unwrap();
}

/// 章节样例
pub struct FixtureChapter {
    pub id: &'static str,
    pub href: &'static str,
    pub label: &'static str,
    pub body: String,
    /// 在目录中挂在哪个章节下（None 为顶层）
    pub toc_parent: Option<&'static str>,
}

/// EPUB 样例
pub struct EpubFixture {
    pub title: &'static str,
    pub authors: Vec<&'static str>,
    pub chapters: Vec<FixtureChapter>,
    pub images: Vec<&'static str>,
    /// 在 manifest 中声明但不写入归档的章节
    pub omitted: Vec<&'static str>,
    /// 用原始字节替换章节内容
    pub raw_bodies: Vec<(&'static str, Vec<u8>)>,
}

impl EpubFixture {
    /// 三章一图：目录中第二章挂在第一章下
    pub fn three_chapters() -> Self {
        Self {
            title: "样例书",
            authors: vec!["张三", "李四"],
            chapters: vec![
                FixtureChapter {
                    id: "ch1",
                    href: "Text/ch1.xhtml",
                    label: "第一章",
                    body: chapter_html(
                        "第一章",
                        r#"<h1>第一章</h1><p><img src="../Images/pic.png" alt="插图"/></p><p><a href="ch2.xhtml">下一章</a></p>"#,
                    ),
                    toc_parent: None,
                },
                FixtureChapter {
                    id: "ch2",
                    href: "Text/ch2.xhtml",
                    label: "第二章",
                    body: chapter_html(
                        "第二章",
                        r#"<h2>第二章</h2><p><a href="ch3.xhtml#top">继续</a></p>"#,
                    ),
                    toc_parent: Some("ch1"),
                },
                FixtureChapter {
                    id: "ch3",
                    href: "Text/ch3.xhtml",
                    label: "第三章",
                    body: chapter_html(
                        "第三章",
                        r#"<h1 id="top">第三章</h1><p><a href="https://example.com/">外链</a></p>"#,
                    ),
                    toc_parent: None,
                },
            ],
            images: vec!["Images/pic.png"],
            omitted: Vec::new(),
            raw_bodies: Vec::new(),
        }
    }

    /// 章节文件不写入归档
    pub fn without_file(mut self, href: &'static str) -> Self {
        self.omitted.push(href);
        self
    }

    pub fn with_raw_body(mut self, href: &'static str, body: Vec<u8>) -> Self {
        self.raw_bodies.push((href, body));
        self
    }
}

pub fn chapter_html(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{}</title><link rel="stylesheet" type="text/css" href="../Styles/main.css"/></head>
<body>{}</body>
</html>"#,
        title, body
    )
}

/// 按样例写出完整的 EPUB 文件
pub fn write_epub(path: &Path, fixture: &EpubFixture) {
    let container = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    let creators: String = fixture
        .authors
        .iter()
        .map(|a| format!(r#"<dc:creator opf:role="aut">{}</dc:creator>"#, a))
        .collect();

    let mut manifest = String::from(
        r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
    );
    for chapter in &fixture.chapters {
        manifest.push_str(&format!(
            r#"<item id="{}" href="{}" media-type="application/xhtml+xml"/>"#,
            chapter.id, chapter.href
        ));
    }
    for (i, image) in fixture.images.iter().enumerate() {
        manifest.push_str(&format!(
            r#"<item id="img{}" href="{}" media-type="image/png"/>"#,
            i, image
        ));
    }

    let spine: String = fixture
        .chapters
        .iter()
        .map(|c| format!(r#"<itemref idref="{}"/>"#, c.id))
        .collect();

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>{}</dc:title>
    {}
    <dc:identifier id="bookid">urn:uuid:0f8b7c1e-0000-4000-8000-000000000001</dc:identifier>
    <dc:language>zh</dc:language>
  </metadata>
  <manifest>{}</manifest>
  <spine toc="ncx">{}</spine>
</package>"#,
        fixture.title, creators, manifest, spine
    );

    let mut order = 0;
    let nav_map = nav_points(fixture, None, &mut order);
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:0f8b7c1e-0000-4000-8000-000000000001"/></head>
  <docTitle><text>{}</text></docTitle>
  <navMap>{}</navMap>
</ncx>"#,
        fixture.title, nav_map
    );

    let mut entries: Vec<(String, Vec<u8>)> = vec![
        ("mimetype".to_string(), b"application/epub+zip".to_vec()),
        ("META-INF/container.xml".to_string(), container.as_bytes().to_vec()),
        ("OEBPS/content.opf".to_string(), opf.into_bytes()),
        ("OEBPS/toc.ncx".to_string(), ncx.into_bytes()),
    ];
    for chapter in &fixture.chapters {
        if fixture.omitted.contains(&chapter.href) {
            continue;
        }
        let body = fixture
            .raw_bodies
            .iter()
            .find(|(href, _)| *href == chapter.href)
            .map(|(_, body)| body.clone())
            .unwrap_or_else(|| chapter.body.clone().into_bytes());
        entries.push((format!("OEBPS/{}", chapter.href), body));
    }
    for image in &fixture.images {
        entries.push((format!("OEBPS/{}", image), b"PNG".to_vec()));
    }

    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, content)| (name.as_str(), content.as_slice()))
        .collect();
    write_zip(path, &borrowed);
}

fn nav_points(fixture: &EpubFixture, parent: Option<&str>, order: &mut usize) -> String {
    let mut out = String::new();
    for chapter in fixture.chapters.iter().filter(|c| c.toc_parent == parent) {
        *order += 1;
        let current = *order;
        let children = nav_points(fixture, Some(chapter.id), order);
        out.push_str(&format!(
            r#"<navPoint id="nav{}" playOrder="{}"><navLabel><text>{}</text></navLabel><content src="{}"/>{}</navPoint>"#,
            current, current, chapter.label, chapter.href, children
        ));
    }
    out
}

/// 知识库中已创建的条目（测试记录）
#[derive(Debug, Clone)]
pub struct CreatedItem {
    pub id: ItemId,
    pub parent: ItemId,
    pub kind: ItemKind,
    pub title: String,
    pub contents: Option<String>,
    pub reference: Reference,
    pub display: bool,
    pub status: ItemStatus,
    pub priority: f64,
    pub template_id: Option<i64>,
}

/// 记录所有调用的内存知识库，可按调用序号注入失败
pub struct RecordingRegistry {
    items: Mutex<Vec<CreatedItem>>,
    calls: AtomicUsize,
    /// 第 n 次 create_item（从 1 开始）返回错误
    fail_on_call: Option<usize>,
    /// 第 n 次 create_item 返回无效 ID
    invalid_id_on_call: Option<usize>,
    /// 第 n 次 create_item 成功但无法回查
    unresolvable_on_call: Option<usize>,
    /// 第 n 次 create_item 直接 panic
    panic_on_call: Option<usize>,
    has_selection: bool,
}

pub const ROOT_ID: ItemId = ItemId(1);

impl RecordingRegistry {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_on_call: None,
            invalid_id_on_call: None,
            unresolvable_on_call: None,
            panic_on_call: None,
            has_selection: true,
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn invalid_id_on(mut self, call: usize) -> Self {
        self.invalid_id_on_call = Some(call);
        self
    }

    pub fn unresolvable_on(mut self, call: usize) -> Self {
        self.unresolvable_on_call = Some(call);
        self
    }

    pub fn panicking_on(mut self, call: usize) -> Self {
        self.panic_on_call = Some(call);
        self
    }

    pub fn without_selection(mut self) -> Self {
        self.has_selection = false;
        self
    }

    /// create_item 被调用的次数（含失败）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn items(&self) -> Vec<CreatedItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.items().into_iter().map(|item| item.title).collect()
    }
}

impl Registry for RecordingRegistry {
    fn create_item(&self, item: NewItem<'_>) -> Result<ItemId, RegistryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.panic_on_call == Some(call) {
            panic!("模拟知识库崩溃");
        }
        if self.fail_on_call == Some(call) {
            return Err(RegistryError::Rejected(format!("第 {} 次调用被拒绝", call)));
        }
        if self.invalid_id_on_call == Some(call) {
            return Ok(ItemId(-1));
        }

        let mut items = self.items.lock().unwrap();
        let id = ItemId(items.len() as i64 + 2);
        // 无法回查的条目不记录
        if self.unresolvable_on_call == Some(call) {
            return Ok(ItemId(10_000 + call as i64));
        }
        items.push(CreatedItem {
            id,
            parent: item.parent,
            kind: item.kind,
            title: item.title.to_string(),
            contents: item.contents.map(str::to_string),
            reference: item.reference.clone(),
            display: item.display,
            status: item.status,
            priority: item.priority,
            template_id: item.template_id,
        });
        Ok(id)
    }

    fn resolve_item(&self, id: ItemId) -> Option<ItemHandle> {
        if id == ROOT_ID {
            return self.current_selected_item();
        }
        let items = self.items.lock().unwrap();
        items.iter().find(|item| item.id == id).map(|item| ItemHandle {
            id: item.id,
            parent: Some(item.parent),
            kind: item.kind,
            title: item.title.clone(),
            status: item.status,
        })
    }

    fn current_selected_item(&self) -> Option<ItemHandle> {
        self.has_selection.then(|| ItemHandle {
            id: ROOT_ID,
            parent: None,
            kind: ItemKind::Folder,
            title: "根".to_string(),
            status: ItemStatus::Dismissed,
        })
    }
}

/// 固定返回同一本书的读取器
pub struct StaticBookReader {
    book: Option<Book>,
}

impl StaticBookReader {
    pub fn new(book: Book) -> Self {
        Self { book: Some(book) }
    }

    /// 总是解析失败
    pub fn failing() -> Self {
        Self { book: None }
    }
}

impl BookReader for StaticBookReader {
    fn read_book(&self, archive_path: &Path) -> Result<Book, ImportError> {
        self.book.clone().ok_or_else(|| ImportError::Parse {
            path: archive_path.to_path_buf(),
            reason: "无效的 EPUB".to_string(),
        })
    }
}
