use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::link_rewriter::strip_xml_declaration;
use crate::parser::Book;

/// 标题查找顺序：先 h1 到 h6，再 <title>。
/// 按列表顺序取第一个有文字的标签，同一标签取文档中的第一个。
const TITLE_TAG_PRIORITY: [&str; 7] = ["h1", "h2", "h3", "h4", "h5", "h6", "title"];

/// 条目引用信息（作者、标题）
///
/// 每本书、每个章节各构建一次，构建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub author: String,
    pub title: String,
}

/// 书籍文件夹的引用信息
pub fn book_reference(book: &Book) -> Reference {
    Reference {
        author: book.author_line(),
        title: book.title.clone(),
    }
}

/// 章节的引用信息
///
/// 能从章节 HTML 中找到标题时为 "书名: 章节标题"，否则只用书名
pub fn chapter_reference(book: &Book, markup: &str) -> Reference {
    let title = match extract_title_from_html(markup) {
        Some(chapter_title) => format!("{}: {}", book.title, chapter_title),
        None => book.title.clone(),
    };

    Reference {
        author: book.author_line(),
        title,
    }
}

/// 从 HTML 内容中提取章节标题
///
/// 尽力而为，找不到时返回 None
pub fn extract_title_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(strip_xml_declaration(html));

    for tag in TITLE_TAG_PRIORITY {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = clean_title(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}

/// 去掉换行符与首尾空白
fn clean_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_string()
}
