//! 本地链接改写
//!
//! 把章节 HTML 中的相对 href/src 改写成解压目录下的绝对路径，
//! 使章节脱离 EPUB 后仍能正确显示图片和跳转

use scraper::{Html, Node};
use std::path::Path;
use url::Url;

use crate::parser::ResourceFolders;

/// 元素类别，决定使用哪个基准目录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    /// <img>、SVG <image>：改写图片属性，基准为图片目录
    Image,
    /// <script>：不改写
    Script,
    /// 其他元素：href 与 src，基准为内容目录
    Other,
}

fn classify(tag: &str) -> ElementKind {
    match tag {
        "img" | "image" => ElementKind::Image,
        "script" => ElementKind::Script,
        _ => ElementKind::Other,
    }
}

/// 改写章节中的所有本地链接
///
/// 纯函数：相同输入得到相同输出，对已改写的结果再次调用不会变化
///
/// # 参数
/// - `markup`: 章节 HTML
/// - `folders`: 内容目录与图片目录，缺失的类别直接跳过
///
/// # 返回
/// 改写后的 HTML
pub fn rewrite_local_links(markup: &str, folders: &ResourceFolders) -> String {
    let mut document = Html::parse_document(strip_xml_declaration(markup));

    let ids: Vec<_> = document.tree.root().descendants().map(|n| n.id()).collect();

    for id in ids {
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(element) = node.value() else {
            continue;
        };

        let (base, attributes): (Option<&Path>, &[&str]) = match classify(element.name()) {
            ElementKind::Script => continue,
            ElementKind::Image => (folders.image.as_deref(), &["src", "href"]),
            ElementKind::Other => (folders.content.as_deref(), &["href", "src"]),
        };
        let Some(base) = base else {
            continue;
        };

        for (name, value) in element.attrs.iter_mut() {
            if attributes.contains(&&*name.local) {
                let resolved = resolve_local_url(&**value, base);
                if resolved.as_str() != &**value {
                    *value = resolved.into();
                }
            }
        }
    }

    document.html()
}

/// 去掉 XHTML 开头的 `<?xml ...?>` 声明
///
/// HTML 解析器会把它当作注释保留下来
pub(crate) fn strip_xml_declaration(markup: &str) -> &str {
    let rest = markup.trim_start_matches('\u{feff}').trim_start();
    if !rest.starts_with("<?xml") {
        return markup;
    }
    match rest.find("?>") {
        Some(end) => &rest[end + 2..],
        None => markup,
    }
}

/// 把单个链接解析为绝对地址
///
/// - 已位于 base 之下的路径：原样返回（已改写过）
/// - 绝对 URL（http、data、mailto 等）：返回规范化形式
/// - 空值、纯锚点 `#id`：原样返回
/// - 其他相对路径：去掉开头的 `.` 与分隔符后拼到 base 下；
///   以 `../` 开头且下一层正是 base 的目录名时（如 `../Images/a.png` 对应 `.../Images`），不重复该层
pub fn resolve_local_url(value: &str, base: &Path) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return value.to_string();
    }

    let as_path = Path::new(trimmed);
    if as_path.is_absolute() && as_path.starts_with(base) {
        return value.to_string();
    }

    if let Ok(url) = Url::parse(trimmed) {
        return url.to_string();
    }

    let from_parent = trimmed.starts_with("../") || trimmed.starts_with("..\\");
    let relative = Path::new(
        trimmed
            .trim_start_matches('.')
            .trim_start_matches(|c: char| c == '/' || c == '\\'),
    );

    let resolved = match (base.file_name(), base.parent(), relative.components().next()) {
        (Some(dir), Some(parent), Some(first)) if from_parent && first.as_os_str() == dir => {
            parent.join(relative)
        }
        _ => base.join(relative),
    };
    resolved.to_string_lossy().into_owned()
}
