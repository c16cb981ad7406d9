use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use zip::ZipArchive;

use crate::error::ImportError;

/// 解压后的 EPUB
///
/// 解压目录在导入结束后不会被清理，由运行环境负责
#[derive(Debug, Clone)]
pub struct StagedArchive {
    root: PathBuf,
}

impl StagedArchive {
    /// 解压根目录（绝对路径），用作链接改写的基准
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// 把 EPUB 解压到与源文件同级的新目录
///
/// 目录名 = 文件名 + 时间戳，同一文件重复导入不会冲突。
/// 解压失败不清理已解压的部分。
pub fn stage(archive_path: &Path) -> Result<StagedArchive, ImportError> {
    let staging_error = |reason: String| ImportError::Staging {
        path: archive_path.to_path_buf(),
        reason,
    };

    let source = fs::canonicalize(archive_path).map_err(|e| staging_error(e.to_string()))?;
    let parent = source
        .parent()
        .ok_or_else(|| staging_error("无法确定所在目录".to_string()))?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("epub");

    let root = create_unique_dir(parent, stem).map_err(|e| staging_error(e.to_string()))?;
    debug!("解压 {:?} -> {:?}", source, root);

    if let Err(e) = extract_all(&source, &root) {
        error!("解压 EPUB 失败 {:?}: {}", source, e);
        return Err(staging_error(e.to_string()));
    }

    Ok(StagedArchive { root })
}

/// 创建唯一目录：时间戳撞车时追加序号
fn create_unique_dir(parent: &Path, stem: &str) -> io::Result<PathBuf> {
    let base = format!("{}{}", stem, Local::now().format("%Y%m%d%H%M%S%f"));

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, attempt)
        };
        let candidate = parent.join(name);

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

fn extract_all(source: &Path, dest: &Path) -> Result<(), zip::result::ZipError> {
    let file = File::open(source)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    archive.extract(dest)
}
