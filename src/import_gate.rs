use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 导入闸门
///
/// 单许可、非阻塞：同一时间只允许一个导入运行，
/// 第二次触发直接丢弃，不排队
#[derive(Clone)]
pub struct ImportGate {
    permits: Arc<Semaphore>,
}

/// 导入许可
///
/// 析构即释放（相当于 exit），取消选择文件或导入 panic 时同样会释放
#[derive(Debug)]
pub struct ImportPermit {
    _permit: OwnedSemaphorePermit,
}

impl ImportGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// 尝试进入
    ///
    /// # 返回
    /// - Some(permit): 获得许可
    /// - None: 已有导入在进行，立即返回
    pub fn try_enter(&self) -> Option<ImportPermit> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| ImportPermit { _permit: permit })
    }

    /// 是否有导入正在进行
    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for ImportGate {
    fn default() -> Self {
        Self::new()
    }
}
