//! 原子写入参数。
//!
//! 用法与 `std::fs::OpenOptions` 相同：链式设置后调用 `create`。

use std::path::Path;

use crate::error::Result;
use crate::fs::atomic::AtomicFile;

/// 默认临时文件名前缀
pub const DEFAULT_TEMP_PREFIX: &str = "temp";

/// 默认权限位（Unix 下受 umask 屏蔽）
pub const DEFAULT_PERMISSIONS: u32 = 0o666;

/// 临时文件名碰撞时的默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicFileOptions {
    pub(crate) prefix: String,
    pub(crate) permissions: u32,
    pub(crate) max_attempts: u32,
}

impl AtomicFileOptions {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_TEMP_PREFIX.to_owned(),
            permissions: DEFAULT_PERMISSIONS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// 只能是单个文件名组件，含分隔符时 `create` 返回 `InvalidPrefix`。
    pub fn prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefix = prefix.into();
        self
    }

    /// 临时文件创建时使用的权限位，rename 后保持不变。
    /// 非 Unix 平台忽略。
    pub fn permissions(&mut self, permissions: u32) -> &mut Self {
        self.permissions = permissions;
        self
    }

    /// 为 0 时 `create` 直接返回 `ExhaustedRetries`。
    pub fn max_attempts(&mut self, max_attempts: u32) -> &mut Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn create<P: AsRef<Path>>(&self, target: P) -> Result<AtomicFile> {
        AtomicFile::create_with(target.as_ref(), self)
    }
}

impl Default for AtomicFileOptions {
    fn default() -> Self {
        Self::new()
    }
}
