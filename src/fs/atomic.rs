//! 原子写入文件。
//!
//! 提供「先写临时文件，提交时再 rename 替换目标文件」的写出语义，
//! 读者在任何时刻看到的目标文件要么是旧的完整内容，要么是新的完整内容，
//! 不会出现半写入状态。
//!
//! 状态迁移（单向，不可回退）：
//!
//! ```text
//! Open ──commit──> ClosedUncommitted ──rename 成功──> Committed
//!                                    └─rename 失败──> FailedAfterRename
//! Open / ClosedUncommitted ──close / drop──> Abandoned
//! ```
//!
//! 注意：
//! - 同一个 `AtomicFile` 的写入 / 提交 / 关闭需由调用方串行执行
//! - 不保证父目录项落盘

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use tracing::{debug, warn};

use crate::error::{AtomicIoError, Result};
use crate::fs::options::AtomicFileOptions;
use crate::fs::temp_name::make_temp_name;

/// `AtomicFile` 的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// 临时文件已打开，可写入
    Open,
    /// 数据已落盘、句柄已关闭，尚未 rename
    ClosedUncommitted,
    /// 已 rename 到目标路径
    Committed,
    /// rename 失败，临时文件已删除；只能从 `create` 重新开始
    FailedAfterRename,
    /// 已放弃，临时文件已删除，目标路径未被修改
    Abandoned,
}

/// 句柄只存在于 `Open` 中，其余状态下无法写入。
#[derive(Debug)]
enum Inner {
    Open(BufWriter<File>),
    ClosedUncommitted,
    Committed,
    FailedAfterRename,
    Abandoned,
}

impl Inner {
    fn state(&self) -> FileState {
        match self {
            Self::Open(_) => FileState::Open,
            Self::ClosedUncommitted => FileState::ClosedUncommitted,
            Self::Committed => FileState::Committed,
            Self::FailedAfterRename => FileState::FailedAfterRename,
            Self::Abandoned => FileState::Abandoned,
        }
    }
}

/// 一次进行中的原子写入。
///
/// 通过 `std::io::Write` 写入，`commit` 提交，`close` 放弃。
/// 未提交就被 drop 时会自动放弃并删除临时文件。
#[derive(Debug)]
pub struct AtomicFile {
    target_path: PathBuf,
    temp_path: PathBuf,
    inner: Inner,
    /// 测试用：下一次 commit 在 fsync 前以该错误失败
    #[cfg(test)]
    fail_next_sync: Option<io::ErrorKind>,
}

impl AtomicFile {
    /// 在 `target` 同目录下创建临时文件，提交时 rename 为 `target`。
    pub fn create<P: AsRef<Path>>(target: P, permissions: u32) -> Result<Self> {
        AtomicFileOptions::new()
            .permissions(permissions)
            .create(target)
    }

    pub(crate) fn create_with(target: &Path, options: &AtomicFileOptions) -> Result<Self> {
        Self::create_from_names(target, options, || make_temp_name(target, &options.prefix))
    }

    /// 逐个尝试 `next_name` 给出的临时路径，直到独占创建成功。
    fn create_from_names<F>(
        target: &Path,
        options: &AtomicFileOptions,
        mut next_name: F,
    ) -> Result<Self>
    where
        F: FnMut() -> Result<PathBuf>,
    {
        for attempt in 1..=options.max_attempts {
            let temp_path = next_name()?;

            match open_exclusive(&temp_path, options.permissions) {
                Ok(file) => {
                    debug!(
                        path = %target.display(),
                        temp = %temp_path.display(),
                        "created temp file"
                    );
                    return Ok(Self {
                        target_path: target.to_path_buf(),
                        temp_path,
                        inner: Inner::Open(BufWriter::new(file)),
                        #[cfg(test)]
                        fail_next_sync: None,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(temp = %temp_path.display(), attempt, "temp file name taken, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AtomicIoError::ExhaustedRetries {
            target: target.to_path_buf(),
            attempts: options.max_attempts,
        })
    }

    /// 提交后为目标路径，否则为临时文件路径
    pub fn name(&self) -> &Path {
        match self.inner {
            Inner::Committed => &self.target_path,
            _ => &self.temp_path,
        }
    }

    /// 目标路径
    pub fn original_name(&self) -> &Path {
        &self.target_path
    }

    pub fn state(&self) -> FileState {
        self.inner.state()
    }

    /// 将已写入的数据落盘并原子替换目标文件。
    ///
    /// #### 错误
    /// - 重复提交：`AlreadyCommitted`
    /// - 已放弃或 rename 已失败：`InvalidState`
    /// - flush / fsync 失败：`Io`，状态保持 `Open`，可重试或 `close`
    /// - rename 失败：`Rename`，临时文件已删除，状态为 `FailedAfterRename`
    pub fn commit(&mut self) -> Result<()> {
        let state = self.state();
        match state {
            FileState::Committed => return Err(AtomicIoError::AlreadyCommitted),
            FileState::FailedAfterRename | FileState::Abandoned => {
                return Err(AtomicIoError::InvalidState {
                    operation: "commit",
                    state,
                });
            }
            FileState::Open | FileState::ClosedUncommitted => {}
        }

        if let Inner::Open(writer) = &mut self.inner {
            writer.flush()?;
            #[cfg(test)]
            if let Some(kind) = self.fail_next_sync.take() {
                return Err(io::Error::from(kind).into());
            }
            writer.get_ref().sync_all()?;
            // 替换掉 Open 即关闭文件句柄
            self.inner = Inner::ClosedUncommitted;
        }

        match fs::rename(&self.temp_path, &self.target_path) {
            Ok(()) => {
                self.inner = Inner::Committed;
                debug!(path = %self.target_path.display(), "committed");
                Ok(())
            }
            Err(source) => {
                let cleanup = fs::remove_file(&self.temp_path).err();
                self.inner = Inner::FailedAfterRename;
                Err(AtomicIoError::Rename {
                    from: self.temp_path.clone(),
                    to: self.target_path.clone(),
                    source,
                    cleanup,
                })
            }
        }
    }

    /// 放弃本次写入。
    ///
    /// - 未提交：关闭句柄并删除临时文件，目标路径不变
    /// - 已提交 / 已放弃：无操作
    /// - rename 失败后：始终返回 `InvalidState`，调用方必须处理 `commit` 的错误
    pub fn close(&mut self) -> Result<()> {
        let state = self.state();
        match state {
            FileState::Open | FileState::ClosedUncommitted => self.abandon(),
            FileState::FailedAfterRename => Err(AtomicIoError::InvalidState {
                operation: "close",
                state,
            }),
            FileState::Committed | FileState::Abandoned => Ok(()),
        }
    }

    fn abandon(&mut self) -> Result<()> {
        if let Inner::Open(writer) = mem::replace(&mut self.inner, Inner::Abandoned) {
            // 缓冲区中未写出的数据直接丢弃
            let (file, _unflushed) = writer.into_parts();
            drop(file);
        }

        fs::remove_file(&self.temp_path)?;
        debug!(temp = %self.temp_path.display(), "abandoned temp file");
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> io::Error {
        AtomicIoError::InvalidState {
            operation,
            state: self.state(),
        }
        .into()
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Inner::Open(writer) = &mut self.inner {
            return writer.write(buf);
        }
        Err(self.invalid_state("write"))
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Inner::Open(writer) = &mut self.inner {
            return writer.flush();
        }
        Err(self.invalid_state("flush"))
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !matches!(
            self.state(),
            FileState::Open | FileState::ClosedUncommitted
        ) {
            return;
        }

        if let Err(err) = self.abandon() {
            warn!(
                temp = %self.temp_path.display(),
                error = %err,
                "failed to remove abandoned temp file"
            );
        }
    }
}

fn open_exclusive(path: &Path, permissions: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);

    #[cfg(unix)]
    options.mode(permissions);
    #[cfg(not(unix))]
    let _ = permissions;

    options.open(path)
}
