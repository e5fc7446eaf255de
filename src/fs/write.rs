//! 一次性原子写文件。
//!
//! 流程：
//! 1. 在目标目录创建临时文件；
//! 2. 写入全部数据；
//! 3. 提交（fsync + rename）；
//! 4. 无论成功与否都执行 `close`，保证不遗留临时文件。

use std::io::{self, Write};
use std::path::Path;

use crate::error::{AtomicIoError, Result};
use crate::fs::atomic::AtomicFile;
use crate::fs::options::AtomicFileOptions;

/// 将 `data` 原子写入 `target`，权限位为 `permissions`。
pub fn write_file<P: AsRef<Path>>(target: P, data: &[u8], permissions: u32) -> Result<()> {
    write_file_with(target, data, AtomicFileOptions::new().permissions(permissions))
}

/// 同 `write_file`，使用自定义参数。
pub fn write_file_with<P: AsRef<Path>>(
    target: P,
    data: &[u8],
    options: &AtomicFileOptions,
) -> Result<()> {
    let mut file = options.create(target)?;

    let result = write_all_counted(&mut file, data).and_then(|()| file.commit());

    // 提交成功后 close 为空操作；失败路径上负责删除临时文件。
    // rename 失败后 close 必然报 InvalidState，此时以 commit 的错误为准。
    match (result, file.close()) {
        (Err(err), _) => Err(err),
        (Ok(()), close) => close,
    }
}

/// 写入全部数据，写入返回 0 时报告已写字节数。
fn write_all_counted<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    let mut written = 0;

    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err(AtomicIoError::ShortWrite {
                    written,
                    expected: data.len(),
                });
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
