//! 临时文件名生成。
//!
//! 临时文件始终与目标文件位于同一目录，保证随后的 rename
//! 发生在同一文件系统内，从而是原子的。
//!
//! 文件名格式：`<prefix>-<base32(10 字节随机数)>.tmp`

use std::path::{Component, Path, PathBuf};

use rand::{RngCore, rngs::OsRng};

use crate::error::{AtomicIoError, Result};

/// 随机字节数（80 bit 熵，无需协调即可忽略碰撞概率）
pub const RANDOM_BYTES: usize = 10;

/// 编码后长度：80 bit / 5 bit，恰好无填充
pub const ENCODED_LEN: usize = RANDOM_BYTES * 8 / 5;

/// RFC 4648 base32 字母表（小写）
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// 为 `target` 生成同目录下的临时文件路径
///
/// #### 错误
/// - 路径为空、以分隔符结尾、或没有文件名部分：`InvalidPath`
/// - 前缀不是单个普通文件名组件（含分隔符、绝对路径、`.` / `..`、空串）：`InvalidPrefix`
/// - 系统随机源不可用：`EntropySource`
pub fn make_temp_name(target: &Path, prefix: &str) -> Result<PathBuf> {
    let invalid = || AtomicIoError::InvalidPath {
        path: target.to_path_buf(),
    };

    if target.as_os_str().is_empty() || ends_with_separator(target) {
        return Err(invalid());
    }

    let cleaned = clean(target);
    if cleaned.file_name().is_none() {
        return Err(invalid());
    }
    let dir = cleaned.parent().unwrap_or_else(|| Path::new(""));

    // 前缀只能是文件名的一部分，否则 join 后会离开目标目录
    if !is_plain_prefix(prefix) {
        return Err(AtomicIoError::InvalidPrefix {
            prefix: prefix.to_owned(),
        });
    }

    let mut random_bytes = [0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut random_bytes)
        .map_err(AtomicIoError::EntropySource)?;

    let name = format!("{prefix}-{}.tmp", encode_base32(&random_bytes));
    Ok(dir.join(name))
}

/// 去掉 `.` 组件与多余分隔符；`..` 保留，不做解析
fn clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn is_plain_prefix(prefix: &str) -> bool {
    if prefix.chars().any(std::path::is_separator) {
        return false;
    }

    let mut components = Path::new(prefix).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .last()
        .is_some_and(|&b| std::path::is_separator(b as char))
}

fn encode_base32(bytes: &[u8; RANDOM_BYTES]) -> String {
    let mut out = String::with_capacity(ENCODED_LEN);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let index = (buffer >> bits) & 0x1f;
            out.push(BASE32_ALPHABET[index as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn encodes_rfc4648_vector() {
        // "fooba" -> "MZXW6YTB"
        assert_eq!(encode_base32(b"foobafooba"), "mzxw6ytbmzxw6ytb");
        assert_eq!(encode_base32(&[0u8; RANDOM_BYTES]), "a".repeat(ENCODED_LEN));
        assert_eq!(encode_base32(&[0xffu8; RANDOM_BYTES]), "7".repeat(ENCODED_LEN));
    }

    #[test]
    fn temp_name_is_sibling_of_target() {
        let name = make_temp_name(Path::new("/var/data/config.json"), "temp").expect("temp name");
        assert_eq!(name.parent(), Some(Path::new("/var/data")));

        let file_name = name.file_name().and_then(|n| n.to_str()).expect("utf-8 name");
        assert!(file_name.starts_with("temp-"));
        assert!(file_name.ends_with(".tmp"));
        assert_eq!(file_name.len(), "temp-".len() + ENCODED_LEN + ".tmp".len());
        assert!(
            file_name["temp-".len()..]
                .trim_end_matches(".tmp")
                .bytes()
                .all(|b| BASE32_ALPHABET.contains(&b))
        );
    }

    #[test]
    fn relative_target_stays_relative() {
        let name = make_temp_name(Path::new("./out.bin"), "x").expect("temp name");
        assert_eq!(name.parent(), Some(Path::new("")));

        let nested = make_temp_name(Path::new("a/./b/out.bin"), "x").expect("temp name");
        assert_eq!(nested.parent(), Some(Path::new("a/b")));
    }

    #[test]
    fn rejects_directory_like_targets() {
        for bad in ["", "/", "dir/", ".", "..", "a/.."] {
            let err = make_temp_name(Path::new(bad), "temp").expect_err(bad);
            assert!(matches!(err, AtomicIoError::InvalidPath { .. }), "{bad:?}: {err:?}");
        }
    }

    #[test]
    fn rejects_prefix_that_leaves_target_dir() {
        let target = Path::new("/var/data/config.json");
        for bad in ["a/b", "/abs", "/elsewhere/x", "..", ".", ""] {
            let err = make_temp_name(target, bad).expect_err(bad);
            assert!(matches!(err, AtomicIoError::InvalidPrefix { .. }), "{bad:?}: {err:?}");
        }

        let name = make_temp_name(target, "..staging").expect("dots inside a name are fine");
        assert_eq!(name.parent(), Some(Path::new("/var/data")));
    }

    #[test]
    fn names_do_not_repeat() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let name = make_temp_name(Path::new("/tmp"), "temp").expect("temp name");
            assert!(seen.insert(name), "repeated file name");
        }
    }
}
