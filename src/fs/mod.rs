//! 原子文件写入：临时文件 + fsync + 同目录 rename。

pub mod atomic;
pub mod options;
pub mod temp_name;
pub mod write;
