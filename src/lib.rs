pub mod error;
pub mod flag;
pub mod fs;

pub use error::{AtomicIoError, Result};
pub use flag::AtomicFlag;
pub use fs::atomic::{AtomicFile, FileState};
pub use fs::options::{
    AtomicFileOptions, DEFAULT_MAX_ATTEMPTS, DEFAULT_PERMISSIONS, DEFAULT_TEMP_PREFIX,
};
pub use fs::temp_name::make_temp_name;
pub use fs::write::{write_file, write_file_with};
