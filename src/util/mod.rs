// Utility Module
// File-system plumbing shared by the codec

pub mod file_ops;

pub use file_ops::{format_file_size, FileSystem, OsFileSystem};
