// Codec Module
// Whole-file encryption and recursive directory processing

pub mod file;
pub mod walker;

pub use file::{FileCodec, FileOutcome, FileState, Mode};
pub use walker::{DirectoryWalker, WalkReport};
