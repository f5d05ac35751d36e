//! Object-style wrappers over filesystem paths: files, directories and
//! ad hoc groups of them, plus permission-string parsing and archive
//! helpers. Everything is synchronous blocking I/O with no caching; state
//! is read fresh from the OS on every query. The one consistency gap that
//! leaves open is the classic read-then-write race against external
//! processes, which is documented rather than engineered around.

pub mod archive;
pub mod entry;
pub mod group;
pub mod mode;
pub mod path;

// Public library API - the types a terminal session actually imports.
pub use archive::ArchiveFormat;
pub use entry::dir::DirEntry;
pub use entry::edit::CropBound;
pub use entry::file::FileEntry;
pub use entry::{Entry, EntryKind, Location};
pub use group::Group;
pub use mode::{Mode, ModeParseError};
pub use path::Workdir;
