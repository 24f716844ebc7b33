//! Quarantine storage for unsafe uploads.
//!
//! Files that fail the publication policy are withheld here until a
//! reviewer restores them.

mod filesystem;
mod memory;
mod record;
mod traits;

pub use filesystem::FilesystemQuarantine;
pub use memory::InMemoryQuarantine;
pub use record::{QuarantineFilter, QuarantineId, QuarantineRecord};
pub use traits::QuarantineStore;
