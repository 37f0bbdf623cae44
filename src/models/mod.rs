pub mod filter;
pub mod log_entry;
pub mod package;

pub use filter::{FilterEntry, FilterMode};
pub use log_entry::LogEntry;
pub use package::{Icon, MountState, PackageDescriptor};
