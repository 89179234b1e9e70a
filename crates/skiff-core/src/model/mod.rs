pub mod record;
pub mod snapshot;
pub mod table;
pub mod version;

pub use record::{record_key, Record, RecordKey};
pub use snapshot::{Snapshot, SnapshotStatus};
pub use table::{TableKeys, TableName};
pub use version::PlatformVersion;
