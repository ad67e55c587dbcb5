pub mod criteria;
pub mod source;
pub mod store;
pub mod traits;
pub mod types;

pub use criteria::matches_criteria;
pub use source::{parse_pin_records, source_for, FilePinSource, HttpPinSource, StaticPinSource};
pub use store::PinStore;
pub use traits::PinSource;
pub use types::{BackupDocument, BackupSettings, Criteria, PinDocument, PinStats, WILDCARD};
