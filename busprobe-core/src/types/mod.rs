pub mod report;

pub use report::{BusReport, StorageOutcome, StorageReport, StorageStats};
