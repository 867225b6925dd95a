//! Flow capture records and their loaders.

pub mod reader;
pub mod types;

pub use reader::{parse_labeled_records, read_labeled_file, LABELED_FIELDS};
pub use types::{Category, FlowRecord, LabeledRecord, UnknownCategory};
