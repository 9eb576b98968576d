//! Log line classification
//!
//! - `catalog` - ordered error and permission signatures with severities
//! - `classifier` - turns one raw logcat line into a `LogEvent`, or nothing
//! - `event` - the event record and its forwarded wire form

pub mod catalog;
pub mod classifier;
pub mod event;

pub use catalog::{
    ClassificationRule, ErrorKind, PatternCatalog, PermissionKind, PermissionRule, Severity,
};
pub use classifier::{classify_line, extract_package_name, split_log_line, LineClassifier};
pub use event::{ForwardedEvent, LogEvent, EVENT_MESSAGE_TYPE, EVENT_SOURCE};
