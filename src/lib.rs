pub mod batch;
pub mod config;
pub mod delivery_status;
pub mod error;
pub mod message;
pub mod normalization;
pub mod pattern_set;
pub mod provider;
pub mod reason;
pub mod rfc5322;
pub mod scanner;
pub mod smtp;

pub use config::Config;
pub use delivery_status::{BounceReport, DeliveryStatusRecord};
pub use error::ParseError;
pub use message::{split_message, Headers};
pub use normalization::normalize_diagnosis;
pub use pattern_set::{PatternSet, PatternSetConfig};
pub use provider::{BounceParser, Registry};
pub use reason::{classify, Reason};
