//! API Module - page message contract

mod command;
pub mod dto;

pub use command::Command;
pub use dto::RawMessage;
