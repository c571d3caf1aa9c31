pub mod config;
pub mod digest;
pub mod domain;
pub mod error;
pub mod mail;
pub mod narration;
pub mod pipeline;
