//! Command implementations

pub mod client;
pub mod history;
pub mod init;
pub mod link;
pub mod material;
pub mod project;
pub mod quote;
pub mod tech;
pub mod wo;
