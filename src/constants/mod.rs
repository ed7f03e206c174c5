pub mod embeds;
pub mod timeouts;
