pub mod chat;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod files;
pub mod message;
