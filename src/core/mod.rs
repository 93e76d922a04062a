pub mod cancel;
pub mod chat_stream;
pub mod config;
pub mod history;
pub mod message;
pub mod session;
pub mod transcript;
