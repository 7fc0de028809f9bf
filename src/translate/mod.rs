//! Wire types and pure translation between the chat page and the model backends.
//!
//! Nothing in here performs I/O: requests are mapped into backend payloads,
//! and backend replies (whole or streamed) are decoded into plain text updates.

pub mod anthropic_types;
pub mod chat_types;
pub mod ollama_types;
pub mod request;
pub mod response;
pub mod streaming;
