//! Chat backends: the client trait, HTTP implementations and the registry.

mod client;
mod registry;
pub mod sse;

#[cfg(feature = "http")]
pub mod anthropic;
#[cfg(feature = "http")]
pub mod openai_compat;

pub use client::{
    parse_json_content, token_channel, ChatClient, ChatRequest, ChatResponse, Message, Role,
    TokenReceiver, TokenSender,
};
pub use registry::ClientRegistry;

#[cfg(feature = "http")]
pub use anthropic::AnthropicClient;
#[cfg(feature = "http")]
pub use openai_compat::{default_base_url, OpenAiCompatClient};
