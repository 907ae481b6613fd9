pub mod anthropic;
pub mod noop;
pub mod openai;
