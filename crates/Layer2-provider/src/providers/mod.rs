//! Model backend implementations

pub mod gemini;
