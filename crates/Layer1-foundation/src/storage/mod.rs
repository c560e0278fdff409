//! Storage module for Counsel
//!
//! - `json`: JSON 설정 파일 읽기 (global / project)

mod json;

pub use json::{read_json, ConfigScope, JsonStore};
