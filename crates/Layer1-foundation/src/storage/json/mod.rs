//! JSON 파일 기반 저장소

mod store;

pub use store::{read_json, ConfigScope, JsonStore};
