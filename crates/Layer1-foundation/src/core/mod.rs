//! Core Module - 핵심 타입
//!
//! 오케스트레이션 코어가 읽고 반환하는 데이터 모델입니다.
//! 어떤 타입도 영구 저장되지 않습니다 (프로세스 메모리 전용).

mod types;

pub use types::{
    BinaryPayload, CitationSource, ConversationTurn, ReferenceDocument, Speaker, TokenUsage,
};
