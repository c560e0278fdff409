//! Reference document formatting
//!
//! 참조 문서 묶음을 모델 프롬프트에 주입할 하나의 텍스트 블록으로 직렬화합니다.
//!
//! ```text
//! <reference_documents>
//! <document name="lease.txt" original_length="18250">
//! ...최대 max_chars 글자...
//! [TRUNCATED: showing 14000 of 18250 chars]
//! </document>
//! <document name="scan.pdf" mime_type="application/pdf" original_length="0">
//! [Binary document (application/pdf) attached separately]
//! </document>
//! </reference_documents>
//! ```
//!
//! 문서가 없으면 빈 문자열을 반환하며, 빈 래퍼 태그는 절대 출력하지 않습니다.

use counsel_foundation::config::DEFAULT_MAX_DOCUMENT_CHARS;
use counsel_foundation::ReferenceDocument;
use counsel_provider::Part;

const OPEN_WRAPPER: &str = "<reference_documents>";
const CLOSE_WRAPPER: &str = "</reference_documents>";

/// Serializes reference documents into a bounded context block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFormatter {
    max_chars: usize,
}

impl Default for ContextFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DOCUMENT_CHARS)
    }
}

impl ContextFormatter {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Render `documents` in order; empty input yields an empty string
    pub fn format(&self, documents: &[ReferenceDocument]) -> String {
        if documents.is_empty() {
            return String::new();
        }

        let mut out = String::from(OPEN_WRAPPER);
        out.push('\n');
        for document in documents {
            self.render_document(document, &mut out);
        }
        out.push_str(CLOSE_WRAPPER);
        out
    }

    /// Context block, a blank line, then the user text.
    ///
    /// Without documents the user text is returned verbatim.
    pub fn build_payload(&self, documents: &[ReferenceDocument], user_text: &str) -> String {
        let context = self.format(documents);
        if context.is_empty() {
            user_text.to_string()
        } else {
            format!("{}\n\n{}", context, user_text)
        }
    }

    /// Inline-data parts for the binary documents, in order
    pub fn binary_parts(&self, documents: &[ReferenceDocument]) -> Vec<Part> {
        documents
            .iter()
            .filter(|doc| doc.is_binary())
            .filter_map(|doc| doc.binary_payload.as_ref().map(Part::from))
            .collect()
    }

    fn render_document(&self, document: &ReferenceDocument, out: &mut String) {
        let name = attribute(&document.name);

        if document.is_binary() {
            let mime = attribute(&document.mime_type);
            out.push_str(&format!(
                "<document name=\"{}\" mime_type=\"{}\" original_length=\"0\">\n",
                name, mime
            ));
            out.push_str(&format!(
                "[Binary document ({}) attached separately]\n",
                mime
            ));
            out.push_str("</document>\n");
            return;
        }

        // 글자 단위로 자름 (바이트 경계 문제 방지)
        let original_length = document.text_content.chars().count();
        out.push_str(&format!(
            "<document name=\"{}\" original_length=\"{}\">\n",
            name, original_length
        ));

        if original_length > self.max_chars {
            let truncated: String = document.text_content.chars().take(self.max_chars).collect();
            out.push_str(&truncated);
            out.push_str(&format!(
                "\n[TRUNCATED: showing {} of {} chars]",
                self.max_chars, original_length
            ));
        } else {
            out.push_str(&document.text_content);
        }
        out.push_str("\n</document>\n");
    }
}

/// Keep attribute values on one line and inside their quotes
fn attribute(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}
