//! Incremental parser for Ollama's streamed generate responses
//!
//! The response body is a sequence of JSON objects that may be split at
//! arbitrary byte boundaries. Objects are extracted with a single-pass
//! bracket matcher that ignores braces inside string literals.

use serde::Deserialize;

use crate::errors::{RagError, Result};

/// Maximum buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// One object from the `/api/generate` stream
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Incremental chunk parser
#[derive(Debug)]
pub struct ChunkParser {
    buffer: Vec<u8>,
    max_buffer_size: usize,
}

impl ChunkParser {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
        }
    }

    /// Add bytes and return every chunk completed by them, in order
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<GenerateChunk>> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(RagError::GenerationFailure(format!(
                "stream buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(json) = self.next_object()? {
            let chunk: GenerateChunk = serde_json::from_str(&json).map_err(|e| {
                RagError::GenerationFailure(format!("malformed stream chunk: {}", e))
            })?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    /// Pop the next complete JSON object off the buffer
    fn next_object(&mut self) -> Result<Option<String>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        if let Some((start, end)) = self.find_complete_json()? {
            let json = String::from_utf8_lossy(&self.buffer[start..=end]).to_string();
            self.buffer.drain(..=end);
            return Ok(Some(json));
        }

        Ok(None)
    }

    /// Bracket matching; returns the byte span of the first complete object
    fn find_complete_json(&self) -> Result<Option<(usize, usize)>> {
        let mut depth: i32 = 0;
        let mut start: Option<usize> = None;
        let mut in_string = false;
        let mut escape_next = false;

        // Multi-byte UTF-8 sequences never contain ASCII braces or quotes.
        for (i, &byte) in self.buffer.iter().enumerate() {
            if escape_next {
                escape_next = false;
                continue;
            }

            if byte == b'\\' && in_string {
                escape_next = true;
                continue;
            }

            if byte == b'"' {
                in_string = !in_string;
                continue;
            }

            if in_string {
                continue;
            }

            match byte {
                b'{' => {
                    if depth == 0 {
                        start = Some(i);
                    }
                    depth += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(RagError::GenerationFailure(
                            "mismatched braces in stream".to_string(),
                        ));
                    }
                    if depth == 0 {
                        if let Some(s) = start {
                            return Ok(Some((s, i)));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(None)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Whether only whitespace is left unparsed
    pub fn is_drained(&self) -> bool {
        self.buffer.iter().all(|b| b.is_ascii_whitespace())
    }
}

impl Default for ChunkParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndjson_lines() {
        let mut parser = ChunkParser::new();
        let data = "{\"response\":\"Hel\",\"done\":false}\n{\"response\":\"lo\",\"done\":false}\n";

        let chunks = parser.push(data.as_bytes()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].response, "Hel");
        assert_eq!(chunks[1].response, "lo");
        assert!(parser.is_drained());
    }

    #[test]
    fn test_split_across_pushes() {
        let mut parser = ChunkParser::new();

        assert!(parser.push(br#"{"response":"a{b"#).unwrap().is_empty());
        let chunks = parser.push(br#"}c","done":true}"#).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].response, "a{b}c");
        assert!(chunks[0].done);
    }

    #[test]
    fn test_escaped_quotes() {
        let mut parser = ChunkParser::new();
        let chunks = parser
            .push(br#"{"response":"say \"hi\" {","done":false}"#)
            .unwrap();
        assert_eq!(chunks[0].response, "say \"hi\" {");
    }

    #[test]
    fn test_multibyte_split() {
        let mut parser = ChunkParser::new();
        let data = "{\"response\":\"你好\",\"done\":false}".as_bytes();
        let (head, tail) = data.split_at(15);

        assert!(parser.push(head).unwrap().is_empty());
        let chunks = parser.push(tail).unwrap();
        assert_eq!(chunks[0].response, "你好");
    }

    #[test]
    fn test_error_chunk() {
        let mut parser = ChunkParser::new();
        let chunks = parser.push(br#"{"error":"model not found"}"#).unwrap();
        assert_eq!(chunks[0].error.as_deref(), Some("model not found"));
    }

    #[test]
    fn test_buffer_overflow() {
        let mut parser = ChunkParser::with_capacity(100);
        let result = parser.push(&vec![b'a'; 150]);
        assert!(matches!(result, Err(RagError::GenerationFailure(_))));
    }

    #[test]
    fn test_partial_object_is_retained() {
        let mut parser = ChunkParser::new();
        parser.push(br#"{"response":"#).unwrap();
        assert!(!parser.is_drained());
        assert!(parser.buffer_size() > 0);
    }
}
