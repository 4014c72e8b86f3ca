//! Server-Sent Events (SSE) parser for Gemini responses

use async_stream::stream;
use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

use crate::llm::core::error::LlmError;

use super::types::GenerateContentResponse;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

pub type ResponseStream =
    Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, LlmError>> + Send>>;

/// Parse a byte stream of `data: <json>` lines into Gemini response chunks
///
/// Bytes are buffered until a full line is available, so chunk boundaries
/// may fall anywhere, including inside a multi-byte UTF-8 sequence. A final
/// line without a trailing newline is still parsed when the stream ends.
pub fn parse_sse_stream(mut byte_stream: ByteStream) -> ResponseStream {
    Box::pin(stream! {
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(parsed) = parse_line(&line) {
                    yield parsed;
                }
            }
        }

        if let Some(parsed) = parse_line(&buffer) {
            yield parsed;
        }
    })
}

/// Parse one SSE line; `None` for blank lines and non-data fields
fn parse_line(line: &[u8]) -> Option<Result<GenerateContentResponse, LlmError>> {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim(),
        Err(e) => {
            return Some(Err(LlmError::StreamError(format!(
                "Invalid UTF-8 in stream: {}",
                e
            ))))
        }
    };

    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }

    Some(serde_json::from_str(data).map_err(|e| {
        LlmError::SerializationError(format!("Failed to parse SSE data: {}. Data: {}", e, data))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::gemini::types::Part;
    use futures::stream;

    fn bytes_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    fn first_text(response: &GenerateContentResponse) -> &str {
        match &response.candidates[0].content.as_ref().unwrap().parts[0] {
            Part::Text { text } => text,
            _ => panic!("Expected text part"),
        }
    }

    #[tokio::test]
    async fn test_parse_multiple_events() {
        let mut events = parse_sse_stream(bytes_stream(vec![
            b"data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hello\"}]}}]}\n\n",
            b"data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\" World\"}]}}]}\n",
        ]));

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first_text(&first), "Hello");
        let second = events.next().await.unwrap().unwrap();
        assert_eq!(first_text(&second), " World");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_chunk_split_inside_utf8_character() {
        // "°" is 0xC2 0xB0
        let mut events = parse_sse_stream(bytes_stream(vec![
            b"data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"25\xC2",
            b"\xB0C\"}]}}]}\n",
        ]));

        let response = events.next().await.unwrap().unwrap();
        assert_eq!(first_text(&response), "25°C");
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let mut events = parse_sse_stream(bytes_stream(vec![
            b"data:{\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"tail\"}]}}]}",
        ]));

        let response = events.next().await.unwrap().unwrap();
        assert_eq!(first_text(&response), "tail");
    }

    #[tokio::test]
    async fn test_ignores_non_data_fields() {
        let mut events = parse_sse_stream(bytes_stream(vec![b"event: ping\nid: 7\n\n"]));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let mut events = parse_sse_stream(bytes_stream(vec![b"data: {invalid json}\n"]));
        let result = events.next().await.unwrap();
        assert!(matches!(result, Err(LlmError::SerializationError(_))));
    }
}
