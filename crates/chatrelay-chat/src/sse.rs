//! Server-sent-event decoding for the Responses API stream.
//!
//! The decoder buffers raw bytes and only decodes complete lines, so a
//! multi-byte character split across network chunks survives intact.

use chatrelay_core::{Error, Result};

use crate::types::ResponseEvent;

/// Incremental SSE decoder yielding the `data` payload of each event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes. Returns the payloads of every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(&['\n', '\r'][..]);

            if line.is_empty() {
                if let Some(payload) = self.take_event() {
                    payloads.push(payload);
                }
                continue;
            }

            // Comments and the event/id/retry fields carry nothing we use;
            // the event kind is repeated in the JSON payload.
            if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        payloads
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches('\r');
            if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        self.take_event()
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

/// Decode one event payload.
///
/// Returns `Ok(None)` for the `[DONE]` sentinel and `Err` for upstream
/// `error` events or payloads that are not valid JSON.
pub fn parse_event(data: &str) -> Result<Option<ResponseEvent>> {
    if data.trim() == "[DONE]" {
        return Ok(None);
    }

    let parsed: serde_json::Value = serde_json::from_str(data)?;
    let kind = parsed["type"].as_str().unwrap_or_default();

    let event = match kind {
        "response.output_text.delta" => ResponseEvent::OutputTextDelta {
            delta: parsed["delta"].as_str().unwrap_or_default().to_string(),
        },
        "response.completed" => ResponseEvent::Completed,
        "error" => {
            let message = parsed["message"]
                .as_str()
                .or_else(|| parsed["error"]["message"].as_str())
                .unwrap_or("Unknown error");
            return Err(Error::Stream(message.to_string()));
        }
        other => ResponseEvent::Other {
            kind: other.to_string(),
        },
    };

    Ok(Some(event))
}
