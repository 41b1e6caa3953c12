use serde_json::Value;

use nutrisaur_types::events::CommunityEvent;

/// Result of decoding one event-stream `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(CommunityEvent),
    /// Well-formed envelope with a type this client does not know.
    Unknown { kind: String },
    Malformed(String),
}

pub fn decode(data: &str) -> Decoded {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => return Decoded::Malformed(e.to_string()),
    };

    let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_string) else {
        return Decoded::Malformed("missing event type".to_string());
    };

    if !CommunityEvent::KINDS.contains(&kind.as_str()) {
        return Decoded::Unknown { kind };
    }

    match serde_json::from_value(value) {
        Ok(event) => Decoded::Event(event),
        Err(e) => Decoded::Malformed(format!("{}: {}", kind, e)),
    }
}

/// Incremental `text/event-stream` parser. Yields the joined `data:` lines
/// of each complete event. Comments and other fields are skipped.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseParser {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }

        events
    }
}
