use serde_json::Value;

use crate::events::ChatStreamEvent;

/// Incremental parser for newline-delimited JSON chat streams.
///
/// A trailing partial line is retained across [`NdjsonStreamParser::feed`]
/// calls; only lines terminated by `\n` are consumed. The buffer holds raw
/// bytes, so a multi-byte UTF-8 character split across transport chunks is
/// reassembled before text conversion.
#[derive(Debug, Default)]
pub struct NdjsonStreamParser {
    buffer: Vec<u8>,
}

impl NdjsonStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete records.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChatStreamEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(0..split + 1).collect();
            decode_record(String::from_utf8_lossy(&line[..split]).trim(), &mut events);
        }

        events
    }

    /// Drain a final record that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<ChatStreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        decode_record(String::from_utf8_lossy(&rest).trim(), &mut events);
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn decode_record(line: &str, events: &mut Vec<ChatStreamEvent>) {
    if line.is_empty() {
        return;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(_) => {
            events.push(ChatStreamEvent::Malformed {
                raw_line: line.to_string(),
            });
            return;
        }
    };

    // One record may carry both a token and the done flag; content is
    // emitted first, matching consumption order.
    if let Some(text) = value
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
    {
        if !text.is_empty() {
            events.push(ChatStreamEvent::ContentDelta {
                text: text.to_owned(),
            });
        }
    }

    if value.get("done").and_then(Value::as_bool) == Some(true) {
        events.push(ChatStreamEvent::Done);
    }
}
