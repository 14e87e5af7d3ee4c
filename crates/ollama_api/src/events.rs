/// Stream event emitted by the decoder after line assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// One incremental unit of generated text.
    ContentDelta { text: String },
    /// The backend signalled end-of-stream.
    Done,
    /// A record that failed to parse. Skipped, never fatal.
    Malformed { raw_line: String },
}
