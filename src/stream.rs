//! Incremental decoding of streamed tutor answers.
//!
//! The backend streams plain UTF-8 text. Chunks arrive on arbitrary byte
//! boundaries, and the answer ends with an out-of-band segment introduced by
//! [`SOURCES_MARKER`] that carries citation metadata. This module turns the
//! raw byte stream into text chunks and assembles them into the text that is
//! shown to the user.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::Result;
use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS};
use crate::types::SourceCitation;

/// Delimiter between the answer text and the trailing citation metadata.
pub const SOURCES_MARKER: &str = "__SOURCES__:";

/// A response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

///////////////////////////////////////// Utf8ChunkDecoder ////////////////////////////////////////

/// Stream-aware UTF-8 decoder.
///
/// A multi-byte character split across two chunks is held back until the
/// rest of it arrives. Invalid sequences decode to U+FFFD rather than
/// failing the stream.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, returning all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());
        let mut input = &self.pending[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    text.push_str(valid);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes.
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }
        let consumed = self.pending.len() - input.len();
        self.pending.drain(..consumed);
        text
    }

    /// Flushes the decoder at end of stream.
    ///
    /// A dangling partial character becomes a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Returns true if bytes of an incomplete character are buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Decodes a byte stream into a stream of text chunks.
///
/// Empty decodes (a chunk holding only part of a character) are skipped.
/// Errors from the underlying stream are passed through and end nothing by
/// themselves; callers stop reading on the first error.
pub fn decode_text_stream(byte_stream: ByteStream) -> impl Stream<Item = Result<String>> + Send {
    let decoder = Utf8ChunkDecoder::new();

    stream::unfold(
        (byte_stream, decoder, false),
        move |(mut stream, mut decoder, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_CHUNKS.click();
                        STREAM_BYTES.count(bytes.len() as u64);
                        let text = decoder.decode(&bytes);
                        if !text.is_empty() {
                            return Some((Ok(text), (stream, decoder, false)));
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, decoder, false)));
                    }
                    None => {
                        // End of stream
                        let tail = decoder.finish();
                        if tail.is_empty() {
                            return None;
                        }
                        return Some((Ok(tail), (stream, decoder, true)));
                    }
                }
            }
        },
    )
}

//////////////////////////////////////// ResponseAssembler ////////////////////////////////////////

/// Accumulates decoded chunks of one answer.
///
/// [`visible`](Self::visible) is the text stored in the conversation: the
/// buffer truncated at the first [`SOURCES_MARKER`]. If the model itself
/// writes the marker before the real one, everything after it is hidden.
///
/// A terminal cannot take back printed text, so the assembler also tracks a
/// print cursor. [`take_stable`](Self::take_stable) never releases a
/// trailing suffix that could still grow into the marker.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    buffer: String,
    printed: usize,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a decoded chunk.
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// The answer text as it should appear in the conversation.
    pub fn visible(&self) -> &str {
        match self.buffer.find(SOURCES_MARKER) {
            Some(idx) => &self.buffer[..idx],
            None => &self.buffer,
        }
    }

    /// The raw segment after the marker, if the marker has arrived.
    pub fn sources_segment(&self) -> Option<&str> {
        self.buffer
            .find(SOURCES_MARKER)
            .map(|idx| &self.buffer[idx + SOURCES_MARKER.len()..])
    }

    /// Parses the citation metadata.
    ///
    /// Returns an empty list when no marker arrived and `None` when the
    /// segment is malformed.
    pub fn sources(&self) -> Option<Vec<SourceCitation>> {
        match self.sources_segment() {
            Some(segment) => SourceCitation::parse_list(segment),
            None => Some(Vec::new()),
        }
    }

    /// Returns true once the marker has been seen.
    pub fn has_marker(&self) -> bool {
        self.buffer.contains(SOURCES_MARKER)
    }

    /// Returns the newly printable text and advances the print cursor.
    pub fn take_stable(&mut self) -> String {
        let end = self.stable_len().max(self.printed);
        let delta = self.buffer[self.printed..end].to_string();
        self.printed = end;
        delta
    }

    /// Returns the visible text that has not been printed yet.
    ///
    /// Call at end of stream: any held-back suffix that never became the
    /// marker is real answer text.
    pub fn take_remaining(&mut self) -> String {
        let visible_len = self.visible().len();
        if visible_len <= self.printed {
            return String::new();
        }
        let delta = self.buffer[self.printed..visible_len].to_string();
        self.printed = visible_len;
        delta
    }

    /// Length of the prefix that can be printed without ever being retracted.
    fn stable_len(&self) -> usize {
        if let Some(idx) = self.buffer.find(SOURCES_MARKER) {
            return idx;
        }
        // The marker is ASCII, so any matching suffix starts on a char boundary.
        for k in (1..SOURCES_MARKER.len()).rev() {
            if self.buffer.ends_with(&SOURCES_MARKER[..k]) {
                return self.buffer.len() - k;
            }
        }
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk)))
                .collect::<Vec<_>>(),
        ))
    }

    #[test]
    fn decoder_joins_split_characters() {
        let mut decoder = Utf8ChunkDecoder::new();
        let bytes = "naïve café".as_bytes();
        // Split inside the two-byte 'ï'.
        let split = 3;
        let mut text = decoder.decode(&bytes[..split]);
        assert!(decoder.has_pending());
        text.push_str(&decoder.decode(&bytes[split..]));
        text.push_str(&decoder.finish());
        assert_eq!(text, "naïve café");
    }

    #[test]
    fn decoder_handles_four_byte_characters_one_byte_at_a_time() {
        let mut decoder = Utf8ChunkDecoder::new();
        let mut text = String::new();
        for byte in "a🦀b".as_bytes() {
            text.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        assert_eq!(text, "a🦀b");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"ok\xffok"), "ok\u{FFFD}ok");
        assert_eq!(decoder.decode(b"\xe2\x82"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn assembler_truncates_at_marker() {
        let mut assembler = ResponseAssembler::new();
        assembler.push("Hello ");
        assert_eq!(assembler.visible(), "Hello ");
        assembler.push("world__SOURCES__:");
        assert_eq!(assembler.visible(), "Hello world");
        assembler.push("{meta}");
        assert_eq!(assembler.visible(), "Hello world");
        assert_eq!(assembler.sources_segment(), Some("{meta}"));
        assert_eq!(assembler.sources(), None);
    }

    #[test]
    fn assembler_uses_first_marker() {
        let mut assembler = ResponseAssembler::new();
        assembler.push("a__SOURCES__:b__SOURCES__:[]");
        assert_eq!(assembler.visible(), "a");
        assert_eq!(assembler.sources_segment(), Some("b__SOURCES__:[]"));
    }

    #[test]
    fn assembler_parses_sources() {
        let mut assembler = ResponseAssembler::new();
        assembler.push("Answer\n\n__SOURCES__:[{\"doc_id\":\"d1\",\"doc_name\":\"ch1.pdf\",\"chunk_text\":\"...\"}]");
        let sources = assembler.sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].doc_id, "d1");
        assert!(assembler.has_marker());
    }

    #[test]
    fn stable_text_never_includes_partial_marker() {
        let mut assembler = ResponseAssembler::new();
        assembler.push("Hello wor");
        assert_eq!(assembler.take_stable(), "Hello wor");
        assembler.push("ld__SOU");
        assert_eq!(assembler.take_stable(), "ld");
        assembler.push("RCES__:[]");
        assert_eq!(assembler.take_stable(), "");
        assert_eq!(assembler.take_remaining(), "");
        assert_eq!(assembler.visible(), "Hello world");
    }

    #[test]
    fn held_back_text_is_released() {
        let mut assembler = ResponseAssembler::new();
        assembler.push("snake_case uses _");
        assert_eq!(assembler.take_stable(), "snake_case uses ");
        assembler.push("underscores");
        assert_eq!(assembler.take_stable(), "_underscores");
        assembler.push(" __");
        assert_eq!(assembler.take_stable(), " ");
        assert_eq!(assembler.take_remaining(), "__");
        assert_eq!(assembler.visible(), "snake_case uses _underscores __");
    }

    #[tokio::test]
    async fn text_stream_decodes_across_chunks() {
        // "€" is e2 82 ac.
        let chunks: Vec<&'static [u8]> =
            vec![&b"cost: "[..], &b"\xe2"[..], &b"\x82\xac"[..], &b"5"[..]];
        let texts: Vec<String> = decode_text_stream(byte_stream(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(texts, vec!["cost: ", "€", "5"]);
    }

    #[tokio::test]
    async fn text_stream_passes_errors_through() {
        let items: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::streaming("connection reset", None)),
        ];
        let mut texts = Box::pin(decode_text_stream(Box::pin(stream::iter(items))));
        assert_eq!(texts.next().await.unwrap().unwrap(), "partial");
        assert!(texts.next().await.unwrap().unwrap_err().is_stream());
    }
}
