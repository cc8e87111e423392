use tower_lsp::lsp_types::Position;

/// Maps between byte offsets and LSP `Position` (line, character).
///
/// LSP positions use zero-based lines and UTF-16 code unit offsets,
/// while our spans are byte offsets into UTF-8 source. This struct
/// pre-computes line start offsets for bidirectional conversion.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of each line start. `line_starts[0]` is always 0.
    line_starts: Vec<usize>,
    /// The full source text (needed for UTF-16 offset computation).
    source: String,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex {
            line_starts,
            source: source.to_string(),
        }
    }

    /// Converts a byte offset to an LSP `Position`.
    pub fn position(&self, byte_offset: usize) -> Position {
        let byte_offset = byte_offset.min(self.source.len());

        let line = self
            .line_starts
            .partition_point(|&start| start <= byte_offset)
            .saturating_sub(1);

        let line_start = self.line_starts[line];
        let line_text = &self.source[line_start..byte_offset];
        let character = line_text.encode_utf16().count() as u32;

        Position {
            line: line as u32,
            character,
        }
    }

    /// Converts an LSP `Position` to a byte offset.
    pub fn offset(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return self.source.len();
        }

        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.source.len());

        let line_text = &self.source[line_start..line_end];
        let mut utf16_offset = 0u32;
        let target = position.character;

        for (byte_idx, ch) in line_text.char_indices() {
            if utf16_offset >= target {
                return line_start + byte_idx;
            }
            utf16_offset += ch.len_utf16() as u32;
        }

        line_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let idx = LineIndex::new("hello world");
        assert_eq!(idx.position(0), Position { line: 0, character: 0 });
        assert_eq!(idx.position(5), Position { line: 0, character: 5 });
    }

    #[test]
    fn multi_line() {
        let idx = LineIndex::new("abc\ndef\nghi");
        assert_eq!(idx.position(4), Position { line: 1, character: 0 });
        assert_eq!(idx.position(8), Position { line: 2, character: 0 });
    }

    #[test]
    fn roundtrip() {
        let src = "let x = \"v\"\nprint x\n";
        let idx = LineIndex::new(src);
        for offset in 0..src.len() {
            let pos = idx.position(offset);
            assert_eq!(idx.offset(pos), offset, "roundtrip failed at {offset}");
        }
    }

    #[test]
    fn multibyte_utf8() {
        // 'é' is 2 bytes in UTF-8 but 1 UTF-16 code unit.
        let src = "caf\u{e9}\n\"x\"";
        let idx = LineIndex::new(src);
        let pos = idx.position(6);
        assert_eq!(pos, Position { line: 1, character: 0 });
        assert_eq!(idx.offset(pos), 6);
    }

    #[test]
    fn out_of_bounds_is_clamped() {
        let idx = LineIndex::new("abc");
        assert_eq!(idx.position(100), Position { line: 0, character: 3 });
        assert_eq!(idx.offset(Position { line: 5, character: 0 }), 3);
    }
}
