use crate::models::Chunk;
use std::iter::FusedIterator;
use std::str::Lines;

/// Lazy iterator over the non-blank lines of a text, trimmed, in source order.
/// Call [`chunk_lines`] again to restart from the first line.
#[derive(Debug, Clone)]
pub struct LineChunks<'a> {
    lines: Lines<'a>,
}

impl<'a> Iterator for LineChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.by_ref().map(str::trim).find(|line| !line.is_empty())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.lines.size_hint().1)
    }
}

impl FusedIterator for LineChunks<'_> {}

pub fn chunk_lines(text: &str) -> LineChunks<'_> {
    LineChunks {
        lines: text.lines(),
    }
}

pub fn build_chunks(document_id: Option<&str>, text: &str) -> Vec<Chunk> {
    chunk_lines(text)
        .zip(0u64..)
        .map(|(line, position)| Chunk {
            document_id: document_id.map(str::to_string),
            position,
            text: line.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_dropped_and_text_is_trimmed() {
        let chunks = chunk_lines("Hello world\n\n  \nSecond line\n").collect::<Vec<_>>();
        assert_eq!(chunks, vec!["Hello world", "Second line"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(chunk_lines("").count(), 0);
        assert_eq!(chunk_lines("\n \n\t\n").count(), 0);
    }

    #[test]
    fn input_without_newline_is_a_single_chunk() {
        let chunks = chunk_lines("   only one line  ").collect::<Vec<_>>();
        assert_eq!(chunks, vec!["only one line"]);
    }

    #[test]
    fn carriage_returns_are_line_boundaries() {
        let chunks = chunk_lines("first\r\nsecond\r\n").collect::<Vec<_>>();
        assert_eq!(chunks, vec!["first", "second"]);
    }

    #[test]
    fn sequence_can_be_restarted() {
        let text = "a\nb\n\nc";
        let first = chunk_lines(text).collect::<Vec<_>>();
        let second = chunk_lines(text).collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn chunk_count_matches_non_blank_lines() {
        let text = "alpha\n  \n beta \n\ngamma\n\t\ndelta";
        let expected = text.lines().filter(|line| !line.trim().is_empty()).count();
        assert_eq!(chunk_lines(text).count(), expected);
    }

    #[test]
    fn built_chunks_carry_positions_and_document() {
        let chunks = build_chunks(Some("doc-1"), "\nfirst\n\nsecond");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].text, "first");
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].document_id.as_deref(), Some("doc-1"));
    }
}
