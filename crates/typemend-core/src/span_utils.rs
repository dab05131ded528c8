//! Byte-span helpers shared by checkers and builders.

/// Find the byte range of a line in content (1-indexed line numbers).
/// Returns (start_byte, end_byte) including the newline character.
pub(crate) fn line_byte_range(content: &str, line_number: usize) -> Option<(usize, usize)> {
    if line_number == 0 {
        return None;
    }

    let mut current_line = 1usize;
    let mut line_start = 0usize;

    for (idx, ch) in content.char_indices() {
        if current_line == line_number && ch == '\n' {
            return Some((line_start, idx + 1));
        }
        if ch == '\n' {
            current_line += 1;
            line_start = idx + 1;
        }
    }

    if current_line == line_number {
        Some((line_start, content.len()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_byte_range_includes_newline() {
        let content = "one\ntwo\nthree";
        assert_eq!(line_byte_range(content, 1), Some((0, 4)));
        assert_eq!(line_byte_range(content, 2), Some((4, 8)));
    }

    #[test]
    fn test_line_byte_range_last_line_without_newline() {
        let content = "one\ntwo\nthree";
        assert_eq!(line_byte_range(content, 3), Some((8, 13)));
    }

    #[test]
    fn test_line_byte_range_out_of_range() {
        assert_eq!(line_byte_range("one\n", 0), None);
        assert_eq!(line_byte_range("one\n", 3), None);
    }

    #[test]
    fn test_line_byte_range_empty_trailing_line() {
        // "one\n" has a second, empty line after the newline.
        assert_eq!(line_byte_range("one\n", 2), Some((4, 4)));
    }
}
