//! Text utilities for the session metadata block
//!
//! The block is written by the simulator as YAML-like text with a few quirks:
//! - NUL padding after the terminator up to the recorded length
//! - Stray control characters that break YAML parsers
//! - Bytes that are not always valid UTF-8 (driver and team names)
//!
//! This module cleans the text without parsing it.

/// Extract the text of a metadata block.
///
/// Stops at the first NUL byte and replaces invalid UTF-8 sequences rather
/// than rejecting the block.
pub fn extract_text_block(block: &[u8]) -> String {
    let len = block.iter().position(|&b| b == 0).unwrap_or(block.len());
    String::from_utf8_lossy(&block[..len]).into_owned()
}

/// Remove NUL and control characters, keeping `\n`, `\r` and `\t`.
pub fn strip_control_characters(text: &str) -> String {
    text.chars()
        .filter(|ch| !matches!(ch, '\x00'..='\x08' | '\x0B'..='\x0C' | '\x0E'..='\x1F' | '\x7F'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strip_removes_control_characters() {
        let input = "WeekendInfo:\n\x00\x01\x02 TrackName: test\x03";
        let result = strip_control_characters(input);
        assert!(!result.contains('\x00'));
        assert!(!result.contains('\x01'));
        assert!(!result.contains('\x03'));
        assert_eq!(result, "WeekendInfo:\n TrackName: test");
    }

    #[test]
    fn test_strip_keeps_valid_whitespace() {
        let result = strip_control_characters("Key:\n\r\t  Value");
        assert!(result.contains('\n'));
        assert!(result.contains('\r'));
        assert!(result.contains('\t'));
    }

    #[test]
    fn test_extract_stops_at_null_terminator() {
        let data = b"WeekendInfo:\n TrackName: test\0\0\0padding";
        assert_eq!(extract_text_block(data), "WeekendInfo:\n TrackName: test");
    }

    #[test]
    fn test_extract_without_terminator_uses_whole_block() {
        let data = b"WeekendInfo:\n TrackName: test";
        assert_eq!(extract_text_block(data), "WeekendInfo:\n TrackName: test");
    }

    #[test]
    fn test_extract_tolerates_invalid_utf8() {
        let data = b"UserName: J\xF6rg\n";
        let text = extract_text_block(data);
        assert!(text.starts_with("UserName: J"));
        assert!(text.ends_with("rg\n"));
    }

    proptest! {
        #[test]
        fn prop_stripped_text_has_no_control_characters(input in ".*") {
            let cleaned = strip_control_characters(&input);
            prop_assert!(cleaned.chars().all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t') || (c as u32) > 0x7F));
        }
    }
}
