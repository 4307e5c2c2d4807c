//! Sanitizing of player-supplied text (horse names, appearance tags) for logs.
//! Keeps every log record on one line and drops chat formatting codes.

/// Longest name preview written to a log line.
const MAX_PREVIEW: usize = 64;

/// Prefix of a two-character chat formatting code (`§a`, `§l`, ...).
const FORMAT_MARKER: char = '§';

/// Escape a string for single-line logging:
/// - `\n`, `\r`, `\t` and backslash are escaped
/// - other control characters become `\xNN`
/// - chat formatting codes are removed
///
/// Output is truncated after `MAX_PREVIEW` characters with an ellipsis.
pub fn escape_log(s: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    let mut count = 0;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == FORMAT_MARKER {
            chars.next();
            continue;
        }
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        count += 1;
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_log;

    #[test]
    fn escapes_newlines() {
        assert_eq!(escape_log("Star\nlight\r\tEnd"), "Star\\nlight\\r\\tEnd");
    }

    #[test]
    fn strips_formatting_codes() {
        assert_eq!(escape_log("§6Golden §lBiscuit"), "Golden Biscuit");
    }

    #[test]
    fn truncates_long_names() {
        let long = "a".repeat(100);
        let esc = escape_log(&long);
        assert_eq!(esc.chars().count(), 65);
        assert!(esc.ends_with('…'));
    }
}
