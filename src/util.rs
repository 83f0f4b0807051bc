/// Normalizes an encoding name for lookup: ASCII letters are lowercased and
/// each run of characters other than ASCII letters, digits and `.` becomes a
/// single `_`, with none at either end.
pub fn normalize_encoding_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut gap = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.push(c.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    out
}

/// Whether `c` ends a line, as a text line reader sees it.
pub const fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits text into lines, keeping each line's terminator. `\r\n` counts as
/// a single terminator.
pub fn split_lines_keepends(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_boundary(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                end = j + 1;
            }
        }
        lines.push(text[start..end].to_owned());
        start = end;
    }
    if start < text.len() {
        lines.push(text[start..].to_owned());
    }
    lines
}

#[test]
fn normalize_names() {
    assert_eq!(normalize_encoding_name("Shift-JIS"), "shift_jis");
    assert_eq!(normalize_encoding_name("  EUC  kr "), "euc_kr");
    assert_eq!(normalize_encoding_name("ISO-2022-JP"), "iso_2022_jp");
    assert_eq!(normalize_encoding_name("gb2312"), "gb2312");
    assert_eq!(normalize_encoding_name("--"), "");
}

#[test]
fn split_lines() {
    assert_eq!(
        split_lines_keepends("a\nb\r\nc\rd\u{2028}e"),
        ["a\n", "b\r\n", "c\r", "d\u{2028}", "e"]
    );
    assert_eq!(split_lines_keepends("x\n"), ["x\n"]);
    assert_eq!(split_lines_keepends("\r\r\n"), ["\r", "\r\n"]);
    assert!(split_lines_keepends("").is_empty());
}
