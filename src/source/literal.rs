//! Java string/char literal codec.

use std::fmt::Write as _;

/// Decode the body of a string or char literal (quotes already stripped).
/// Returns the offending byte offset inside `body` on a bad escape.
pub fn unescape(body: &str) -> Result<String, (usize, String)> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, esc)) = chars.next() else {
            return Err((i, "dangling backslash".into()));
        };
        match esc {
            'b' => out.push('\u{8}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{c}'),
            'r' => out.push('\r'),
            's' => out.push(' '),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            'u' => {
                // `\uuuu0041` is legal: any number of `u`s.
                while matches!(chars.peek(), Some((_, 'u'))) {
                    chars.next();
                }
                let start = match chars.peek() {
                    Some((j, _)) => *j,
                    None => return Err((i, "truncated unicode escape".into())),
                };
                let hex = body.get(start..start + 4).ok_or((i, "truncated unicode escape".to_string()))?;
                let code = u32::from_str_radix(hex, 16)
                    .map_err(|_| (i, format!("bad unicode escape `\\u{hex}`")))?;
                for _ in 0..4 {
                    chars.next();
                }
                // Surrogate pairs arrive as two escapes.
                if (0xD800..0xDC00).contains(&code) {
                    let rest = &body[start + 4..];
                    let low = rest
                        .strip_prefix("\\u")
                        .and_then(|r| r.get(..4))
                        .and_then(|h| u32::from_str_radix(h, 16).ok())
                        .filter(|lo| (0xDC00..0xE000).contains(lo));
                    let Some(low) = low else {
                        return Err((i, "unpaired surrogate".into()));
                    };
                    for _ in 0..6 {
                        chars.next();
                    }
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    out.push(char::from_u32(combined).ok_or((i, "bad surrogate pair".to_string()))?);
                } else {
                    out.push(char::from_u32(code).ok_or((i, "unpaired surrogate".to_string()))?);
                }
            }
            '0'..='7' => {
                // Octal escape: up to three digits, max \377.
                let mut value = esc as u32 - '0' as u32;
                let max_digits = if esc <= '3' { 3 } else { 2 };
                let mut digits = 1;
                while digits < max_digits {
                    match chars.peek() {
                        Some(&(_, d)) if ('0'..='7').contains(&d) => {
                            value = value * 8 + (d as u32 - '0' as u32);
                            chars.next();
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            other => return Err((i, format!("unknown escape `\\{other}`"))),
        }
    }
    Ok(out)
}

/// Encode a value as a Java string literal, quotes included.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
