//! Author-script codec.
//!
//! The author-script file carries the patch author's identity between runs
//! as three shell variable assignments:
//!
//! ```text
//! GIT_AUTHOR_NAME='…'
//! GIT_AUTHOR_EMAIL='…'
//! GIT_AUTHOR_DATE='…'
//! ```
//!
//! The file format is shared with shell tooling that eval's it, so the
//! writer and the strict reader must round-trip bit-exactly. On any
//! deviation the reader bails out rather than guessing.

const AUTHOR_KEYS: [&str; 3] = ["GIT_AUTHOR_NAME", "GIT_AUTHOR_EMAIL", "GIT_AUTHOR_DATE"];

/// Append `s` to `dst` as a POSIX single-quoted word. A literal `'` or `!`
/// interrupts the quoted run as `'\''` / `'\!'`.
pub fn sq_quote(dst: &mut String, s: &str) {
    dst.push('\'');
    for ch in s.chars() {
        if ch == '\'' || ch == '!' {
            dst.push('\'');
            dst.push('\\');
            dst.push(ch);
            dst.push('\'');
        } else {
            dst.push(ch);
        }
    }
    dst.push('\'');
}

/// Undo `sq_quote`. Returns None unless the whole input is one valid
/// quoted word: it must open with `'`, may interleave `'\''`-style escaped
/// characters between quoted runs, and must end exactly at the closing `'`.
pub fn sq_dequote(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'\'') {
        return None;
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 1;
    loop {
        match bytes.get(i) {
            None => return None, // unterminated quote
            Some(b'\'') => {
                i += 1;
                match bytes.get(i) {
                    None => break, // clean end of the quoted word
                    Some(b'\\') => {
                        // Escaped character between quoted runs; only chars
                        // that need it, and the run must resume afterward.
                        let c = *bytes.get(i + 1)?;
                        if (c == b'\'' || c == b'!') && bytes.get(i + 2) == Some(&b'\'') {
                            out.push(c);
                            i += 3;
                        } else {
                            return None;
                        }
                    }
                    Some(_) => return None, // trailing garbage
                }
            }
            Some(&c) => {
                out.push(c);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

/// Serialize the author triple as the three fixed assignments, each
/// newline-terminated, in NAME, EMAIL, DATE order.
pub fn encode_author_script(name: &str, email: &str, date: &str) -> String {
    let mut out = String::new();
    for (key, value) in AUTHOR_KEYS.iter().zip([name, email, date]) {
        out.push_str(key);
        out.push('=');
        sq_quote(&mut out, value);
        out.push('\n');
    }
    out
}

/// Strictly parse an author-script. Each of the three lines must be
/// `KEY='value'` with the expected key; after the third line EOF is
/// required. Returns (name, email, date), or None on any deviation.
pub fn decode_author_script(input: &[u8]) -> Option<(String, String, String)> {
    let text = std::str::from_utf8(input).ok()?;
    let mut rest = text;
    let mut values = Vec::with_capacity(3);
    for key in AUTHOR_KEYS {
        let (line, tail) = match rest.split_once('\n') {
            Some((line, tail)) => (line, tail),
            None if !rest.is_empty() => (rest, ""),
            None => return None, // fewer than three lines
        };
        rest = tail;
        let quoted = line.strip_prefix(key)?.strip_prefix('=')?;
        values.push(sq_dequote(quoted)?);
    }
    if !rest.is_empty() {
        return None; // trailing bytes after the third line
    }
    let date = values.pop()?;
    let email = values.pop()?;
    let name = values.pop()?;
    Some((name, email, date))
}
