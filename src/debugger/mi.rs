//! Just enough of the GDB/MI output syntax to drive console commands.
//!
//! Only the pieces the session needs are decoded: stream records, result
//! records with their class, exec-async records and the prompt. Result and
//! async payloads are kept as raw text and queried with [`extract_str`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

impl ResultClass {
    fn parse(class: &str) -> Option<Self> {
        match class {
            "done" => Some(ResultClass::Done),
            "running" => Some(ResultClass::Running),
            "connected" => Some(ResultClass::Connected),
            "error" => Some(ResultClass::Error),
            "exit" => Some(ResultClass::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `~"..."`: console output of the command.
    Console(String),
    /// `@"..."`: output of the inferior.
    Target(String),
    /// `&"..."`: gdb's own log, including echoed commands and error text.
    Log(String),
    /// `token^class,fields`
    Result {
        token: Option<u32>,
        class: ResultClass,
        fields: String,
    },
    /// `token*class,fields`
    Exec {
        token: Option<u32>,
        class: String,
        fields: String,
    },
    /// `=...` and `+...` notifications.
    Notify(String),
    Prompt,
    /// Anything unrecognized, usually inferior output on a shared tty.
    Other(String),
}

pub fn parse_record(line: &str) -> Record {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim_end() == "(gdb)" {
        return Record::Prompt;
    }

    let (token, rest) = split_token(line);
    let mut chars = rest.chars();
    match chars.next() {
        Some('~') if token.is_none() => Record::Console(unquote(chars.as_str())),
        Some('@') if token.is_none() => Record::Target(unquote(chars.as_str())),
        Some('&') if token.is_none() => Record::Log(unquote(chars.as_str())),
        Some('^') => {
            let (class, fields) = split_class_fields(chars.as_str());
            match ResultClass::parse(class) {
                Some(class) => Record::Result {
                    token,
                    class,
                    fields: fields.to_string(),
                },
                None => Record::Other(line.to_string()),
            }
        }
        Some('*') => {
            let (class, fields) = split_class_fields(chars.as_str());
            Record::Exec {
                token,
                class: class.to_string(),
                fields: fields.to_string(),
            }
        }
        Some('=') | Some('+') => Record::Notify(chars.as_str().to_string()),
        _ => Record::Other(line.to_string()),
    }
}

fn split_token(line: &str) -> (Option<u32>, &str) {
    let end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if end == 0 {
        return (None, line);
    }
    (line[..end].parse().ok(), &line[end..])
}

fn split_class_fields(s: &str) -> (&str, &str) {
    match s.find(',') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

/// Value of `key="..."` in a result or async payload.
pub fn extract_str(fields: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let mut search = 0;
    while let Some(pos) = fields[search..].find(&needle) {
        let at = search + pos;
        // skip matches that are only the tail of a longer key
        let boundary = at == 0 || matches!(fields.as_bytes()[at - 1], b',' | b'{' | b'[');
        let start = at + needle.len();
        if boundary {
            let rest = &fields[start..];
            let end = find_closing_quote(rest)?;
            return Some(unescape(&rest[..end]));
        }
        search = start;
    }
    None
}

fn find_closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == '"' {
            return Some(i);
        }
    }
    None
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        unescape(&s[1..s.len() - 1])
    } else if let Some(stripped) = s.strip_prefix('"') {
        unescape(stripped)
    } else {
        s.to_owned()
    }
}

/// Decodes a C string body. Octal escapes are raw bytes, so multi-byte
/// UTF-8 sequences are reassembled before conversion.
fn unescape(s: &str) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' || i + 1 == bytes.len() {
            out.push(b);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'e' => out.push(0x1b),
            b'a' => out.push(0x07),
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b'0'..=b'7' => {
                let mut value = u32::from(next - b'0');
                let mut digits = 1;
                while digits < 3 && i < bytes.len() && (b'0'..=b'7').contains(&bytes[i]) {
                    value = value * 8 + u32::from(bytes[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push(value as u8);
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encodes `s` as an MI C string, quotes included.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
