/// Parsed `Content-Type` value: `type/subtype` plus parameters.
///
/// Type, subtype and parameter names are lower-cased; parameter values keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a media type per RFC 2045 / RFC 7231.
    ///
    /// Returns `None` for malformed input, including duplicate parameter names.
    pub fn parse(s: &str) -> Option<Self> {
        let (essence, mut rest) = match s.find(';') {
            Some(i) => (&s[..i], &s[i..]),
            None => (s, ""),
        };

        let essence = essence.trim().to_ascii_lowercase();
        let (ty, subtype) = essence.split_once('/')?;
        if !is_token(ty) || !is_token(subtype) {
            return None;
        }

        let mut params: Vec<(String, String)> = Vec::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            rest = rest.strip_prefix(';')?.trim_start();
            if rest.is_empty() {
                break;
            }

            let key_end = rest.find(|c: char| !is_token_char(c)).unwrap_or(rest.len());
            if key_end == 0 {
                return None;
            }
            let key = rest[..key_end].to_ascii_lowercase();
            rest = rest[key_end..].trim_start().strip_prefix('=')?.trim_start();

            let value = if let Some(quoted) = rest.strip_prefix('"') {
                let (value, remaining) = unquote(quoted)?;
                rest = remaining;
                value
            } else {
                let end = rest.find(|c: char| !is_token_char(c)).unwrap_or(rest.len());
                if end == 0 {
                    return None;
                }
                let value = rest[..end].to_string();
                rest = &rest[end..];
                value
            };

            if params.iter().any(|(k, _)| *k == key) {
                return None;
            }
            params.push((key, value));
        }

        Some(Self { essence, params })
    }

    /// `type/subtype`, lower-cased.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// Value of a parameter; `name` must be lower-case.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Reads a quoted-string body (after the opening quote).
///
/// Returns the unescaped value and the input following the closing quote.
fn unquote(s: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &s[i + 1..])),
            '\\' => out.push(chars.next()?.1),
            c => out.push(c),
        }
    }
    None
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && c != ' ' && !"()<>@,;:\\\"/[]?=".contains(c)
}
