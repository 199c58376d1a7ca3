//! Idempotent merging of field names into a `Vary` header value.

/// Splits a `Vary` value into field tokens.
///
/// Spaces are dropped only while no token character has been seen since the last
/// comma, so inner spaces survive and empty segments produce empty tokens. A trailing
/// comma yields a trailing empty token.
pub fn parse(header: &str) -> Vec<&str> {
    let mut list = Vec::new();
    let (mut start, mut end) = (0, 0);

    for (i, byte) in header.bytes().enumerate() {
        match byte {
            b' ' => {
                if start == end {
                    start = i + 1;
                    end = i + 1;
                }
            }
            b',' => {
                list.push(&header[start..end]);
                start = i + 1;
                end = i + 1;
            }
            _ => end = i + 1,
        }
    }

    list.push(&header[start..end]);
    list
}

/// Appends `field` (one name or a comma list) to `header`, skipping names already
/// present case-insensitively. `*` on either side absorbs everything.
pub fn append(header: &str, field: &str) -> String {
    if header == "*" {
        return header.to_string();
    }

    let fields: Vec<&str> = parse(field).into_iter().filter(|f| !f.is_empty()).collect();
    let lowered = header.to_ascii_lowercase();
    let mut present: Vec<String> = parse(&lowered).into_iter().map(str::to_string).collect();

    if fields.contains(&"*") || present.iter().any(|h| h == "*") {
        return "*".to_string();
    }

    let mut value = header.to_string();
    for field in fields {
        let lower = field.to_ascii_lowercase();
        if present.contains(&lower) {
            continue;
        }
        present.push(lower);
        if value.is_empty() {
            value.push_str(field);
        } else {
            value.push_str(", ");
            value.push_str(field);
        }
    }
    value
}

/// Accumulates every `Vary` contribution of one composition pass on top of the value
/// the response already carried.
#[derive(Debug, Clone, Default)]
pub struct VaryAccumulator {
    original: Option<String>,
    current: String,
}

impl VaryAccumulator {
    pub fn new(existing: Option<&str>) -> Self {
        let original = existing.map(str::to_string);
        let current = original.clone().unwrap_or_default();
        Self { original, current }
    }

    pub fn add(&mut self, field: &str) {
        self.current = append(&self.current, field);
    }

    /// The merged value, or `None` when nothing was contributed.
    pub fn finish(self) -> Option<String> {
        match self.original {
            Some(original) if original == self.current => None,
            None if self.current.is_empty() => None,
            _ => Some(self.current),
        }
    }
}
