// src/util.rs — Shared utility functions

/// Truncate a string for display/feedback (UTF-8 safe).
///
/// Returns a substring of at most `max_len` bytes, ensuring the cut
/// point falls on a valid UTF-8 character boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// Make an arbitrary identifier safe to use as a single path component.
///
/// Path separators, drive/colon characters, whitespace and anything that is
/// not alphanumeric, `-`, `_` or `.` become `_`. `.` and `..` are never
/// returned as-is.
pub fn sanitize_component(s: &str) -> String {
    let out: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match out.as_str() {
        "" | "." | ".." => out.replace('.', "_") + "_",
        _ => out,
    }
}
