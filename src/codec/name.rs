//! Rotated-alphabet cipher used for UserAssist value names.

/// Rotates ASCII letters by 13 places, preserving case.
///
/// Digits, separators and non-ASCII characters pass through unchanged, so
/// applying it twice gives back the input.
pub fn rot13(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' => rotate(c, b'a'),
            'A'..='Z' => rotate(c, b'A'),
            _ => c,
        })
        .collect()
}

fn rotate(c: char, base: u8) -> char {
    let offset = (c as u8 - base + 13) % 26;
    (base + offset) as char
}
