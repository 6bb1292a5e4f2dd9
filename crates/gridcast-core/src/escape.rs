//! Removing terminal escape sequences from already-colored text.

const ESC: char = '\x1b';

/// Strip CSI sequences (colors, cursor moves) and two-character escapes,
/// returning only the printable text.
///
/// ```
/// use gridcast_core::strip_escapes;
///
/// let colored = "\x1b[38;2;255;0;0m\x1b[48;2;0;0;0mhi\x1b[0m";
/// assert_eq!(strip_escapes(colored), "hi");
/// ```
#[must_use]
pub fn strip_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != ESC {
            out.push(c);
            continue;
        }
        match chars.next() {
            // CSI: parameters and intermediates until a final byte in '@'..='~'.
            Some('[') => {
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            Some(_) | None => {}
        }
    }
    out
}
