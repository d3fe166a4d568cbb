//! Character-code conventions for text-oriented programs
//!
//! Text programs exchange integers equal to character codes. These helpers
//! live outside the VM; the machine itself only ever sees integers.

/// Character codes of `text`, one value per `char`
pub fn encode_text(text: &str) -> Vec<i64> {
    text.chars().map(|c| c as i64).collect()
}

/// Render output values as text
///
/// Values that are not valid character codes become U+FFFD.
pub fn render_text(values: &[i64]) -> String {
    values.iter().map(|&v| to_char(v)).collect()
}

/// Split a text program's output into its text and a trailing numeric answer
///
/// Text programs commonly finish by emitting one value outside the ASCII
/// range; that value is returned separately instead of being rendered.
pub fn split_text_output(values: &[i64]) -> (String, Option<i64>) {
    match values.split_last() {
        Some((&last, rest)) if !(0..=0x7f).contains(&last) => (render_text(rest), Some(last)),
        _ => (render_text(values), None),
    }
}

fn to_char(value: i64) -> char {
    u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
