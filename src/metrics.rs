//! Advance widths for the three PDF base-14 Helvetica faces.
//!
//! Widths come from the Adobe AFM files in 1/1000 em and cover ASCII
//! 0x20..=0x7E. Index = (char as usize) - 32. Anything outside that range
//! falls back to the face's average width, which is close enough for the
//! occasional accented town name.

/// Points per inch.
pub const PT_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Regular,
    Bold,
    Italic,
}

struct WidthTable {
    widths: [u16; 95],
    average: u16,
}

#[rustfmt::skip]
static HELVETICA: WidthTable = WidthTable {
    widths: [
        // sp  !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :   ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A-M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N-Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [   \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a-m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n-z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {   |    }    ~
        334, 260, 334, 584,
    ],
    average: 513,
};

#[rustfmt::skip]
static HELVETICA_BOLD: WidthTable = WidthTable {
    widths: [
        // sp  !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :   ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A-M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N-Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [   \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a-m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n-z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {   |    }    ~
        389, 280, 389, 584,
    ],
    average: 552,
};

fn table(face: Face) -> &'static WidthTable {
    match face {
        // Oblique shares the upright advance widths.
        Face::Regular | Face::Italic => &HELVETICA,
        Face::Bold => &HELVETICA_BOLD,
    }
}

/// Width of `text` in inches when set at `size` points.
pub fn string_width(text: &str, face: Face, size: f32) -> f32 {
    let t = table(face);
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as usize;
            if (32..=126).contains(&code) {
                t.widths[code - 32] as u32
            } else {
                t.average as u32
            }
        })
        .sum();
    units as f32 / 1000.0 * size / PT_PER_INCH
}

/// Greedy word wrap into lines no wider than `max_width` inches.
///
/// Explicit newlines always break. A single word wider than the line is
/// split between characters.
pub fn wrap(text: &str, face: Face, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if string_width(&candidate, face, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if string_width(word, face, size) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = split_word(word, face, size, max_width);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        lines.push(current);
    }
    lines
}

fn split_word(word: &str, face: Face, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        current.push(c);
        if current.chars().count() > 1 && string_width(&current, face, size) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    pieces.push(current);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_has_no_width() {
        assert_eq!(string_width("", Face::Regular, 10.0), 0.0);
    }

    #[test]
    fn widths_scale_with_size() {
        // "Noon" = 722 + 556 + 556 + 556 = 2390 units
        let w = string_width("Noon", Face::Regular, 7.2);
        assert!((w - 0.239).abs() < 1e-4, "got {w}");
        assert!((string_width("Noon", Face::Regular, 14.4) - 2.0 * w).abs() < 1e-4);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let text = "Tuesday (Continued)";
        assert!(string_width(text, Face::Bold, 8.0) > string_width(text, Face::Regular, 8.0));
        assert_eq!(
            string_width(text, Face::Italic, 8.0),
            string_width(text, Face::Regular, 8.0)
        );
    }

    #[test]
    fn non_ascii_uses_average() {
        let w = string_width("é", Face::Regular, 72.0);
        assert!((w - 0.513).abs() < 1e-4);
    }

    #[test]
    fn wrap_breaks_on_words() {
        let width = string_width("Wheelchair accessible", Face::Regular, 9.0);
        let lines = wrap("Wheelchair accessible side door", Face::Regular, 9.0, width);
        assert_eq!(lines, ["Wheelchair accessible", "side door"]);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let width = string_width("abcd", Face::Regular, 10.0);
        let lines = wrap("abcdefghij", Face::Regular, 10.0, width);
        assert!(lines.len() >= 3);
        assert_eq!(lines.concat(), "abcdefghij");
        for line in &lines {
            assert!(string_width(line, Face::Regular, 10.0) <= width + 1e-6);
        }
    }

    #[test]
    fn wrap_keeps_explicit_newlines() {
        let lines = wrap("one\ntwo", Face::Bold, 10.0, 5.0);
        assert_eq!(lines, ["one", "two"]);
    }
}
