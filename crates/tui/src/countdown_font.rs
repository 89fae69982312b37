//! Large-digit rendering for countdown clocks.

const GLYPH_HEIGHT: usize = 5;
const FILL: &str = "██";
const GAP: &str = "  ";

type Glyph = [&'static str; GLYPH_HEIGHT];

const DIGITS: [Glyph; 10] = [
    ["111", "1 1", "1 1", "1 1", "111"],
    [" 1 ", "11 ", " 1 ", " 1 ", "111"],
    ["111", "  1", "111", "1  ", "111"],
    ["111", "  1", " 11", "  1", "111"],
    ["1 1", "1 1", "111", "  1", "  1"],
    ["111", "1  ", "111", "  1", "111"],
    ["111", "1  ", "111", "1 1", "111"],
    ["111", "  1", " 1 ", " 1 ", " 1 "],
    ["111", "1 1", "111", "1 1", "111"],
    ["111", "1 1", "111", "  1", "111"],
];
const COLON: Glyph = [" ", "1", " ", "1", " "];
const UNKNOWN: Glyph = ["   ", "   ", "111", "   ", "   "];

/// Number of rows produced by [`render`].
pub const HEIGHT: usize = GLYPH_HEIGHT;

/// Render `M:SS`-style text as block digits, one string per row.
///
/// Characters other than digits and `:` render as a dash.
pub fn render(text: &str) -> Vec<String> {
    let glyphs: Vec<&Glyph> = text
        .chars()
        .map(|ch| match ch {
            ':' => &COLON,
            _ => ch
                .to_digit(10)
                .map(|digit| &DIGITS[digit as usize])
                .unwrap_or(&UNKNOWN),
        })
        .collect();

    (0..GLYPH_HEIGHT)
        .map(|row| {
            let mut line = String::new();
            for (index, glyph) in glyphs.iter().enumerate() {
                if index > 0 {
                    line.push(' ');
                }
                for cell in glyph[row].chars() {
                    line.push_str(if cell == '1' { FILL } else { GAP });
                }
            }
            line.trim_end().to_string()
        })
        .collect()
}

/// Display width of the widest row.
pub fn width(lines: &[String]) -> usize {
    lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
}
