/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_RATIO: f32 = 1.2;

/// Font-metric capability the layout needs: how wide a piece of text is and,
/// derived from that, how many lines it wraps to.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    fn measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        wrap_lines(self, text, max_width, font_size).len()
    }

    /// Width in the bold face. Measures with a single face reuse `text_width`.
    fn bold_text_width(&self, text: &str, font_size: f32) -> f32 {
        self.text_width(text, font_size)
    }

    fn bold_measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        self.measure(text, max_width, font_size)
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        (**self).text_width(text, font_size)
    }

    fn measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        (**self).measure(text, max_width, font_size)
    }

    fn bold_text_width(&self, text: &str, font_size: f32) -> f32 {
        (**self).bold_text_width(text, font_size)
    }

    fn bold_measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        (**self).bold_measure(text, max_width, font_size)
    }
}

/// Views a measure through one weight: bold styles get the bold face.
#[derive(Clone, Copy)]
pub struct Weighted<'m> {
    pub inner: &'m dyn TextMeasure,
    pub bold: bool,
}

impl TextMeasure for Weighted<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        if self.bold {
            self.inner.bold_text_width(text, font_size)
        } else {
            self.inner.text_width(text, font_size)
        }
    }

    fn measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        if self.bold {
            self.inner.bold_measure(text, max_width, font_size)
        } else {
            self.inner.measure(text, max_width, font_size)
        }
    }
}

/// Metric-free estimate: every character is `em_ratio` of the font size wide,
/// and the line count is `ceil(chars / chars_per_line)`.
#[derive(Clone, Copy, Debug)]
pub struct CharEstimate {
    pub em_ratio: f32,
}

impl Default for CharEstimate {
    fn default() -> Self {
        Self { em_ratio: 0.5 }
    }
}

impl CharEstimate {
    pub fn chars_per_line(&self, max_width: f32, font_size: f32) -> usize {
        let per_char = font_size * self.em_ratio;
        if per_char <= 0.0 {
            return 1;
        }
        ((max_width / per_char).floor() as usize).max(1)
    }
}

impl TextMeasure for CharEstimate {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.em_ratio
    }

    fn measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        let chars = text.chars().filter(|&c| c != '\n').count();
        chars.div_ceil(self.chars_per_line(max_width, font_size))
    }
}

/// Greedy word wrap. Explicit newlines always break; a word wider than the
/// line is split by character. Always returns at least one (possibly empty)
/// line per explicit line.
pub fn wrap_lines<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    max_width: f32,
    font_size: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    for para in text.split('\n') {
        let mut current = String::new();
        for word in para.split_whitespace() {
            for piece in split_long_word(measure, word, max_width, font_size) {
                if current.is_empty() {
                    current = piece;
                    continue;
                }
                let candidate = format!("{current} {piece}");
                if measure.text_width(&candidate, font_size) <= max_width {
                    current = candidate;
                } else {
                    lines.push(std::mem::replace(&mut current, piece));
                }
            }
        }
        lines.push(current);
    }
    lines
}

fn split_long_word<M: TextMeasure + ?Sized>(
    measure: &M,
    word: &str,
    max_width: f32,
    font_size: f32,
) -> Vec<String> {
    if measure.text_width(word, font_size) <= max_width {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if current.chars().count() > 1 && measure.text_width(&current, font_size) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
