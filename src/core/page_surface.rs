/*
 * The page abstraction the paginated packager draws on. A surface owns an
 * ordered list of pages and a cursor pointing at the current page; drawing
 * always targets the current page, and `goto_page` moves the cursor back to an
 * earlier page so a later pass can add to it. Coordinates are in points with
 * the origin at the top-left corner of the page and `y` growing downward; text
 * is positioned by its baseline.
 *
 * Only the monospace face family is supported, which lets layout code measure
 * text by counting characters.
 */
use crate::core::document_packager::DocumentError;

// Advance width of every glyph in the standard Courier faces, per point of size.
const MONO_ADVANCE_PER_POINT: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

pub const A4_PORTRAIT: PageSize = PageSize {
    width: 595.28,
    height: 841.89,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Mono,
    MonoBold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: FontFace,
    pub size: f32,
    pub color: Rgb,
}

impl TextStyle {
    pub fn mono(size: f32) -> Self {
        TextStyle {
            face: FontFace::Mono,
            size,
            color: Rgb::BLACK,
        }
    }

    pub fn mono_bold(size: f32) -> Self {
        TextStyle {
            face: FontFace::MonoBold,
            size,
            color: Rgb::BLACK,
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn char_width(&self) -> f32 {
        self.size * MONO_ADVANCE_PER_POINT
    }

    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width()
    }

    /// How many characters fit in `width` points; never less than one.
    pub fn columns_for(&self, width: f32) -> usize {
        ((width / self.char_width()).floor() as usize).max(1)
    }
}

pub trait PageSurface {
    fn page_size(&self) -> PageSize;

    /// Appends a blank page and makes it current.
    fn new_page(&mut self);

    /// Makes the 1-based `page_number` current.
    fn goto_page(&mut self, page_number: u32) -> Result<(), DocumentError>;

    /// The 1-based number of the current page.
    fn current_page_number(&self) -> u32;

    fn page_count(&self) -> u32;

    fn write_text(&mut self, text: &str, x: f32, baseline: f32, style: TextStyle);

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32);

    fn draw_rect(
        &mut self,
        origin: (f32, f32),
        size: (f32, f32),
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    );
}

/*
 * Hard-wraps `line` into chunks of at most `columns` characters. An empty line
 * yields a single empty row so blank lines keep their vertical space.
 */
pub fn wrap_columns(line: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(columns)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
