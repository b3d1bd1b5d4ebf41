/*
 * `PageSurface` implementation backed by the `lopdf` object model. Drawing
 * calls are buffered as content-stream operations per page, so revisiting a page
 * with `goto_page` simply appends more operations to its buffer. `finish`
 * assembles the page tree with the two standard Courier fonts and serializes the
 * document.
 */
use crate::core::document_packager::DocumentError;
use crate::core::page_surface::{FontFace, PageSize, PageSurface, Rgb, TextStyle};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const REGULAR_FONT_KEY: &str = "F1";
const BOLD_FONT_KEY: &str = "F2";
const PRODUCER: &str = "code_packager";

pub struct PdfSurface {
    size: PageSize,
    pages: Vec<Vec<Operation>>,
    current: usize,
}

impl PdfSurface {
    /// Starts a document with a single blank page.
    pub fn new(size: PageSize) -> Self {
        PdfSurface {
            size,
            pages: vec![Vec::new()],
            current: 0,
        }
    }

    // PDF user space has its origin at the bottom-left corner.
    fn flip(&self, y: f32) -> f32 {
        self.size.height - y
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        &mut self.pages[self.current]
    }

    /*
     * Serializes every page into a PDF byte buffer. The `title` ends up in the
     * document information dictionary.
     */
    pub fn finish(self, title: &str) -> Result<Vec<u8>, DocumentError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT_KEY => regular_font_id,
                BOLD_FONT_KEY => bold_font_id,
            },
        });

        let page_count = self.pages.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        for operations in self.pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.0f32.into(),
                0.0f32.into(),
                self.size.width.into(),
                self.size.height.into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(encode_win_ansi(title)),
            "Producer" => Object::string_literal(PRODUCER),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        log::debug!(
            "PdfSurface: Serialized {page_count} page(s) into {} byte(s).",
            bytes.len()
        );
        Ok(bytes)
    }
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![
        (f32::from(color.0) / 255.0).into(),
        (f32::from(color.1) / 255.0).into(),
        (f32::from(color.2) / 255.0).into(),
    ]
}

/*
 * Maps text onto the WinAnsi encoding used by the standard fonts. Printable
 * ASCII and the Latin-1 range share their code points with WinAnsi, and the
 * 0x80-0x9F block carries typographic punctuation and a few extra letters.
 * Everything else, including control characters, becomes '?'.
 */
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => win_ansi_extension(c).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_extension(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82, // ‚
        '\u{0192}' => 0x83, // ƒ
        '\u{201E}' => 0x84, // „
        '\u{2026}' => 0x85, // …
        '\u{2020}' => 0x86, // †
        '\u{2021}' => 0x87, // ‡
        '\u{02C6}' => 0x88, // ˆ
        '\u{2030}' => 0x89, // ‰
        '\u{0160}' => 0x8A, // Š
        '\u{2039}' => 0x8B, // ‹
        '\u{0152}' => 0x8C, // Œ
        '\u{017D}' => 0x8E, // Ž
        '\u{2018}' => 0x91, // ‘
        '\u{2019}' => 0x92, // ’
        '\u{201C}' => 0x93, // “
        '\u{201D}' => 0x94, // ”
        '\u{2022}' => 0x95, // •
        '\u{2013}' => 0x96, // en dash
        '\u{2014}' => 0x97, // em dash
        '\u{02DC}' => 0x98, // ˜
        '\u{2122}' => 0x99, // ™
        '\u{0161}' => 0x9A, // š
        '\u{203A}' => 0x9B, // ›
        '\u{0153}' => 0x9C, // œ
        '\u{017E}' => 0x9E, // ž
        '\u{0178}' => 0x9F, // Ÿ
        _ => return None,
    };
    Some(byte)
}

impl PageSurface for PdfSurface {
    fn page_size(&self) -> PageSize {
        self.size
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.current = self.pages.len() - 1;
    }

    fn goto_page(&mut self, page_number: u32) -> Result<(), DocumentError> {
        let count = self.page_count();
        if page_number == 0 || page_number > count {
            return Err(DocumentError::PageOutOfRange {
                requested: page_number,
                page_count: count,
            });
        }
        self.current = (page_number - 1) as usize;
        Ok(())
    }

    fn current_page_number(&self) -> u32 {
        self.current as u32 + 1
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn write_text(&mut self, text: &str, x: f32, baseline: f32, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        let font_key = match style.face {
            FontFace::Mono => REGULAR_FONT_KEY,
            FontFace::MonoBold => BOLD_FONT_KEY,
        };
        let y = self.flip(baseline);
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font_key.into(), style.size.into()]));
        ops.push(Operation::new("rg", color_operands(style.color)));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(text))],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32) {
        let (y1, y2) = (self.flip(from.1), self.flip(to.1));
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![width.into()]));
        ops.push(Operation::new("RG", color_operands(color)));
        ops.push(Operation::new("m", vec![from.0.into(), y1.into()]));
        ops.push(Operation::new("l", vec![to.0.into(), y2.into()]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    fn draw_rect(
        &mut self,
        origin: (f32, f32),
        size: (f32, f32),
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    ) {
        let paint = match (fill, stroke) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            (None, Some(_)) => "S",
            (None, None) => return,
        };
        let bottom = self.flip(origin.1 + size.1);
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        if let Some(color) = fill {
            ops.push(Operation::new("rg", color_operands(color)));
        }
        if let Some(color) = stroke {
            ops.push(Operation::new("w", vec![0.5f32.into()]));
            ops.push(Operation::new("RG", color_operands(color)));
        }
        ops.push(Operation::new(
            "re",
            vec![origin.0.into(), bottom.into(), size.0.into(), size.1.into()],
        ));
        ops.push(Operation::new(paint, vec![]));
        ops.push(Operation::new("Q", vec![]));
    }
}
