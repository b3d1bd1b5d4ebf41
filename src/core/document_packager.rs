/*
 * The paginated packager lays the file set out as an A4 document: a title page,
 * a table of contents, then each file starting on a fresh page. Page numbers for
 * the table of contents are only known once every file has been laid out, so
 * the work happens in two passes over a `PageSurface`:
 *
 * 1. Layout: every page is drawn, with the page column of the table left blank.
 *    The position of each blank cell is remembered as a `TocSlot`, and the page
 *    each file starts on is recorded in a `PageMap`.
 * 2. Back-patch: the surface is rewound to each table-of-contents page and the
 *    page numbers are written into the remembered cells.
 *
 * The layout code is generic over the surface so tests can inspect exactly what
 * was drawn where; `package_as_document` binds it to `PdfSurface`.
 */
use crate::core::models::{OutputBlob, ProjectFile, ProjectFileSet};
use crate::core::packager::PackageError;
use crate::core::page_surface::{A4_PORTRAIT, PageSurface, Rgb, TextStyle, wrap_columns};
use crate::core::pdf_surface::PdfSurface;
use crate::core::timestamp::GenerationStamp;
use std::collections::HashMap;
use std::io;

const MM: f32 = 72.0 / 25.4;
const MARGIN: f32 = 15.0 * MM;
const CONTENT_FONT_SIZE: f32 = 8.0;
const LINE_HEIGHT_FACTOR: f32 = 1.2;
const FILE_HEADER_FONT_SIZE: f32 = 12.0;
const TOC_HEADING_FONT_SIZE: f32 = 18.0;
const TOC_CELL_PADDING: f32 = 5.0;
const TOC_PAGE_COLUMN_WIDTH: f32 = 45.0;
const TAB_WIDTH: usize = 4;
const MISSING_PAGE_LABEL: &str = "N/A";

const HEADER_FILL: Rgb = Rgb(30, 41, 59);
const GRID_STROKE: Rgb = Rgb(190, 190, 190);
const RULE_STROKE: Rgb = Rgb(100, 100, 100);

pub const DEFAULT_MAX_PAGES_PER_FILE: u32 = 500;

#[derive(Debug)]
pub enum DocumentError {
    Pdf(lopdf::Error),
    Io(io::Error),
    PageOutOfRange { requested: u32, page_count: u32 },
}

impl From<lopdf::Error> for DocumentError {
    fn from(err: lopdf::Error) -> Self {
        DocumentError::Pdf(err)
    }
}

impl From<io::Error> for DocumentError {
    fn from(err: io::Error) -> Self {
        DocumentError::Io(err)
    }
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::Pdf(e) => write!(f, "PDF encoding error: {e}"),
            DocumentError::Io(e) => write!(f, "PDF output I/O error: {e}"),
            DocumentError::PageOutOfRange {
                requested,
                page_count,
            } => write!(
                f,
                "Page {requested} does not exist (document has {page_count} page(s))"
            ),
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Pdf(e) => Some(e),
            DocumentError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/*
 * Reported when a file needs more pages than the per-file limit allows. The rows
 * that did not fit are dropped; the rest of the document is unaffected.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOverflowWarning {
    pub path: String,
    pub page_limit: u32,
    pub emitted_rows: usize,
    pub clipped_rows: usize,
}

impl std::fmt::Display for LayoutOverflowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' exceeded {} page(s); {} of {} row(s) clipped",
            self.path,
            self.page_limit,
            self.clipped_rows,
            self.emitted_rows + self.clipped_rows
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutLimits {
    pub max_pages_per_file: u32,
}

impl Default for LayoutLimits {
    fn default() -> Self {
        LayoutLimits {
            max_pages_per_file: DEFAULT_MAX_PAGES_PER_FILE,
        }
    }
}

/// File path to the 1-based page its content starts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMap {
    pages: HashMap<String, u32>,
}

impl PageMap {
    pub fn record(&mut self, path: &str, page: u32) {
        self.pages.insert(path.to_string(), page);
    }

    pub fn page_for(&self, path: &str) -> Option<u32> {
        self.pages.get(path).copied()
    }
}

/// A blank page-number cell left in the table of contents by the layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TocSlot {
    pub path: String,
    pub page: u32,
    pub x: f32,
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub page_map: PageMap,
    pub toc_first_page: u32,
    pub toc_last_page: u32,
    pub toc_slots: Vec<TocSlot>,
    pub page_count: u32,
    pub warnings: Vec<LayoutOverflowWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPackage {
    pub blob: OutputBlob,
    pub layout: DocumentLayout,
}

struct Geometry {
    width: f32,
    height: f32,
}

impl Geometry {
    fn of<S: PageSurface + ?Sized>(surface: &S) -> Self {
        let size = surface.page_size();
        Geometry {
            width: size.width,
            height: size.height,
        }
    }

    fn text_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    fn bottom(&self) -> f32 {
        self.height - MARGIN
    }

    fn path_column_width(&self) -> f32 {
        self.text_width() - TOC_PAGE_COLUMN_WIDTH
    }
}

fn content_style() -> TextStyle {
    TextStyle::mono(CONTENT_FONT_SIZE)
}

fn line_step(style: &TextStyle) -> f32 {
    style.size * LINE_HEIGHT_FACTOR
}

pub fn package_as_document(
    files: &ProjectFileSet,
    project_name: &str,
) -> Result<DocumentPackage, PackageError> {
    package_as_document_with(
        files,
        project_name,
        &GenerationStamp::now(),
        LayoutLimits::default(),
    )
}

/*
 * Lays out and serializes `files` as a PDF. An empty set is rejected with
 * `PackageError::EmptySet` instead of producing a document with an empty table
 * of contents.
 */
pub fn package_as_document_with(
    files: &ProjectFileSet,
    project_name: &str,
    stamp: &GenerationStamp,
    limits: LayoutLimits,
) -> Result<DocumentPackage, PackageError> {
    if files.is_empty() {
        return Err(PackageError::EmptySet { candidate_count: 0 });
    }
    let mut surface = PdfSurface::new(A4_PORTRAIT);
    let layout = lay_out_document(&mut surface, files, project_name, stamp, limits)?;
    let bytes = surface.finish(&format!("{project_name} source code"))?;
    log::debug!(
        "DocumentPackager: Packaged {} file(s) for '{project_name}' into {} page(s), {} byte(s).",
        files.len(),
        layout.page_count,
        bytes.len()
    );
    Ok(DocumentPackage {
        blob: OutputBlob::pdf(bytes, project_name),
        layout,
    })
}

/*
 * Runs both passes on `surface`, which must hold exactly one blank page (the
 * title page). Returns where everything ended up.
 */
pub fn lay_out_document<S: PageSurface>(
    surface: &mut S,
    files: &ProjectFileSet,
    project_name: &str,
    stamp: &GenerationStamp,
    limits: LayoutLimits,
) -> Result<DocumentLayout, DocumentError> {
    render_title_page(surface, files, project_name, stamp);

    surface.new_page();
    let toc_first_page = surface.current_page_number();
    let toc_slots = render_toc_placeholders(surface, files);
    let toc_last_page = surface.current_page_number();

    let mut page_map = PageMap::default();
    let mut warnings = Vec::new();
    for file in files {
        surface.new_page();
        page_map.record(&file.path, surface.current_page_number());
        if let Some(warning) = render_file(surface, file, limits) {
            log::warn!("DocumentPackager: {warning}");
            warnings.push(warning);
        }
    }

    back_patch_toc(surface, toc_first_page, toc_last_page, &toc_slots, &page_map)?;

    Ok(DocumentLayout {
        page_map,
        toc_first_page,
        toc_last_page,
        toc_slots,
        page_count: surface.page_count(),
        warnings,
    })
}

fn render_title_page<S: PageSurface>(
    surface: &mut S,
    files: &ProjectFileSet,
    project_name: &str,
    stamp: &GenerationStamp,
) {
    let geometry = Geometry::of(surface);
    let middle = geometry.height / 2.0;
    let lines = [
        ("Source Code Package".to_string(), TextStyle::mono_bold(26.0), middle - 20.0 * MM),
        (project_name.to_string(), TextStyle::mono_bold(18.0), middle),
        (
            format!("Generated: {}", stamp.as_str()),
            TextStyle::mono(10.0),
            middle + 10.0 * MM,
        ),
        (
            format!("Total Files: {}", files.len()),
            TextStyle::mono(10.0),
            middle + 20.0 * MM,
        ),
    ];
    for (text, style, baseline) in lines {
        let x = ((geometry.width - style.text_width(&text)) / 2.0).max(MARGIN);
        surface.write_text(&text, x, baseline, style);
    }
}

fn render_toc_header_row<S: PageSurface>(surface: &mut S, geometry: &Geometry, top: f32) -> f32 {
    let style = content_style();
    let height = line_step(&style) + 2.0 * TOC_CELL_PADDING;
    let path_width = geometry.path_column_width();
    surface.draw_rect(
        (MARGIN, top),
        (geometry.text_width(), height),
        Some(HEADER_FILL),
        None,
    );
    let baseline = top + TOC_CELL_PADDING + style.size;
    let header_style = TextStyle::mono_bold(style.size).with_color(Rgb::WHITE);
    surface.write_text("File Path", MARGIN + TOC_CELL_PADDING, baseline, header_style);
    surface.write_text(
        "Page",
        MARGIN + path_width + TOC_CELL_PADDING,
        baseline,
        header_style,
    );
    top + height
}

/*
 * Draws the table of contents starting on the current page with every page
 * cell left blank. Rows that do not fit the rest of a page move to the next one;
 * a row taller than a whole page is split across pages. The header row repeats
 * at the top of every continuation page.
 */
fn render_toc_placeholders<S: PageSurface>(surface: &mut S, files: &ProjectFileSet) -> Vec<TocSlot> {
    let geometry = Geometry::of(surface);
    let style = content_style();
    let step = line_step(&style);
    let path_width = geometry.path_column_width();
    let columns = style.columns_for(path_width - 2.0 * TOC_CELL_PADDING);
    let full_page_lines =
        ((geometry.bottom() - MARGIN - 2.0 * TOC_CELL_PADDING - (step + 2.0 * TOC_CELL_PADDING))
            / step)
            .floor()
            .max(1.0) as usize;

    surface.write_text(
        "Table of Contents",
        MARGIN,
        MARGIN,
        TextStyle::mono_bold(TOC_HEADING_FONT_SIZE),
    );
    let mut y = render_toc_header_row(surface, &geometry, MARGIN + 10.0 * MM);
    let mut slots = Vec::with_capacity(files.len());

    for file in files {
        let lines = wrap_columns(&file.path, columns);
        let row_height = lines.len() as f32 * step + 2.0 * TOC_CELL_PADDING;
        if y + row_height > geometry.bottom() && lines.len() <= full_page_lines {
            surface.new_page();
            y = render_toc_header_row(surface, &geometry, MARGIN);
        }

        let mut remaining: &[String] = &lines;
        let mut first_segment = true;
        while !remaining.is_empty() {
            let available =
                ((geometry.bottom() - y - 2.0 * TOC_CELL_PADDING) / step).floor().max(0.0) as usize;
            if available == 0 {
                surface.new_page();
                y = render_toc_header_row(surface, &geometry, MARGIN);
                continue;
            }
            let take = available.min(remaining.len());
            let segment_height = take as f32 * step + 2.0 * TOC_CELL_PADDING;

            surface.draw_rect((MARGIN, y), (path_width, segment_height), None, Some(GRID_STROKE));
            surface.draw_rect(
                (MARGIN + path_width, y),
                (TOC_PAGE_COLUMN_WIDTH, segment_height),
                None,
                Some(GRID_STROKE),
            );
            let first_baseline = y + TOC_CELL_PADDING + style.size;
            for (offset, line) in remaining[..take].iter().enumerate() {
                surface.write_text(
                    line,
                    MARGIN + TOC_CELL_PADDING,
                    first_baseline + offset as f32 * step,
                    style,
                );
            }
            if first_segment {
                slots.push(TocSlot {
                    path: file.path.clone(),
                    page: surface.current_page_number(),
                    x: MARGIN + path_width + TOC_CELL_PADDING,
                    baseline: first_baseline,
                });
                first_segment = false;
            }

            y += segment_height;
            remaining = &remaining[take..];
        }
    }

    slots
}

/// Expands tabs and hard-wraps the content into display rows.
fn content_rows(content: &str, columns: usize) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let tab = " ".repeat(TAB_WIDTH);
    normalized
        .lines()
        .flat_map(|line| wrap_columns(&line.replace('\t', &tab), columns))
        .collect()
}

/*
 * Draws one file starting on the current page. Returns a warning when the file
 * would need more than `limits.max_pages_per_file` pages; the rows past the
 * limit are dropped.
 */
fn render_file<S: PageSurface>(
    surface: &mut S,
    file: &ProjectFile,
    limits: LayoutLimits,
) -> Option<LayoutOverflowWarning> {
    let geometry = Geometry::of(surface);
    let header_style = TextStyle::mono_bold(FILE_HEADER_FONT_SIZE);
    let header_columns = header_style.columns_for(geometry.text_width());
    let header_lines = wrap_columns(&format!("File: {}", file.path), header_columns);
    let header_step = line_step(&header_style);

    let mut baseline = MARGIN;
    for (index, line) in header_lines.iter().enumerate() {
        if index > 0 {
            baseline += header_step;
        }
        surface.write_text(line, MARGIN, baseline, header_style);
    }
    let rule_y = baseline + 2.0 * MM;
    surface.draw_line(
        (MARGIN, rule_y),
        (geometry.width - MARGIN, rule_y),
        RULE_STROKE,
        0.5,
    );

    let style = content_style();
    let step = line_step(&style);
    let rows = content_rows(&file.content, style.columns_for(geometry.text_width()));
    let page_limit = limits.max_pages_per_file.max(1);
    let mut pages_used = 1;
    let mut y = rule_y + 8.0 * MM;

    for (emitted, row) in rows.iter().enumerate() {
        if y > geometry.bottom() {
            if pages_used >= page_limit {
                return Some(LayoutOverflowWarning {
                    path: file.path.clone(),
                    page_limit,
                    emitted_rows: emitted,
                    clipped_rows: rows.len() - emitted,
                });
            }
            surface.new_page();
            pages_used += 1;
            y = MARGIN + style.size;
        }
        surface.write_text(row, MARGIN, y, style);
        y += step;
    }
    None
}

/*
 * Second pass: revisits every table-of-contents page and fills the blank page
 * cells. A slot whose path is missing from `page_map` gets `N/A`. The surface
 * is left on its last page.
 */
pub fn back_patch_toc<S: PageSurface>(
    surface: &mut S,
    toc_first_page: u32,
    toc_last_page: u32,
    slots: &[TocSlot],
    page_map: &PageMap,
) -> Result<(), DocumentError> {
    let style = content_style();
    for page in toc_first_page..=toc_last_page {
        surface.goto_page(page)?;
        for slot in slots.iter().filter(|slot| slot.page == page) {
            let label = match page_map.page_for(&slot.path) {
                Some(number) => number.to_string(),
                None => {
                    log::warn!(
                        "DocumentPackager: No page recorded for '{}', writing {MISSING_PAGE_LABEL}.",
                        slot.path
                    );
                    MISSING_PAGE_LABEL.to_string()
                }
            };
            surface.write_text(&label, slot.x, slot.baseline, style);
        }
    }
    let last = surface.page_count();
    surface.goto_page(last)?;
    log::debug!(
        "DocumentPackager: Back-patched {} table of contents entr(ies) on pages {toc_first_page}-{toc_last_page}.",
        slots.len()
    );
    Ok(())
}
