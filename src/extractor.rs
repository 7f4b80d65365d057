//! Positioned text extraction for a single page
//!
//! The rendering collaborator hands us text runs, each with a 2D transform
//! matrix `[a, b, c, d, e, f]` (font size already folded in) and an optional
//! layout width. This module turns them into [`Token`]s in page space with a
//! top-left origin. A lopdf-backed page source is provided for callers that
//! only have the PDF bytes.

use crate::geometry::Rect;
use crate::LocatorError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// Font size used when a run's matrix has no usable vertical scale
pub const FALLBACK_FONT_SIZE: f32 = 12.0;

/// Default page height (US Letter, points) when the MediaBox is missing
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// One positioned text run in page space (top-left origin)
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The text content
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Layout width (0 when the source did not provide one)
    pub width: f32,
    /// Height (the font size)
    pub height: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Bounding box of this token
    pub fn bbox(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// A raw text run as produced by the rendering collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Transform matrix `[a, b, c, d, e, f]`, bottom-left origin
    pub transform: [f32; 6],
    /// Layout width, if the renderer computed one
    pub width: Option<f32>,
}

/// A page handle that can list its positioned text runs
pub trait PageTextSource {
    /// Page height at 100% scale
    fn page_height(&self) -> f32;

    /// Text runs in content order
    fn text_runs(&self) -> Result<Vec<TextRun>, LocatorError>;
}

/// Extract page-space tokens from a page handle.
///
/// Whitespace-only runs are skipped. Output order follows run order.
pub fn extract_tokens(source: &dyn PageTextSource) -> Result<Vec<Token>, LocatorError> {
    let page_height = source.page_height();
    let runs = source.text_runs()?;

    Ok(runs
        .into_iter()
        .filter(|run| !run.text.trim().is_empty())
        .map(|run| token_from_run(run, page_height))
        .collect())
}

/// Convert one run into a token, flipping the y axis to a top-left origin
fn token_from_run(run: TextRun, page_height: f32) -> Token {
    let [_, _, _, d, e, f] = run.transform;
    let mut font_size = d.abs();
    if !font_size.is_finite() || font_size == 0.0 {
        font_size = FALLBACK_FONT_SIZE;
    }

    Token {
        text: run.text,
        x: e,
        y: page_height - f - font_size,
        width: run.width.unwrap_or(0.0),
        height: font_size,
    }
}

/// A page whose runs were decoded elsewhere
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub height: f32,
    pub runs: Vec<TextRun>,
}

impl MemoryPage {
    pub fn new(height: f32, runs: Vec<TextRun>) -> Self {
        Self { height, runs }
    }
}

impl PageTextSource for MemoryPage {
    fn page_height(&self) -> f32 {
        self.height
    }

    fn text_runs(&self) -> Result<Vec<TextRun>, LocatorError> {
        Ok(self.runs.clone())
    }
}

/// A loaded PDF document
pub struct PdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfDocument {
    /// Load a PDF from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LocatorError> {
        Ok(Self::from_document(Document::load(path)?))
    }

    /// Load a PDF from a memory buffer
    pub fn load_mem(buffer: &[u8]) -> Result<Self, LocatorError> {
        Ok(Self::from_document(Document::load_mem(buffer)?))
    }

    fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        Self { doc, pages }
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Page handle for a 1-indexed page number
    pub fn page(&self, page_num: u32) -> Result<PdfPageSource<'_>, LocatorError> {
        let page_id = *self
            .pages
            .get(&page_num)
            .ok_or(LocatorError::PageNotFound(page_num))?;
        Ok(PdfPageSource {
            doc: &self.doc,
            page_id,
            height: media_box_height(&self.doc, page_id).unwrap_or(DEFAULT_PAGE_HEIGHT),
        })
    }
}

/// A single page of a [`PdfDocument`]
pub struct PdfPageSource<'a> {
    doc: &'a Document,
    page_id: ObjectId,
    height: f32,
}

impl PageTextSource for PdfPageSource<'_> {
    fn page_height(&self) -> f32 {
        self.height
    }

    fn text_runs(&self) -> Result<Vec<TextRun>, LocatorError> {
        content_text_runs(self.doc, self.page_id)
    }
}

/// Height of the page's MediaBox, following `Parent` links for inheritance
fn media_box_height(doc: &Document, page_id: ObjectId) -> Option<f32> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    loop {
        if let Ok(media_box) = dict.get(b"MediaBox") {
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let values = media_box.as_array().ok()?;
            if values.len() == 4 {
                let y0 = get_number(&values[1])?;
                let y1 = get_number(&values[3])?;
                return Some((y1 - y0).abs());
            }
            return None;
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Walk a page content stream and collect its text runs
fn content_text_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>, LocatorError> {
    use lopdf::content::Content;

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| LocatorError::Extraction(e.to_string()))?;
    let content =
        Content::decode(&content_data).map_err(|e| LocatorError::Extraction(e.to_string()))?;

    let mut runs = Vec::new();
    let mut state = TextState::default();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let m = read_matrix(&op.operands);
                    state.ctm = multiply_matrices(&m, &state.ctm);
                }
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => state.in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        state.font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        state.font_size = size;
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    // Translation is expressed in line-matrix space
                    let moved = multiply_matrices(&[1.0, 0.0, 0.0, 1.0, tx, ty], &state.line_matrix);
                    state.line_matrix = moved;
                    state.text_matrix = moved;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    state.text_matrix = read_matrix(&op.operands);
                    state.line_matrix = state.text_matrix;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if state.in_text_block && !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &state.font)
                    {
                        runs.push(state.run(text));
                    }
                }
            }
            "TJ" => {
                if state.in_text_block && !op.operands.is_empty() {
                    if let Ok(array) = op.operands[0].as_array() {
                        let text: String = array
                            .iter()
                            .filter_map(|item| {
                                extract_text_from_operand(item, doc, &fonts, &state.font)
                            })
                            .collect();
                        runs.push(state.run(text));
                    }
                }
            }
            "'" => {
                state.next_line();
                if !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &state.font)
                    {
                        runs.push(state.run(text));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Graphics and text state tracked while walking a content stream
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    font: String,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    in_text_block: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            font: String::new(),
            font_size: FALLBACK_FONT_SIZE,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            in_text_block: false,
        }
    }
}

impl TextState {
    fn next_line(&mut self) {
        // Approximate leading
        self.line_matrix[5] -= self.font_size * 1.2;
        self.text_matrix = self.line_matrix;
    }

    /// Build a run at the current position: font size x text matrix x CTM
    fn run(&self, text: String) -> TextRun {
        let size = [self.font_size, 0.0, 0.0, self.font_size, 0.0, 0.0];
        let transform = multiply_matrices(&size, &multiply_matrices(&self.text_matrix, &self.ctm));
        let em = (transform[0].powi(2) + transform[1].powi(2)).sqrt();
        // No glyph metrics here; half an em per character is close enough
        // for highlight boxes
        let width = text.chars().count() as f32 * em * 0.5;
        TextRun {
            text,
            transform,
            width: Some(width),
        }
    }
}

fn read_matrix(operands: &[Object]) -> [f32; 6] {
    let mut m = IDENTITY;
    for (i, operand) in operands.iter().take(6).enumerate() {
        m[i] = get_number(operand).unwrap_or(IDENTITY[i]);
    }
    m
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode a string operand using the current font's encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };

    if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
        if let Ok(encoding) = font_dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                return Some(text);
            }
        }
    }

    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }

    // Latin-1
    Some(bytes.iter().map(|&b| b as char).collect())
}
