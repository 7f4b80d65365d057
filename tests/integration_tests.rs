//! Integration tests for the field locator library

use pdf_field_locator::draw::RecordingSurface;
use pdf_field_locator::lens::{paint_lens, LensFrame};
use pdf_field_locator::regions::{detect_line_rows, detect_ship_to_region};
use pdf_field_locator::settings::{
    EnablementStore, FileEnablementStore, MatchConfig, MemoryEnablementStore,
};
use pdf_field_locator::transform::{PageViewport, RasterInfo};
use pdf_field_locator::{
    extract_tokens, find_match, locate_in_pdf, FieldType, HighlightController, HighlightRequest,
    LocatorConfig, MemoryPage, PageKey, PageTextCache, PageTextData, PdfDocument, Rect,
    RequestStatus, TextRun, Token,
};
use std::sync::Arc;

// Helper to create test tokens, 5 units per character, 10 units tall
fn tok(text: &str, x: f32, y: f32) -> Token {
    Token::new(text, x, y, text.len() as f32 * 5.0, 10.0)
}

// A page-space run whose token lands at (x, y) on a 792-high page
fn run(text: &str, x: f32, y: f32) -> TextRun {
    TextRun {
        text: text.to_string(),
        transform: [10.0, 0.0, 0.0, 10.0, x, 792.0 - y - 10.0],
        width: Some(text.len() as f32 * 5.0),
    }
}

fn locate(request: &HighlightRequest, tokens: Vec<Token>) -> Option<Rect> {
    let page = PageTextData::from_tokens(tokens);
    find_match(request, &page, &MatchConfig::default())
        .result
        .map(|m| m.bbox())
}

fn invoice_page() -> Vec<Token> {
    vec![
        tok("Order Date", 300.0, 40.0),
        tok("02-DEC-2025", 380.0, 40.0),
        tok("Ship To", 50.0, 100.0),
        tok("Acme Corp", 50.0, 130.0),
        tok("12 Harbor Rd", 50.0, 145.0),
        tok("1", 30.0, 400.0),
        tok("WIDGET", 120.0, 400.0),
        tok("1,200.00", 500.0, 400.0),
        tok("Total", 400.0, 600.0),
        tok("1,200.00", 500.0, 600.0),
    ]
}

// ============================================================================
// Region Detection
// ============================================================================

#[test]
fn test_ship_to_region_bounded_by_bill_to() {
    let tokens = vec![
        tok("Ship To", 50.0, 100.0),
        tok("Bill To", 50.0, 320.0),
        tok("Acme Corp", 50.0, 130.0),
    ];
    let region = detect_ship_to_region(&tokens).expect("ship-to region");
    assert_eq!(region.x, 40.0);
    assert_eq!(region.y, 100.0);
    assert_eq!(region.height, 200.0);
    assert!(region.width >= 350.0);
}

#[test]
fn test_line_row_heights() {
    let tokens = vec![
        tok("1", 30.0, 200.0),
        tok("2", 30.0, 260.0),
        tok("3", 30.0, 340.0),
    ];
    let rows = detect_line_rows(&tokens);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[&1].height, 54.0);
    assert_eq!(rows[&2].height, 72.0);
    assert_eq!(rows[&3].height, 40.0);
}

#[test]
fn test_line_rows_ordered_and_disjoint() {
    let tokens = vec![
        tok("3", 30.0, 250.0),
        tok("1", 30.0, 200.0),
        tok("2", 30.0, 215.0),
        tok("99", 400.0, 230.0),
    ];
    let rows = detect_line_rows(&tokens);
    assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

    let bands: Vec<&Rect> = rows.values().collect();
    for pair in bands.windows(2) {
        assert!(pair[0].y < pair[1].y);
        assert!(pair[0].bottom() <= pair[1].y);
        assert!(!pair[0].overlaps_vertically(pair[1]));
    }
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_line_item_value_in_requested_row() {
    let tokens = vec![
        tok("1", 30.0, 200.0),
        tok("10.00", 300.0, 200.0),
        tok("2", 30.0, 260.0),
        tok("QTY", 200.0, 260.0),
        tok("10.00", 300.0, 260.0),
        tok("EA", 360.0, 260.0),
        tok("3", 30.0, 340.0),
    ];
    let request = HighlightRequest::line_item(2, "quantity", "10.00");
    let page = PageTextData::from_tokens(tokens);
    let matched = find_match(&request, &page, &MatchConfig::default())
        .result
        .expect("row 2 value");
    assert_eq!(matched.text, "10.00");
    assert_eq!(matched.bbox(), Rect::new(300.0, 260.0, 25.0, 10.0));
}

#[test]
fn test_grand_total_skips_line_item_rows() {
    let request =
        HighlightRequest::new(FieldType::OrderHeader, "1,200.00").with_field_name("order_total");
    let found = locate(&request, invoice_page()).expect("total");
    assert_eq!(found.y, 600.0);
}

#[test]
fn test_us_date_matches_printed_variant() {
    let request =
        HighlightRequest::new(FieldType::OrderHeader, "12/2/2025").with_field_name("order_date");
    let found = locate(&request, invoice_page()).expect("date");
    assert_eq!(found.x, 380.0);
}

#[test]
fn test_plain_amount_matches_dollar_variant() {
    let tokens = vec![tok("Subtotal", 300.0, 120.0), tok("$1,121.28", 400.0, 120.0)];
    let request =
        HighlightRequest::new(FieldType::OrderHeader, "1121.28").with_field_name("subtotal");
    assert_eq!(locate(&request, tokens).map(|r| r.x), Some(400.0));

    let tokens = vec![tok("$1,121.28", 400.0, 120.0)];
    let request =
        HighlightRequest::new(FieldType::OrderHeader, "1,121.28").with_field_name("subtotal");
    assert!(locate(&request, tokens).is_some());
}

#[test]
fn test_ship_to_value_inside_region() {
    let request = HighlightRequest::new(FieldType::ShipToAddress, "Acme Corp");
    let found = locate(&request, invoice_page()).expect("ship-to value");
    assert_eq!(found.y, 130.0);
}

#[test]
fn test_ship_to_without_label_searches_whole_page() {
    let tokens = vec![tok("Invoice", 50.0, 50.0), tok("Acme Corp", 50.0, 500.0)];
    let request = HighlightRequest::new(FieldType::ShipToAddress, "Acme Corp");
    assert_eq!(locate(&request, tokens).map(|r| r.y), Some(500.0));
}

#[test]
fn test_missing_value_has_diagnostic() {
    let request = HighlightRequest::line_item(1, "sku", "ZZ-404");
    let page = PageTextData::from_tokens(invoice_page());
    let outcome = find_match(&request, &page, &MatchConfig::default());
    assert!(outcome.result.is_none());
    let diagnostic = outcome.diagnostic.expect("diagnostic");
    assert!(diagnostic.contains("ZZ-404"));
}

// ============================================================================
// Extraction and Cache
// ============================================================================

#[test]
fn test_extract_from_memory_page() {
    let page = MemoryPage::new(792.0, vec![run("Ship To", 50.0, 100.0), run("  ", 0.0, 0.0)]);
    let tokens = extract_tokens(&page).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].text, "Ship To");
    assert_eq!(tokens[0].x, 50.0);
    assert_eq!(tokens[0].y, 100.0);
    assert_eq!(tokens[0].height, 10.0);
}

#[test]
fn test_cache_extracts_each_page_once() {
    let cache = PageTextCache::new();
    let key = PageKey::new("invoice-17", 1);
    let page = MemoryPage::new(792.0, vec![run("Ship To", 50.0, 100.0)]);

    let first = cache.get_or_extract(&key, &page).unwrap();
    let second = cache.get_or_extract(&key, &page).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.ship_to_region.is_some());
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_prefetch_fills_cache() {
    let cache = PageTextCache::new();
    let pages: Vec<(u32, MemoryPage)> = (1..=4)
        .map(|n| (n, MemoryPage::new(792.0, vec![run(&n.to_string(), 30.0, 200.0)])))
        .collect();
    assert!(cache.prefetch("doc", &pages).is_empty());
    assert_eq!(cache.len(), 4);
    assert!(cache.contains(&PageKey::new("doc", 3)));
    assert!(!cache.contains(&PageKey::new("other", 3)));
}

// One-page Letter PDF with the given content stream and Helvetica as /F1
fn build_pdf(content: &[u8]) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, ObjectId, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content_id = doc.add_object(Object::Stream(Stream::new(
        lopdf::Dictionary::new(),
        content.to_vec(),
    )));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => Object::Dictionary(dictionary! {
            "Font" => Object::Dictionary(dictionary! {
                "F1" => font_id,
            }),
        }),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn test_pdf_content_stream_tokens() {
    let bytes = build_pdf(b"BT /F1 10 Tf 72 700 Td (1,200.00) Tj ET");
    let doc = PdfDocument::load_mem(&bytes).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(doc.page(2).is_err());

    let page = doc.page(1).unwrap();
    let tokens = extract_tokens(&page).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].text, "1,200.00");
    assert_eq!(tokens[0].x, 72.0);
    assert_eq!(tokens[0].y, 792.0 - 700.0 - 10.0);
    assert_eq!(tokens[0].height, 10.0);
}

#[test]
fn test_locate_in_pdf_file() {
    let bytes = build_pdf(
        b"BT /F1 10 Tf 400 200 Td (Total) Tj 100 0 Td (1,200.00) Tj ET",
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.pdf");
    std::fs::write(&path, bytes).unwrap();

    let request =
        HighlightRequest::new(FieldType::OrderHeader, "1200").with_field_name("order_total");
    let result = locate_in_pdf(&path, 1, &request).unwrap();
    assert_eq!(result.page_count, 1);
    assert_eq!(result.page.items.len(), 2);

    let matched = result.outcome.result.expect("total located");
    assert_eq!(matched.text, "1,200.00");
    assert_eq!(matched.x, 500.0);
    assert_eq!(matched.y, 792.0 - 200.0 - 10.0);
}

#[test]
fn test_invalid_pdf_is_rejected() {
    assert!(PdfDocument::load_mem(b"definitely not a pdf").is_err());

    let request = HighlightRequest::new(FieldType::OrderHeader, "PO-1");
    assert!(locate_in_pdf("/nonexistent/invoice.pdf", 1, &request).is_err());
}

// ============================================================================
// Controller
// ============================================================================

fn controller(store: Box<dyn EnablementStore>) -> HighlightController {
    HighlightController::new(Arc::new(PageTextCache::new()), store, LocatorConfig::default())
}

fn invoice_source() -> MemoryPage {
    MemoryPage::new(
        792.0,
        invoice_page()
            .into_iter()
            .map(|t| run(&t.text, t.x, t.y))
            .collect(),
    )
}

#[test]
fn test_controller_highlight_flow() {
    let mut c = controller(Box::new(MemoryEnablementStore::new(true)));
    let key = PageKey::new("invoice-17", 1);
    let request =
        HighlightRequest::new(FieldType::OrderHeader, "1,200.00").with_field_name("order_total");

    let matches = c.highlight(key.clone(), request.clone(), &invoice_source());
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].y, 600.0);

    // Cached now, so a fresh request resolves immediately
    assert_eq!(c.request(key, request), RequestStatus::Ready);

    let viewport = PageViewport::new(612.0, 792.0, 1.5);
    let frame = c.overlay(viewport);
    assert_eq!(frame.width, 918.0);
    assert!(!frame.accepts_pointer());
    assert!(!frame.commands.is_empty());

    let raster = RasterInfo {
        pixel_width: 1836,
        pixel_height: 2376,
        display_width: 918.0,
        display_height: 1188.0,
    };
    let anchor = Rect::new(0.0, 240.0, 918.0, 1188.0);
    let LensFrame::Visible(view) = c.lens(viewport, Some(raster), Some(anchor)).clone() else {
        panic!("lens should be visible");
    };
    let mut surface = RecordingSurface::new();
    assert!(paint_lens(&mut surface, &view).is_none());
    assert_eq!(surface.commands, view.commands);
}

#[test]
fn test_controller_navigation_drops_late_result() {
    let mut c = controller(Box::new(MemoryEnablementStore::new(true)));
    let page1 = PageKey::new("invoice-17", 1);
    let request = HighlightRequest::new(FieldType::ShipToAddress, "Acme Corp");

    let RequestStatus::NeedsExtraction(ticket) = c.request(page1.clone(), request) else {
        panic!("page should need extraction");
    };
    c.navigate(PageKey::new("invoice-17", 2));

    let tokens = extract_tokens(&invoice_source());
    assert!(!c.complete_extraction(&ticket, tokens));
    assert!(c.matches().is_empty());
    assert!(c.cache().contains(&page1));
}

#[test]
fn test_enablement_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("field-highlight");

    let mut c = controller(Box::new(FileEnablementStore::new(&path)));
    assert!(!c.is_enabled());
    assert_eq!(
        c.request(PageKey::new("d", 1), HighlightRequest::new(FieldType::OrderHeader, "x")),
        RequestStatus::Disabled
    );
    assert!(c.toggle().unwrap());

    let c = controller(Box::new(FileEnablementStore::new(&path)));
    assert!(c.is_enabled());
}
