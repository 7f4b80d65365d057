use pdf_field_locator::{extract_tokens, PageTextData, PdfDocument};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_regions <pdf_path> [page | min-max]");
        std::process::exit(1);
    }

    let doc = PdfDocument::load(&args[1]).expect("Failed to load PDF");

    let range = args.get(2).map(|s| s.as_str()).unwrap_or("1");
    let (min_page, max_page) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(1), b.parse().unwrap_or(1))
    } else {
        let p = range.parse().unwrap_or(1);
        (p, p)
    };

    for page in min_page..=max_page.min(doc.page_count()) {
        let tokens = match doc.page(page).and_then(|source| extract_tokens(&source)) {
            Ok(tokens) => tokens,
            Err(e) => {
                println!("=== PAGE {} (extraction failed: {}) ===", page, e);
                println!();
                continue;
            }
        };
        let data = PageTextData::from_tokens(tokens);

        println!("=== PAGE {} ({} tokens) ===", page, data.items.len());
        for t in &data.items {
            println!(
                "  x={:7.1} y={:7.1} w={:7.1} h={:5.1} text={:?}",
                t.x, t.y, t.width, t.height, t.text
            );
        }
        match data.ship_to_region {
            Some(r) => println!(
                "ship-to: x={:.1} y={:.1} w={:.1} h={:.1}",
                r.x, r.y, r.width, r.height
            ),
            None => println!("ship-to: (none)"),
        }
        for (line, row) in &data.line_row_map {
            println!("row {:3}: y={:.1}..{:.1}", line, row.y, row.bottom());
        }
        println!();
    }
}
