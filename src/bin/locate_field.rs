//! CLI tool for locating a field value on a PDF page

use pdf_field_locator::{locate_in_pdf, ColumnHint, FieldType, HighlightRequest};
use std::env;
use std::process;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} <pdf_file> <page> <field_type> <field_name> <value> [options]",
        program
    );
    eprintln!();
    eprintln!("field_type: line_item | shipto_address | order_header");
    eprintln!("options:");
    eprintln!("  --line <n>                     line number (line_item)");
    eprintln!("  --column <left|center|right>   column hint");
    eprintln!("  --json                         machine-readable output");
    process::exit(1);
}

fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 6 {
        usage(&args[0]);
    }

    let pdf_path = &args[1];
    let page: u32 = args[2].parse().unwrap_or_else(|_| usage(&args[0]));
    let field_type: FieldType = args[3].parse().unwrap_or_else(|e| {
        eprintln!("{}", e);
        usage(&args[0])
    });

    let mut request = HighlightRequest::new(field_type, args[5].as_str()).with_field_name(&args[4]);
    let mut json_output = false;

    let mut rest = args[6..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--json" => json_output = true,
            "--line" => {
                let line = rest.next().and_then(|v| v.parse().ok());
                match line {
                    Some(line) => request = request.with_line_number(line),
                    None => usage(&args[0]),
                }
            }
            "--column" => {
                let hint = rest.next().and_then(|v| v.parse::<ColumnHint>().ok());
                match hint {
                    Some(hint) => request = request.with_column_hint(hint),
                    None => usage(&args[0]),
                }
            }
            _ => usage(&args[0]),
        }
    }

    match locate_in_pdf(pdf_path, page, &request) {
        Ok(result) => {
            let outcome = &result.outcome;
            if json_output {
                let matched = outcome
                    .result
                    .as_ref()
                    .map(|m| {
                        format!(
                            r#"{{"x":{:.2},"y":{:.2},"width":{:.2},"height":{:.2},"text":"{}"}}"#,
                            m.x,
                            m.y,
                            m.width,
                            m.height,
                            json_escape(&m.text)
                        )
                    })
                    .unwrap_or_else(|| "null".to_string());
                let diagnostic = outcome
                    .diagnostic
                    .as_ref()
                    .map(|d| format!("\"{}\"", json_escape(d)))
                    .unwrap_or_else(|| "null".to_string());
                println!(
                    r#"{{"match":{},"diagnostic":{},"page_count":{},"processing_time_ms":{}}}"#,
                    matched, diagnostic, result.page_count, result.processing_time_ms
                );
            } else {
                println!("Field Locator");
                println!("=============");
                println!("File: {}", pdf_path);
                println!("Page: {} of {}", page, result.page_count);
                println!(
                    "Field: {} {} = {:?}",
                    field_type.as_str(),
                    args[4],
                    request.value
                );
                println!();
                match &outcome.result {
                    Some(m) => {
                        println!("Match: {:?}", m.text);
                        println!(
                            "Box: x={:.1} y={:.1} w={:.1} h={:.1}",
                            m.x, m.y, m.width, m.height
                        );
                    }
                    None => {
                        println!("No match found.");
                        if let Some(d) = &outcome.diagnostic {
                            println!("{}", d);
                        }
                    }
                }
                println!();
                println!("Processing time: {}ms", result.processing_time_ms);
            }
            if outcome.result.is_none() {
                process::exit(2);
            }
        }
        Err(e) => {
            if json_output {
                println!(r#"{{"error":"{}"}}"#, json_escape(&e.to_string()));
            } else {
                eprintln!("Error: {}", e);
            }
            process::exit(1);
        }
    }
}
