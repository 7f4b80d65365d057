//! Semantic region detection
//!
//! Cheap geometric heuristics over a page's tokens:
//! - the "Ship To" address block, anchored on its label
//! - line-item rows, anchored on a leading line-number column
//!
//! These assume a labeled ship-to block and a left-hand line-number column.
//! Documents that break those conventions simply get no regions, and callers
//! fall back to searching the whole page.

use crate::extractor::Token;
use crate::geometry::Region;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Line-item rows keyed by line number
pub type LineRowMap = BTreeMap<u32, Region>;

static SHIP_TO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bship[\s_-]*to\b").unwrap());
static BILL_TO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbill[\s_-]*to\b").unwrap());
static LINE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Ship-to block height when no Bill-To label bounds it
const SHIP_TO_DEFAULT_HEIGHT: f32 = 200.0;
/// Minimum ship-to block width
const SHIP_TO_MIN_WIDTH: f32 = 350.0;
/// Tokens at or right of this x belong to another column
const SHIP_TO_MAX_X: f32 = 450.0;

/// Line numbers must start left of this x
const LINE_NUMBER_MAX_X: f32 = 100.0;
/// Fraction of the gap to the next line number a row may use
const ROW_SHRINK: f32 = 0.90;
const ROW_MIN_HEIGHT: f32 = 20.0;
const LAST_ROW_MIN_HEIGHT: f32 = 40.0;
/// Rows span the whole page horizontally
const ROW_WIDTH: f32 = 1000.0;

/// Whether a token is a Ship-To label ("Ship To", "SHIP-TO:", "Shipto")
pub fn is_ship_to_label(text: &str) -> bool {
    SHIP_TO_RE.is_match(text) && !text.to_lowercase().contains("bill")
}

/// Whether a token is a Bill-To label
pub fn is_bill_to_label(text: &str) -> bool {
    BILL_TO_RE.is_match(text)
}

/// Infer the ship-to address block.
///
/// Returns `None` when no Ship-To label exists on the page.
pub fn detect_ship_to_region(tokens: &[Token]) -> Option<Region> {
    let ship_to = tokens.iter().find(|t| is_ship_to_label(&t.text))?;

    // Nearest Bill-To label clearly below the Ship-To label bounds the block
    let bill_to = tokens
        .iter()
        .filter(|t| is_bill_to_label(&t.text) && t.y - ship_to.y > 10.0)
        .min_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));

    let height = match bill_to {
        Some(bill) => (bill.y - ship_to.y - 10.0).min(SHIP_TO_DEFAULT_HEIGHT),
        None => SHIP_TO_DEFAULT_HEIGHT,
    };

    let band_bottom = ship_to.y + height;
    let rightmost = tokens
        .iter()
        .filter(|t| t.y >= ship_to.y && t.y <= band_bottom && t.x < SHIP_TO_MAX_X)
        .map(|t| t.x + t.width)
        .fold(ship_to.x + ship_to.width, f32::max);

    let width = (rightmost - ship_to.x + 20.0).max(SHIP_TO_MIN_WIDTH);

    log::debug!(
        "ship-to region at ({:.1}, {:.1}) {:.1}x{:.1}, bill-to {}",
        ship_to.x - 10.0,
        ship_to.y,
        width,
        height,
        if bill_to.is_some() { "found" } else { "absent" }
    );

    Some(Region::new(ship_to.x - 10.0, ship_to.y, width, height))
}

/// Infer line-item rows from the left-hand line-number column.
///
/// Each numeric token left of x=100 starts a row. A row reaches 90% of the
/// way to the next line number (at least 20 units, never past the next
/// row); the last row gets three text heights (at least 40 units).
pub fn detect_line_rows(tokens: &[Token]) -> LineRowMap {
    let mut anchors: Vec<(u32, &Token)> = tokens
        .iter()
        .filter(|t| t.x < LINE_NUMBER_MAX_X)
        .filter_map(|t| {
            let text = t.text.trim();
            if !LINE_NUMBER_RE.is_match(text) {
                return None;
            }
            text.parse::<u32>().ok().map(|n| (n, t))
        })
        .collect();

    // Stable sort keeps extraction order among equal y
    anchors.sort_by(|a, b| a.1.y.partial_cmp(&b.1.y).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows = LineRowMap::new();
    for (i, (line, token)) in anchors.iter().enumerate() {
        let row_height = match anchors.get(i + 1) {
            Some((_, next)) => {
                let gap = next.y - token.y;
                (ROW_SHRINK * gap).max(ROW_MIN_HEIGHT).min(gap)
            }
            None => (3.0 * token.height).max(LAST_ROW_MIN_HEIGHT),
        };

        rows.entry(*line)
            .or_insert_with(|| Region::new(0.0, token.y - 2.0, ROW_WIDTH, row_height));
    }

    log::debug!("detected {} line-item rows", rows.len());
    rows
}

/// Whether a token falls inside any line-item row band
pub fn in_any_row(token: &Token, rows: &LineRowMap) -> bool {
    rows.values().any(|row| row.contains_y(token.y))
}
