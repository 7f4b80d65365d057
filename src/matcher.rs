//! Field value matching
//!
//! Given a [`HighlightRequest`] and the cached text of its page, find the one
//! token box that best represents the requested value:
//!
//! 1. narrow the token set spatially using the detected regions
//! 2. expand the value into format-variant patterns
//! 3. try exact match, then substring, then adjacent token pairs
//! 4. refine by column hint
//!
//! Every step falls back to the wider set when its anchor is missing, so a
//! page without detectable structure is simply searched as a whole.

use crate::cache::PageTextData;
use crate::extractor::Token;
use crate::geometry::Rect;
use crate::patterns::{build_patterns, is_grand_total_field};
use crate::regions::in_any_row;
use crate::settings::MatchConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

static TOTAL_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)total").unwrap());

/// Header fields live in the top band of the page
const HEADER_BAND_BOTTOM: f32 = 300.0;
/// Vertical distance from the "Total" label still considered on its line
const TOTAL_LABEL_Y_TOLERANCE: f32 = 25.0;
/// How far left of the "Total" label a value may start
const TOTAL_LABEL_X_SLACK: f32 = 50.0;
/// Longer tokens are sentences, not labels
const TOTAL_LABEL_MAX_CHARS: usize = 20;

/// Kind of structured field being located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    LineItem,
    ShipToAddress,
    OrderHeader,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::LineItem => "line_item",
            FieldType::ShipToAddress => "shipto_address",
            FieldType::OrderHeader => "order_header",
        }
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line_item" => Ok(FieldType::LineItem),
            "shipto_address" => Ok(FieldType::ShipToAddress),
            "order_header" => Ok(FieldType::OrderHeader),
            other => Err(format!("unknown field type: {}", other)),
        }
    }
}

/// Which third of the page a value is expected in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnHint {
    Left,
    Center,
    Right,
}

impl std::str::FromStr for ColumnHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(ColumnHint::Left),
            "center" => Ok(ColumnHint::Center),
            "right" => Ok(ColumnHint::Right),
            other => Err(format!("unknown column hint: {}", other)),
        }
    }
}

/// A request to locate a known field value on a page
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRequest {
    pub field_type: FieldType,
    pub field_name: Option<String>,
    pub value: String,
    pub line_number: Option<u32>,
    pub column_hint: Option<ColumnHint>,
}

impl HighlightRequest {
    pub fn new(field_type: FieldType, value: impl Into<String>) -> Self {
        Self {
            field_type,
            field_name: None,
            value: value.into(),
            line_number: None,
            column_hint: None,
        }
    }

    pub fn line_item(line_number: u32, field_name: &str, value: impl Into<String>) -> Self {
        Self::new(FieldType::LineItem, value)
            .with_field_name(field_name)
            .with_line_number(line_number)
    }

    pub fn with_field_name(mut self, name: &str) -> Self {
        self.field_name = Some(name.to_string());
        self
    }

    pub fn with_line_number(mut self, line_number: u32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn with_column_hint(mut self, hint: ColumnHint) -> Self {
        self.column_hint = Some(hint);
        self
    }
}

/// A located value in page space
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
}

impl MatchResult {
    pub fn bbox(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn from_rect(rect: Rect, text: String) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            text,
        }
    }
}

/// Result of a search: zero or one match, plus a diagnostic on failure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub result: Option<MatchResult>,
    pub diagnostic: Option<String>,
}

/// How the spatial filter narrowed the page
#[derive(Debug, Clone, PartialEq)]
enum SearchScope {
    Row(u32, Rect),
    ShipTo(Rect),
    NearTotalLabel { label_y: f32 },
    OutsideRows,
    HeaderBand,
    WholePage,
}

impl std::fmt::Display for SearchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchScope::Row(line, row) => write!(
                f,
                "line {} row y={:.1}..{:.1}",
                line,
                row.y,
                row.bottom()
            ),
            SearchScope::ShipTo(r) => write!(
                f,
                "ship-to region ({:.1}, {:.1}) {:.1}x{:.1}",
                r.x, r.y, r.width, r.height
            ),
            SearchScope::NearTotalLabel { label_y } => {
                write!(f, "near total label y={:.1}", label_y)
            }
            SearchScope::OutsideRows => write!(f, "outside line-item rows"),
            SearchScope::HeaderBand => write!(f, "header band y<{}", HEADER_BAND_BOTTOM),
            SearchScope::WholePage => write!(f, "whole page"),
        }
    }
}

/// A match candidate before column refinement
struct Candidate {
    rect: Rect,
    text: String,
}

/// Locate a request's value among a page's cached tokens
pub fn find_match(
    request: &HighlightRequest,
    page: &PageTextData,
    config: &MatchConfig,
) -> MatchOutcome {
    let value = request.value.trim();
    let (scope, tokens) = spatial_filter(request, page);

    if value.is_empty() {
        return MatchOutcome {
            result: None,
            diagnostic: Some("empty value, nothing to search for".to_string()),
        };
    }

    let patterns: Vec<String> = build_patterns(value, request.field_name.as_deref())
        .into_iter()
        .map(|p| p.to_lowercase())
        .collect();

    let mut candidates = exact_candidates(&tokens, &patterns);
    if candidates.is_empty() {
        candidates = substring_candidates(&tokens, &patterns);
    }
    if candidates.is_empty() {
        candidates = pair_candidates(&tokens, value);
    }

    if let Some(hint) = request.column_hint {
        if candidates.len() > 1 {
            candidates = refine_by_column(candidates, hint, config.nominal_page_width);
        }
    }

    match candidates.into_iter().next() {
        Some(c) => MatchOutcome {
            result: Some(MatchResult::from_rect(c.rect, c.text)),
            diagnostic: None,
        },
        None => {
            let diagnostic = describe_failure(request, &scope, &tokens);
            log::debug!("{}", diagnostic);
            MatchOutcome {
                result: None,
                diagnostic: Some(diagnostic),
            }
        }
    }
}

/// Narrow the page's tokens to where this field should be printed
fn spatial_filter<'a>(
    request: &HighlightRequest,
    page: &'a PageTextData,
) -> (SearchScope, Vec<&'a Token>) {
    let all: Vec<&Token> = page.items.iter().collect();

    match request.field_type {
        FieldType::LineItem => {
            let row = request
                .line_number
                .and_then(|n| page.line_row_map.get(&n).map(|r| (n, *r)));
            match row {
                Some((line, row)) => {
                    let tokens = all.into_iter().filter(|t| row.contains_y(t.y)).collect();
                    (SearchScope::Row(line, row), tokens)
                }
                None => (SearchScope::WholePage, all),
            }
        }
        FieldType::ShipToAddress => match page.ship_to_region {
            Some(region) => {
                let tokens = all
                    .into_iter()
                    .filter(|t| region.contains_rect(&t.bbox()))
                    .collect();
                (SearchScope::ShipTo(region), tokens)
            }
            None => (SearchScope::WholePage, all),
        },
        FieldType::OrderHeader if is_grand_total_field(request.field_name.as_deref()) => {
            grand_total_filter(page, all)
        }
        FieldType::OrderHeader => {
            let header: Vec<&Token> = all
                .iter()
                .copied()
                .filter(|t| t.y < HEADER_BAND_BOTTOM)
                .collect();
            if header.is_empty() {
                (SearchScope::WholePage, all)
            } else {
                (SearchScope::HeaderBand, header)
            }
        }
    }
}

/// Grand totals: skip line-item rows (a single-line order repeats its total
/// there), then prefer values on the bottom-most "Total" label's line.
fn grand_total_filter<'a>(
    page: &'a PageTextData,
    all: Vec<&'a Token>,
) -> (SearchScope, Vec<&'a Token>) {
    let label = all
        .iter()
        .filter(|t| {
            t.text.chars().count() < TOTAL_LABEL_MAX_CHARS && TOTAL_LABEL_RE.is_match(&t.text)
        })
        .max_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        .copied();

    let Some(label) = label else {
        return (SearchScope::WholePage, all);
    };

    let outside_rows: Vec<&Token> = all
        .iter()
        .copied()
        .filter(|t| !in_any_row(t, &page.line_row_map))
        .collect();

    let near_label: Vec<&Token> = outside_rows
        .iter()
        .copied()
        .filter(|t| {
            (t.y - label.y).abs() <= TOTAL_LABEL_Y_TOLERANCE
                && t.x >= label.x - TOTAL_LABEL_X_SLACK
        })
        .collect();

    if !near_label.is_empty() {
        (SearchScope::NearTotalLabel { label_y: label.y }, near_label)
    } else if !outside_rows.is_empty() {
        (SearchScope::OutsideRows, outside_rows)
    } else {
        (SearchScope::WholePage, all)
    }
}

/// Tokens equal to the highest-priority pattern that has any hit
fn exact_candidates(tokens: &[&Token], patterns: &[String]) -> Vec<Candidate> {
    first_pattern_hits(tokens, patterns, |text, p| text.trim() == p)
}

/// Tokens containing the highest-priority pattern that has any hit
fn substring_candidates(tokens: &[&Token], patterns: &[String]) -> Vec<Candidate> {
    first_pattern_hits(tokens, patterns, |text, p| text.contains(p))
}

/// Patterns are tried in priority order; a weak variant such as a bare
/// year only counts once every stronger pattern came up empty.
fn first_pattern_hits<F>(tokens: &[&Token], patterns: &[String], hit: F) -> Vec<Candidate>
where
    F: Fn(&str, &str) -> bool,
{
    let texts: Vec<String> = tokens.iter().map(|t| t.text.to_lowercase()).collect();
    for pattern in patterns {
        let found: Vec<Candidate> = tokens
            .iter()
            .zip(&texts)
            .filter(|(_, text)| hit(text, pattern))
            .map(|(t, _)| candidate(t))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// A value split over two runs: test each pair of x-neighbours
fn pair_candidates(tokens: &[&Token], value: &str) -> Vec<Candidate> {
    if tokens.len() < 2 {
        return Vec::new();
    }

    let mut sorted: Vec<&Token> = tokens.to_vec();
    sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let needle = value.to_lowercase();
    sorted
        .windows(2)
        .filter_map(|pair| {
            let joined = format!("{}{}", pair[0].text, pair[1].text);
            if joined.to_lowercase().contains(&needle) {
                Some(Candidate {
                    rect: pair[0].bbox().union(&pair[1].bbox()),
                    text: joined,
                })
            } else {
                None
            }
        })
        .collect()
}

fn candidate(token: &Token) -> Candidate {
    Candidate {
        rect: token.bbox(),
        text: token.text.clone(),
    }
}

/// Keep candidates in the hinted third of the page, unless none are there
fn refine_by_column(
    candidates: Vec<Candidate>,
    hint: ColumnHint,
    page_width: f32,
) -> Vec<Candidate> {
    let third = page_width / 3.0;
    let in_column = |c: &Candidate| {
        let (cx, _) = c.rect.center();
        match hint {
            ColumnHint::Left => cx < third,
            ColumnHint::Center => cx >= third && cx < 2.0 * third,
            ColumnHint::Right => cx >= 2.0 * third,
        }
    };

    if candidates.iter().any(|c| in_column(c)) {
        candidates.into_iter().filter(|c| in_column(c)).collect()
    } else {
        candidates
    }
}

fn describe_failure(request: &HighlightRequest, scope: &SearchScope, tokens: &[&Token]) -> String {
    let mut msg = format!(
        "No match for {:?} ({}{}), searched {}: {} tokens",
        request.value,
        request.field_type.as_str(),
        request
            .field_name
            .as_deref()
            .map(|n| format!(" {}", n))
            .unwrap_or_default(),
        scope,
        tokens.len()
    );
    if !tokens.is_empty() {
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        let _ = write!(msg, " [{}]", texts.join(", "));
    }
    msg
}
