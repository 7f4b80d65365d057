//! Format-variant patterns for field values
//!
//! Structured data stores a value in one canonical format, while the source
//! document may print it differently. For dates and money amounts we expand
//! the value into the renderings commonly seen on invoices and purchase
//! orders; everything else is searched literally.

use once_cell::sync::Lazy;
use regex::Regex;

static US_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());
static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?\s*(-?)(\d{1,3}(?:,\d{3})+|\d+)(\.\d+)?$").unwrap());

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// How a field's value is printed, judged from the field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Date,
    Currency,
    Literal,
}

fn normalize_name(field_name: &str) -> String {
    field_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Classify a field by name
pub fn value_format(field_name: Option<&str>) -> ValueFormat {
    let Some(name) = field_name.map(normalize_name) else {
        return ValueFormat::Literal;
    };
    if name.contains("date") {
        ValueFormat::Date
    } else if name.contains("total") || name.contains("price") || name.contains("amount") {
        ValueFormat::Currency
    } else {
        ValueFormat::Literal
    }
}

/// Whether a field denotes the document's grand total
pub fn is_grand_total_field(field_name: Option<&str>) -> bool {
    let Some(name) = field_name.map(normalize_name) else {
        return false;
    };
    if name == "amount_due" || name == "balance_due" {
        return true;
    }
    name.contains("total")
        && !name.contains("sub")
        && !name.contains("line")
        && !name.contains("qty")
}

/// Build the list of search patterns for a value, original first.
///
/// Patterns are deduplicated while keeping order.
pub fn build_patterns(value: &str, field_name: Option<&str>) -> Vec<String> {
    let value = value.trim();
    let mut patterns = vec![value.to_string()];

    let variants = match value_format(field_name) {
        ValueFormat::Date => date_variants(value),
        ValueFormat::Currency => currency_variants(value),
        ValueFormat::Literal => Vec::new(),
    };

    for variant in variants {
        if !patterns.contains(&variant) {
            patterns.push(variant);
        }
    }
    patterns
}

/// Alternative renderings of an `M/D/YYYY` date.
///
/// Values that do not parse produce no variants.
pub fn date_variants(value: &str) -> Vec<String> {
    let Some(caps) = US_DATE_RE.captures(value.trim()) else {
        return Vec::new();
    };
    let (Ok(month), Ok(day)) = (caps[1].parse::<usize>(), caps[2].parse::<u32>()) else {
        return Vec::new();
    };
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Vec::new();
    }
    let year = &caps[3];
    let mon = MONTHS[month - 1];

    vec![
        format!("{:02}-{}-{}", day, mon, year),
        format!("{}-{}-{}", day, mon, year),
        format!("{}-{}-{}", mon, day, year),
        format!("{} {}, {}", mon, day, year),
        mon.to_string(),
        year.to_string(),
    ]
}

/// Alternative renderings of a money amount: with and without thousands
/// separators, bare, `$`-prefixed and `$ `-prefixed.
pub fn currency_variants(value: &str) -> Vec<String> {
    let Some(caps) = AMOUNT_RE.captures(value.trim()) else {
        return Vec::new();
    };
    let sign = &caps[1];
    let digits: String = caps[2].chars().filter(|c| *c != ',').collect();
    let fraction = caps.get(3).map(|m| m.as_str()).unwrap_or("");

    let plain = format!("{}{}{}", sign, digits, fraction);
    let grouped = format!("{}{}{}", sign, group_thousands(&digits), fraction);

    let mut variants = Vec::new();
    for number in [&grouped, &plain] {
        for prefix in ["", "$", "$ "] {
            let variant = format!("{}{}", prefix, number);
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }
    variants
}

/// Insert `,` every three digits from the right
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_format() {
        assert_eq!(value_format(Some("order_date")), ValueFormat::Date);
        assert_eq!(value_format(Some("Ship Date")), ValueFormat::Date);
        assert_eq!(value_format(Some("total")), ValueFormat::Currency);
        assert_eq!(value_format(Some("unit_price")), ValueFormat::Currency);
        assert_eq!(value_format(Some("line_total")), ValueFormat::Currency);
        assert_eq!(value_format(Some("quantity")), ValueFormat::Literal);
        assert_eq!(value_format(None), ValueFormat::Literal);
    }

    #[test]
    fn test_grand_total_field() {
        assert!(is_grand_total_field(Some("total")));
        assert!(is_grand_total_field(Some("Order Total")));
        assert!(is_grand_total_field(Some("grand_total")));
        assert!(is_grand_total_field(Some("balance_due")));
        assert!(!is_grand_total_field(Some("subtotal")));
        assert!(!is_grand_total_field(Some("line_total")));
        assert!(!is_grand_total_field(Some("po_number")));
        assert!(!is_grand_total_field(None));
    }

    #[test]
    fn test_date_variants() {
        let variants = date_variants("12/2/2025");
        assert_eq!(
            variants,
            vec![
                "02-DEC-2025",
                "2-DEC-2025",
                "DEC-2-2025",
                "DEC 2, 2025",
                "DEC",
                "2025"
            ]
        );
        assert!(date_variants("2025-12-02").is_empty());
        assert!(date_variants("13/2/2025").is_empty());
    }

    #[test]
    fn test_currency_variants() {
        let variants = currency_variants("1121.28");
        assert!(variants.contains(&"1,121.28".to_string()));
        assert!(variants.contains(&"$1,121.28".to_string()));
        assert!(variants.contains(&"$ 1,121.28".to_string()));
        assert!(variants.contains(&"1121.28".to_string()));
        assert!(variants.contains(&"$1121.28".to_string()));

        // Small amounts have a single numeric form
        assert_eq!(currency_variants("$10.00"), vec!["10.00", "$10.00", "$ 10.00"]);
        assert!(currency_variants("N/A").is_empty());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }

    #[test]
    fn test_build_patterns_original_first() {
        let patterns = build_patterns(" 1,200.00 ", Some("total"));
        assert_eq!(patterns[0], "1,200.00");
        assert!(patterns.contains(&"1200.00".to_string()));
        // The original is not repeated
        assert_eq!(patterns.iter().filter(|p| *p == "1,200.00").count(), 1);

        assert_eq!(build_patterns("ACME-42", Some("po_number")), vec!["ACME-42"]);
    }
}
