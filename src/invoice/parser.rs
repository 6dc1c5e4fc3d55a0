//! Heuristic line-item parser for OCR text.
//!
//! Every non-empty line is a candidate row. Numeric tokens are peeled off the
//! right end of the line (quantities, units, prices, totals); what remains is
//! the item name. Lines with no letters, document metadata, summary rows, and
//! rows with no numeric evidence at all are dropped. Best effort only: no
//! layout is guaranteed to parse correctly.

use once_cell::sync::Lazy;
use regex::Regex;

use super::InvoiceItem;

static LINE_NO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}[.)]\s+").unwrap());

static LEADING_QTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:[.,]\d+)?)\s*[xX×]\s+(.+)$").unwrap());

static QTY_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+(?:[.,]\d+)?)(kg|g|l|ml|cl|lb|lbs|oz|pcs|pc|ea)$").unwrap()
});

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([$€£]?)(\d+(?:[.,]\d+)*)([$€£]?)$").unwrap());

static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((grand\s+)?(sub-?\s?total|total|balance|amount\s+due|thank\s+you)\b|(vat|tax|discount|shipping|delivery\s+charge)\s*([:(]|[$€£]?\d|$))",
    )
    .unwrap()
});

static META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((invoice|inv|order|date|page|tel|phone|fax|e-?mail|customer|account|iban|swift|bic)\b.*[:#]|page\s+\d+|www\.|https?://)",
    )
    .unwrap()
});

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(description|item|product)\b.*\b(qty|quantity|price|amount)\b").unwrap());

const UNIT_WORDS: &[&str] = &[
    "kg", "g", "l", "ml", "cl", "lb", "lbs", "oz", "pcs", "pc", "ea", "each", "box", "boxes",
    "case", "cases", "ct", "bag", "bags", "btl", "bottle", "bottles", "pack", "packs", "dz",
    "doz", "can", "cans", "unit", "units", "tray", "trays", "bunch", "шт", "кг",
];

const CURRENCY_WORDS: &[&str] = &["$", "€", "£", "usd", "eur", "gbp", "uah", "грн"];

/// Split raw OCR text into invoice items.
pub fn parse(raw_text: &str) -> Vec<InvoiceItem> {
    raw_text.lines().filter_map(parse_line).collect()
}

/// Parse a single OCR line, or `None` if it does not look like an item row.
pub fn parse_line(line: &str) -> Option<InvoiceItem> {
    let line = line.trim();
    if line.is_empty() || !line.chars().any(char::is_alphabetic) {
        return None;
    }
    if SUMMARY_RE.is_match(line) || META_RE.is_match(line) || HEADER_RE.is_match(line) {
        return None;
    }

    let line = LINE_NO_RE.replace(line, "");
    let (leading_qty, body) = match LEADING_QTY_RE.captures(&line) {
        Some(caps) => (parse_number(&caps[1]), caps[2].to_string()),
        None => (None, line.to_string()),
    };

    let tokens: Vec<&str> = body.split_whitespace().collect();
    let name_end = tail_start(&tokens);
    let (name_tokens, tail) = tokens.split_at(name_end);

    let name = name_tokens
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '-' | ':' | '|' | ',' | ';'))
        .trim()
        .to_string();
    if name.chars().filter(|c| c.is_alphabetic()).count() < 2 {
        return None;
    }

    let mut item = InvoiceItem::named(name);
    let has_tail_number = interpret_tail(tail, &mut item);
    let embedded = embedded_pack_size(name_tokens);

    if !has_tail_number && embedded.is_none() && leading_qty.is_none() {
        return None;
    }

    if item.quantity.is_none() {
        if let Some(q) = leading_qty {
            item.quantity = Some(q);
        } else if let Some((q, unit)) = embedded {
            item.quantity = Some(q);
            if item.unit.is_none() {
                item.unit = Some(unit);
            }
        }
    }

    Some(item)
}

#[derive(Debug, Clone, Copy)]
struct TailNumber {
    value: f64,
    money: bool,
}

/// Index of the first token of the numeric tail.
fn tail_start(tokens: &[&str]) -> usize {
    let mut start = tokens.len();
    while start > 0 {
        let tok = tokens[start - 1];
        if QTY_UNIT_RE.is_match(tok) {
            // A glued pack size ("10kg") belongs to the item name.
            break;
        }
        if classify_number(tok).is_some() || is_unit(tok) || is_currency(tok) || is_percent(tok) {
            start -= 1;
        } else {
            break;
        }
    }
    start
}

/// Fill quantity, unit, price and total from the tail. Returns `true` if the
/// tail held at least one number.
fn interpret_tail(tail: &[&str], item: &mut InvoiceItem) -> bool {
    let mut numbers = Vec::new();
    let mut saw_currency = false;
    for tok in tail {
        if is_percent(tok) {
            continue;
        }
        if is_currency(tok) {
            saw_currency = true;
        } else if let Some(n) = classify_number(tok) {
            numbers.push(n);
        } else if item.unit.is_none() && is_unit(tok) {
            item.unit = Some(tok.to_lowercase());
        }
    }

    match numbers.as_slice() {
        [] => return false,
        [only] => {
            if only.money || saw_currency {
                item.unit_price = Some(only.value);
            } else {
                item.quantity = Some(only.value);
            }
        }
        [first, second] => {
            if first.money {
                item.unit_price = Some(first.value);
                item.line_total = Some(second.value);
            } else {
                item.quantity = Some(first.value);
                item.unit_price = Some(second.value);
            }
        }
        [first, .., price, total] => {
            item.quantity = Some(first.value);
            item.unit_price = Some(price.value);
            item.line_total = Some(total.value);
        }
    }
    true
}

fn embedded_pack_size(name_tokens: &[&str]) -> Option<(f64, String)> {
    name_tokens.iter().rev().find_map(|tok| {
        let caps = QTY_UNIT_RE.captures(tok)?;
        Some((parse_number(&caps[1])?, caps[2].to_lowercase()))
    })
}

fn classify_number(token: &str) -> Option<TailNumber> {
    let caps = NUMBER_RE.captures(token)?;
    let digits = &caps[2];
    let currency = !caps[1].is_empty() || !caps[3].is_empty();
    let two_decimals = digits
        .rfind(['.', ','])
        .map(|i| digits.len() - i - 1 == 2)
        .unwrap_or(false);
    Some(TailNumber {
        value: parse_number(digits)?,
        money: currency || two_decimals,
    })
}

/// Parse a number written with `.` or `,` as decimal and/or thousands separator.
pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim_matches(|c: char| matches!(c, '$' | '€' | '£'));
    let last_dot = raw.rfind('.');
    let last_comma = raw.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            // The separator that appears last is the decimal point.
            let (thousands, decimal) = if d > c { (',', '.') } else { ('.', ',') };
            raw.replace(thousands, "").replace(decimal, ".")
        }
        (None, Some(c)) => {
            let decimals = raw.len() - c - 1;
            if raw.matches(',').count() == 1 && decimals != 3 {
                raw.replace(',', ".")
            } else {
                raw.replace(',', "")
            }
        }
        (Some(_), None) if raw.matches('.').count() > 1 => raw.replace('.', ""),
        _ => raw.to_string(),
    };
    normalized.parse().ok()
}

fn is_unit(token: &str) -> bool {
    let lower = token.trim_end_matches('.').to_lowercase();
    UNIT_WORDS.contains(&lower.as_str())
}

fn is_currency(token: &str) -> bool {
    CURRENCY_WORDS.contains(&token.to_lowercase().as_str())
}

fn is_percent(token: &str) -> bool {
    token
        .strip_suffix('%')
        .map(|n| parse_number(n).is_some())
        .unwrap_or(false)
}
