// ---------------------------------------------------------------------------
// Locale-ambiguous numeric parsing
// ---------------------------------------------------------------------------

/// Parse a raw monetary/numeric cell into a canonical `f64`.
///
/// Source files mix the US convention (`1,234.56`) and the Latin-American
/// convention (`1.234,56`), sometimes within one file. With no locale
/// metadata available, the position of the rightmost separator is the only
/// reliable signal: whichever of `,` / `.` appears last is the decimal
/// point, the other is a thousands separator.
///
/// Currency markers (`$`, `USD`), spaces and any other non-numeric
/// characters are stripped first. Returns `None` for cells that are empty
/// after stripping, carry a misplaced or repeated minus sign, or do not
/// parse to a finite number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '0'..='9' | ',' | '.' | '-' => cleaned.push(c),
            _ => {}
        }
    }
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.bytes().filter(|&b| b == b'-').count() > 1 {
        return None;
    }
    if let Some(pos) = cleaned.find('-') {
        if pos != 0 {
            return None;
        }
    }

    let last_comma = cleaned.rfind(',');
    let last_period = cleaned.rfind('.');
    let unified = match (last_comma, last_period) {
        // Comma right of the rightmost period (or no period at all):
        // decimal comma, periods are thousands separators.
        (Some(comma), period) if period.is_none_or(|p| comma > p) => {
            cleaned.replace('.', "").replace(',', ".")
        }
        // Otherwise commas are thousands separators.
        _ => cleaned.replace(',', ""),
    };

    let value: f64 = unified.parse().ok()?;
    value.is_finite().then_some(value)
}

// ---------------------------------------------------------------------------
