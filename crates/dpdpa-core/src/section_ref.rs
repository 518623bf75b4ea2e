//! Sort key normalisation for DPDPA section references.
//!
//! Converts cited references (e.g., "5", "8(6)", "s.9(3)", "Rule 7(a)") into
//! lexicographically-sortable strings so that gap lists and report diffs come
//! out in statute order regardless of how the reference was typed.
//!
//! # Numbering conventions
//!
//! - Act sections: 5, 6, ..., 44, optionally cited as "s.5" or "Section 5"
//! - Sub-sections in parentheses: 8(6), and clauses within them: 9(3)(a)
//! - Inserted sections with a letter suffix: 10A sorts after every 10(n)
//!   and never shares a key with one
//! - Rules are cited as "Rule 3" or "R.3" and sort after every Act section

/// Normalise a section reference into a lexicographically-sortable string.
///
/// Input: references like "5", "8(6)", "9(3)(a)", "10A", "Rule 3"
/// Output: "A.005.000.000", "A.008.006.000", "A.009.003.001", "A.010a.000.000", "R.003.000.000"
///
/// # Algorithm
///
/// 1. Strip the instrument prefix: `rule`/`r.` → `R`, otherwise `A`
/// 2. Extract leading ASCII digits → base number (zero-padded to 3 digits)
/// 3. Letters glued to the number stay on the base segment: "10A" → "010a",
///    which sorts after "010" and every "010.nnn" because `.` < `a`
/// 4. Parenthesised groups: digits as-is, a single letter as a=001, b=002, ...
/// 5. Pad to exactly 2 group segments with "000"
pub fn section_key(s: &str) -> String {
    let parsed = parse(s);
    let mut groups = parsed.groups;
    groups.resize(2, 0);
    format!(
        "{}.{:03}{}.{:03}.{:03}",
        parsed.instrument, parsed.number, parsed.suffix, groups[0], groups[1]
    )
}

/// Whether the provision `child` sits at or under the provision `parent`.
///
/// A reference without parenthesised groups covers the whole section, so "8"
/// contains "8(6)" and "9(3)" contains "9(3)(a)". "10" does not contain "10A",
/// and a reference with no section number contains nothing but itself.
pub fn section_contains(parent: &str, child: &str) -> bool {
    let parent = parse(parent);
    let child = parse(child);
    if !parent.has_number {
        return parent == child;
    }
    parent.instrument == child.instrument
        && parent.number == child.number
        && parent.suffix == child.suffix
        && child.groups.starts_with(&parent.groups)
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedRef {
    instrument: char,
    number: u32,
    has_number: bool,
    suffix: String,
    groups: Vec<u32>,
}

fn parse(s: &str) -> ParsedRef {
    let lower = s.trim().to_ascii_lowercase();
    let (instrument, rest) = strip_instrument(&lower);
    let bytes = rest.as_bytes();

    let digit_end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    let number: u32 = rest[..digit_end].parse().unwrap_or(0);

    // Letter suffix glued to the section number (inserted sections).
    let mut i = digit_end;
    while i < bytes.len() && bytes[i].is_ascii_lowercase() {
        i += 1;
    }
    let suffix = rest[digit_end..i].to_string();

    // Parenthesised sub-section and clause groups.
    let mut groups = Vec::new();
    while i < bytes.len() && groups.len() < 2 {
        if bytes[i] != b'(' {
            i += 1;
            continue;
        }
        let Some(close) = rest[i + 1..].find(')') else {
            break;
        };
        let inner = rest[i + 1..i + 1 + close].trim();
        let value = if let Ok(n) = inner.parse::<u32>() {
            n
        } else if inner.len() == 1 && inner.as_bytes()[0].is_ascii_lowercase() {
            (inner.as_bytes()[0] - b'a') as u32 + 1
        } else {
            // Stop on unexpected group contents.
            break;
        };
        groups.push(value);
        i += close + 2;
    }

    ParsedRef {
        instrument,
        number,
        has_number: digit_end > 0,
        suffix,
        groups,
    }
}

fn strip_instrument(s: &str) -> (char, &str) {
    for p in ["rule", "r."] {
        if let Some(rest) = s.strip_prefix(p) {
            return ('R', rest.trim_start());
        }
    }
    for p in ["section", "sec.", "s."] {
        if let Some(rest) = s.strip_prefix(p) {
            return ('A', rest.trim_start());
        }
    }
    ('A', s)
}
