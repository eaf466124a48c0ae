//! Chemical formula helpers
//!
//! Parsing is intentionally small: element symbols, integer or decimal
//! counts, and one level of nesting per parenthesis group.

use std::collections::BTreeMap;

/// Periodic table symbols, Z = 1..=118
pub const ELEMENT_SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Check whether `symbol` is a known element symbol (case-sensitive)
pub fn is_element(symbol: &str) -> bool {
    ELEMENT_SYMBOLS.contains(&symbol)
}

/// Normalize the case of an element symbol ("fe" -> "Fe")
pub fn normalize_element(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    let candidate: String = std::iter::once(first.to_ascii_uppercase())
        .chain(chars.map(|c| c.to_ascii_lowercase()))
        .collect();

    is_element(&candidate).then_some(candidate)
}

/// Replace unicode subscripts and drop whitespace ("Fe₂O₃ " -> "Fe2O3")
pub fn normalize_formula(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '₀'..='₉' => char::from(b'0' + (c as u32 - '₀' as u32) as u8),
            other => other,
        })
        .collect()
}

/// Parse a formula into element counts
///
/// Returns `None` when any token is not an element symbol.
pub fn parse_formula(raw: &str) -> Option<BTreeMap<String, f64>> {
    let normalized = normalize_formula(raw);
    let chars: Vec<char> = normalized.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let mut stack: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new()];
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '(' || c == '[' {
            stack.push(BTreeMap::new());
            i += 1;
        } else if c == ')' || c == ']' {
            i += 1;
            let (count, next) = read_count(&chars, i);
            i = next;
            let group = stack.pop()?;
            let parent = stack.last_mut()?;
            for (element, n) in group {
                *parent.entry(element).or_insert(0.0) += n * count;
            }
        } else if c.is_ascii_uppercase() {
            let mut symbol = c.to_string();
            i += 1;
            if i < chars.len() && chars[i].is_ascii_lowercase() {
                symbol.push(chars[i]);
                i += 1;
            }
            if !is_element(&symbol) {
                return None;
            }
            let (count, next) = read_count(&chars, i);
            i = next;
            *stack.last_mut()?.entry(symbol).or_insert(0.0) += count;
        } else {
            return None;
        }
    }

    if stack.len() != 1 {
        return None;
    }
    stack.pop().filter(|counts| !counts.is_empty())
}

fn read_count(chars: &[char], start: usize) -> (f64, usize) {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
        end += 1;
    }
    if end == start {
        return (1.0, start);
    }
    let digits: String = chars[start..end].iter().collect();
    (digits.parse().unwrap_or(1.0), end)
}

/// Distinct element symbols of a formula, in order of first appearance
pub fn elements_of(raw: &str) -> Vec<String> {
    let normalized = normalize_formula(raw);
    let chars: Vec<char> = normalized.chars().collect();
    let mut seen = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_ascii_uppercase() {
            let mut symbol = chars[i].to_string();
            if i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase() {
                symbol.push(chars[i + 1]);
                i += 1;
            }
            if is_element(&symbol) && !seen.contains(&symbol) {
                seen.push(symbol);
            }
        }
        i += 1;
    }

    seen
}

/// Canonical reduced formula used for identity comparisons
///
/// Elements are sorted alphabetically and integer counts are divided by
/// their greatest common divisor, so "O3Fe2" and "Fe4O6" both map to
/// "Fe2O3". Unparsable input falls back to its normalized text.
pub fn canonical_formula(raw: &str) -> String {
    let Some(counts) = parse_formula(raw) else {
        return normalize_formula(raw).to_lowercase();
    };

    let all_integral = counts.values().all(|n| n.fract() == 0.0);
    let divisor = if all_integral {
        counts
            .values()
            .map(|n| *n as u64)
            .fold(0, gcd)
            .max(1) as f64
    } else {
        1.0
    };

    counts
        .iter()
        .map(|(element, n)| {
            let reduced = n / divisor;
            if reduced == 1.0 {
                element.clone()
            } else if reduced.fract() == 0.0 {
                format!("{}{}", element, reduced as u64)
            } else {
                format!("{}{}", element, reduced)
            }
        })
        .collect()
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
