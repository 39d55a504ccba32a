//! Line tokenizer and the literal-syntax rules shared by every pass
//! that needs to read a token: `#` comments, double-quoted strings
//! (`.INCLUDE "path"`), and decimal/`0x`/`0b`/`0o` integers.

use crate::molecule::MoleculeType;

/// Splits one source line into whitespace-separated tokens, stripping
/// a trailing `#` comment and treating `"..."` as a single token.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if in_string {
            if c == '"' {
                tokens.push(std::mem::take(&mut current));
                in_string = false;
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '#' => break,
            '"' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                in_string = true;
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    let _ = chars;
    tokens
}

/// Parses a signed decimal/`0x`/`0b`/`0o` integer literal.
pub fn parse_int(tok: &str) -> Option<i64> {
    let (neg, rest) = match tok.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, tok),
    };
    let value = if let Some(h) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(h, 16).ok()?
    } else if let Some(b) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(b, 2).ok()?
    } else if let Some(o) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i64::from_str_radix(o, 8).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// Parses a `TYPE:VALUE` tag, case-insensitive.
pub fn parse_molecule_type(name: &str) -> Option<MoleculeType> {
    match name.to_ascii_uppercase().as_str() {
        "CODE" => Some(MoleculeType::Code),
        "DATA" => Some(MoleculeType::Data),
        "ENERGY" => Some(MoleculeType::Energy),
        "STRUCTURE" => Some(MoleculeType::Structure),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_comments_and_strings() {
        let toks = tokenize(r#".INCLUDE "foo/bar.s"  # pull in helpers"#);
        assert_eq!(toks, vec![".INCLUDE", "foo/bar.s"]);
    }

    #[test]
    fn parse_int_bases() {
        assert_eq!(parse_int("10"), Some(10));
        assert_eq!(parse_int("0x1A"), Some(26));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("-7"), Some(-7));
    }
}
