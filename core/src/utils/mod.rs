use std::fs::File;
use std::io;
use std::io::BufRead;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Reads a target list file, returning all non-empty trimmed lines.
pub fn read_lines(path: &str) -> io::Result<Vec<String>> {
    let file = File::open(Path::new(path))?;
    let reader = io::BufReader::new(file);
    let lines = reader
        .lines()
        .filter_map(|line| {
            let line = line.ok()?;
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() { None } else { Some(trimmed) }
        })
        .collect();
    Ok(lines)
}

/// Extracts the first monetary amount from rendered cell text.
///
/// Platforms render amounts as "$500", "$2,500", sometimes "Up to $1,000".
/// Text with no digits (em-dash placeholders, "N/A") yields `None`.
pub fn parse_money(text: &str) -> Option<f64> {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    let re = AMOUNT.get_or_init(|| {
        Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("amount pattern is valid")
    });
    re.find(text)?.as_str().replace(',', "").parse().ok()
}
