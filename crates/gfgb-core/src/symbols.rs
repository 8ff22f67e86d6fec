//! RGBDS `.sym` debug symbols.
//!
//! Each non-comment line is `BB:AAAA Name`, where `BB` is the ROM bank in
//! hex, or `BOOT:AAAA Name` for boot ROM labels. `;` starts a comment.

use std::{collections::HashMap, fs, path::Path};

use crate::error::SymbolError;

/// Longest name kept; longer names are truncated.
pub const MAX_SYMBOL_NAME: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolBank {
    Boot,
    Rom(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSymbol {
    pub name: String,
    pub bank: SymbolBank,
    pub start: u16,
    /// Distance to the next symbol in the same bank; 0 for the last one.
    pub len: u16,
}

impl DebugSymbol {
    pub fn contains(&self, addr: u16) -> bool {
        addr >= self.start && u32::from(addr) < u32::from(self.start) + u32::from(self.len)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub added: usize,
    pub skipped: usize,
}

/// Symbols ordered by start address.
#[derive(Debug, Clone, Default)]
pub struct DebugSymbolTable {
    symbols: Vec<DebugSymbol>,
}

impl DebugSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> (Self, ParseReport) {
        let mut table = Self::new();
        let report = table.extend_from_str(text);
        (table, report)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<ParseReport, SymbolError> {
        let text = fs::read_to_string(path).map_err(|source| SymbolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report = self.extend_from_str(&text);
        log::debug!(
            "{}: {} symbols, {} skipped",
            path.display(),
            report.added,
            report.skipped
        );
        Ok(report)
    }

    /// Add every well-formed line of `text`, then re-sort the whole table
    /// and recompute lengths. Malformed lines are skipped.
    pub fn extend_from_str(&mut self, text: &str) -> ParseReport {
        let mut report = ParseReport::default();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            match parse_line(line) {
                Some(sym) => {
                    self.symbols.push(sym);
                    report.added += 1;
                }
                None => {
                    log::warn!("symbol line {}: cannot parse '{line}'", line_no + 1);
                    report.skipped += 1;
                }
            }
        }

        // stable: equal addresses keep file order
        self.symbols.sort_by_key(|sym| sym.start);
        self.recompute_lengths();
        report
    }

    // Lengths stop at the next symbol of the same bank, so BOOT labels and
    // bank 0 labels at overlapping addresses do not cut each other short.
    fn recompute_lengths(&mut self) {
        let mut next_start: HashMap<SymbolBank, u16> = HashMap::new();
        for sym in self.symbols.iter_mut().rev() {
            sym.len = next_start
                .get(&sym.bank)
                .map_or(0, |&next| next - sym.start);
            next_start.insert(sym.bank, sym.start);
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DebugSymbol> {
        self.symbols.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&DebugSymbol> {
        self.symbols.get(idx)
    }

    pub fn has_boot_symbols(&self) -> bool {
        self.symbols.iter().any(|s| s.bank == SymbolBank::Boot)
    }

    /// Last symbol whose range covers `addr`.
    pub fn symbol_containing(&self, addr: u16) -> Option<&DebugSymbol> {
        let idx = self.symbols.partition_point(|s| s.start <= addr);
        self.symbols[..idx].iter().rev().find(|s| s.contains(addr))
    }

    /// Name of the first symbol starting exactly at `addr`.
    pub fn label_at(&self, addr: u16) -> Option<&str> {
        let idx = self.symbols.partition_point(|s| s.start < addr);
        self.symbols
            .get(idx)
            .filter(|s| s.start == addr)
            .map(|s| s.name.as_str())
    }
}

fn parse_line(line: &str) -> Option<DebugSymbol> {
    let (lhs, name) = line.split_once(char::is_whitespace)?;
    let (bank_s, addr_s) = lhs.split_once(':')?;

    let bank = if bank_s.eq_ignore_ascii_case("BOOT") {
        SymbolBank::Boot
    } else {
        SymbolBank::Rom(u8::from_str_radix(bank_s, 16).ok()?)
    };
    let start = u16::from_str_radix(addr_s, 16).ok()?;

    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    Some(DebugSymbol {
        name: truncate(name, MAX_SYMBOL_NAME).to_string(),
        bank,
        start,
        len: 0,
    })
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
