use std::path::Path;

use super::StoreError;

/// A small header-driven CSV reader for the dataset exports
/// (cities, case counts, weather history).
///
/// Handles double-quoted fields with embedded commas and `""` escapes.
/// Column lookup is case-insensitive.
#[derive(Debug, Clone)]
pub struct CsvTable {
    source: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path.display().to_string())
    }

    pub fn parse(content: &str, source: impl Into<String>) -> Result<Self, StoreError> {
        let source = source.into();
        let mut lines = content
            .lines()
            .map(|l| l.trim_start_matches('\u{feff}'))
            .filter(|l| !l.trim().is_empty());

        let headers = match lines.next() {
            Some(header) => split_line(header),
            None => {
                return Err(StoreError::Csv {
                    source_name: source,
                    message: "file is empty".into(),
                });
            }
        };
        let rows = lines.map(split_line).collect();
        Ok(Self {
            source,
            headers,
            rows,
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn require(&self, name: &str) -> Result<usize, StoreError> {
        self.column(name).ok_or_else(|| StoreError::Csv {
            source_name: self.source.clone(),
            message: format!("missing column '{name}'"),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows
            .iter()
            .map(|row| row.iter().map(String::as_str).collect())
    }
}

fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let table = CsvTable::parse("City,State\nMysore,Karnataka\n", "test").unwrap();
        assert_eq!(table.column("city"), Some(0));
        assert_eq!(table.column("STATE"), Some(1));
        assert_eq!(table.column("district"), None);
        assert!(table.require("district").is_err());
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let table = CsvTable::parse("a,b\n\"Hubli, Dharwad\",\"say \"\"hi\"\"\"\n", "test").unwrap();
        let rows: Vec<Vec<&str>> = table.rows().collect();
        assert_eq!(rows[0], vec!["Hubli, Dharwad", "say \"hi\""]);
    }

    #[test]
    fn blank_lines_and_bom_skipped() {
        let table = CsvTable::parse("\u{feff}city\n\nMysore\n  \nHassan\n", "test").unwrap();
        assert_eq!(table.column("city"), Some(0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(CsvTable::parse("", "test").is_err());
    }
}
