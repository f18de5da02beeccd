//! Connection identifier grammar.
//!
//! Identifiers have the form
//! `RASTERDB:<file-path>:<coverage>[:<section-id>:<section-name>]`.
//! Fields are colon-delimited; any field containing a quote or colon is
//! wrapped in double quotes with embedded quotes doubled. The same grammar
//! is used for parsing open requests and for generating sub-dataset
//! listings.

use std::fmt;

use crate::error::{RasterError, RasterResult};

/// Scheme prefix for rasterdb connection identifiers.
pub const SCHEME: &str = "RASTERDB";

/// A parsed connection identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionId {
    /// Path of the store file.
    pub path: String,
    /// Coverage name within the store.
    pub coverage: String,
    /// Optional section selector.
    pub section: Option<SectionRef>,
}

/// Section selector within a coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRef {
    pub id: i64,
    pub name: Option<String>,
}

impl ConnectionId {
    /// Identifier addressing a whole coverage.
    pub fn coverage(path: impl Into<String>, coverage: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            coverage: coverage.into(),
            section: None,
        }
    }

    /// Identifier addressing one section of a coverage.
    pub fn section(
        path: impl Into<String>,
        coverage: impl Into<String>,
        id: i64,
        name: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            coverage: coverage.into(),
            section: Some(SectionRef {
                id,
                name: Some(name.into()),
            }),
        }
    }

    /// Parse a connection identifier.
    ///
    /// Fails when the scheme prefix is absent, fewer than three fields are
    /// present, or the section id is not an integer.
    pub fn parse(input: &str) -> RasterResult<Self> {
        let prefix = format!("{}:", SCHEME);
        let has_scheme = input
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(&prefix));
        if !has_scheme {
            return Err(RasterError::InvalidConnectionId(format!(
                "missing {} scheme prefix: {}",
                SCHEME, input
            )));
        }

        let fields = tokenize(input);
        if fields.len() < 3 {
            return Err(RasterError::InvalidConnectionId(format!(
                "expected at least 3 colon-delimited fields: {}",
                input
            )));
        }

        let section = if fields.len() >= 4 {
            let id = fields[3].parse::<i64>().map_err(|_| {
                RasterError::InvalidConnectionId(format!(
                    "section id is not an integer: {}",
                    fields[3]
                ))
            })?;
            if id < 0 {
                return Err(RasterError::InvalidConnectionId(format!(
                    "section id must be non-negative: {}",
                    id
                )));
            }
            let name = fields.get(4).cloned();
            Some(SectionRef { id, name })
        } else {
            None
        };

        Ok(Self {
            path: fields[1].clone(),
            coverage: fields[2].clone(),
            section,
        })
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            SCHEME,
            quote_if_needed(&self.path),
            quote_if_needed(&self.coverage)
        )?;
        if let Some(section) = &self.section {
            write!(f, ":{}", section.id)?;
            if let Some(name) = &section.name {
                write!(f, ":{}", quote_if_needed(name))?;
            }
        }
        Ok(())
    }
}

/// Quote a field if it contains a quote or colon character.
///
/// Embedded quotes are doubled inside the quoted form.
pub fn quote_if_needed(field: &str) -> String {
    if !field.contains('"') && !field.contains(':') {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len() + 2);
    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Split a colon-delimited identifier into fields, honoring quoted strings.
fn tokenize(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ':' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coverage_only() {
        let id = ConnectionId::parse("RASTERDB:/data/store.db:dem").unwrap();
        assert_eq!(id.path, "/data/store.db");
        assert_eq!(id.coverage, "dem");
        assert!(id.section.is_none());
    }

    #[test]
    fn test_parse_case_insensitive_scheme() {
        assert!(ConnectionId::parse("rasterdb:f:c").is_ok());
    }

    #[test]
    fn test_parse_with_section() {
        let id = ConnectionId::parse("RASTERDB:store.db:ortho:3:tile_north").unwrap();
        let section = id.section.unwrap();
        assert_eq!(section.id, 3);
        assert_eq!(section.name.as_deref(), Some("tile_north"));
    }

    #[test]
    fn test_parse_rejects_missing_scheme() {
        assert!(ConnectionId::parse("FOO:store.db:dem").is_err());
    }

    #[test]
    fn test_parse_rejects_too_few_fields() {
        assert!(ConnectionId::parse("RASTERDB:store.db").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_section_id() {
        assert!(ConnectionId::parse("RASTERDB:store.db:dem:north").is_err());
        assert!(ConnectionId::parse("RASTERDB:store.db:dem:-2").is_err());
    }

    #[test]
    fn test_quoted_fields_roundtrip() {
        let id = ConnectionId::section("C:\\data\\x.db", "my:coverage", 1, "se\"ction");
        let formatted = id.to_string();
        let parsed = ConnectionId::parse(&formatted).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(quote_if_needed("plain"), "plain");
        assert_eq!(quote_if_needed("a:b"), "\"a:b\"");
        assert_eq!(quote_if_needed("a\"b"), "\"a\"\"b\"");
    }
}
