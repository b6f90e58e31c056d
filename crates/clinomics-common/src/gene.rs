//! Gene symbol normalisation.
//!
//! Symbols are case-insensitive and are uppercased at every boundary. They are
//! *not* checked against HGNC; any token made of the allowed characters is
//! accepted.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClinomicsError;

/// Longest symbol accepted after trimming.
pub const MAX_SYMBOL_LEN: usize = 32;

/// A trimmed, uppercased gene symbol, e.g. `TP53`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GeneSymbol(String);

impl GeneSymbol {
    /// Normalise and validate a raw token.
    pub fn parse(raw: &str) -> Result<Self, ClinomicsError> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ClinomicsError::InvalidInput("Gene name required.".to_string()));
        }
        if symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(ClinomicsError::InvalidInput(format!(
                "Gene symbol '{}' is longer than {} characters",
                raw.trim(),
                MAX_SYMBOL_LEN
            )));
        }
        if let Some(bad) = symbol.chars().find(|c| !is_symbol_char(*c)) {
            return Err(ClinomicsError::InvalidInput(format!(
                "Gene symbol '{}' contains invalid character '{}'",
                raw.trim(),
                bad
            )));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_' | '@')
}

impl fmt::Display for GeneSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeneSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for GeneSymbol {
    type Err = ClinomicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for GeneSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        GeneSymbol::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_trims_and_uppercases() {
        let gene = GeneSymbol::parse("  tp53 \n").unwrap();
        assert_eq!(gene.as_str(), "TP53");
        assert_eq!(gene, GeneSymbol::parse("TP53").unwrap());
    }

    #[test]
    fn test_parse_accepts_punctuated_symbols() {
        assert_eq!(GeneSymbol::parse("hla-a").unwrap().as_str(), "HLA-A");
        assert_eq!(GeneSymbol::parse("C1orf112").unwrap().as_str(), "C1ORF112");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(GeneSymbol::parse("   "), Err(ClinomicsError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(GeneSymbol::parse("TP53; DROP").is_err());
        assert!(GeneSymbol::parse("BRCA1 BRCA2").is_err());
        assert!(GeneSymbol::parse(&"A".repeat(MAX_SYMBOL_LEN + 1)).is_err());
    }

    #[test]
    fn test_deserialize_normalises() {
        let gene: GeneSymbol = serde_json::from_str("\"brca1\"").unwrap();
        assert_eq!(gene.as_str(), "BRCA1");
        assert!(serde_json::from_str::<GeneSymbol>("\"\"").is_err());
    }
}
