//! Local fallback table.
//!
//! Loads per-source CSV files once at startup into an immutable in-memory
//! table keyed by (gene, source). Consulted only when a live source call
//! fails or comes back empty; lookups never touch the network or disk.
//!
//! File format: a header row with a `Gene` column plus the source's schema
//! fields, e.g. for drug interactions:
//!
//! ```text
//! Gene,Drug,Interaction Type,Source
//! TP53,APR-246,activator,fallback
//! ```
//!
//! Header matching ignores case, spaces and punctuation, and accepts a few
//! historical aliases (`Interaction` for `InteractionType`, `NCTId` for
//! `TrialId`, ...). Missing columns and blank cells are null.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use clinomics_common::{ClinomicsError, GeneSymbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{ResultRow, SourceKind, SourceResult};

/// Paths of the fallback CSV file for each source. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub expression: Option<PathBuf>,
    pub mutation: Option<PathBuf>,
    pub drug_interaction: Option<PathBuf>,
    pub clinical_trial: Option<PathBuf>,
}

impl FallbackConfig {
    fn paths(&self) -> impl Iterator<Item = (SourceKind, &PathBuf)> {
        [
            (SourceKind::Expression, self.expression.as_ref()),
            (SourceKind::Mutation, self.mutation.as_ref()),
            (SourceKind::DrugInteraction, self.drug_interaction.as_ref()),
            (SourceKind::ClinicalTrial, self.clinical_trial.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|p| (kind, p)))
    }
}

/// Immutable (gene, source) → rows table.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    rows: HashMap<(GeneSymbol, SourceKind), Vec<ResultRow>>,
}

impl FallbackTable {
    /// A table with no entries; every lookup is `Empty`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every configured file.
    ///
    /// A configured file that is missing or unreadable is an error.
    pub fn load(config: &FallbackConfig) -> Result<Self, ClinomicsError> {
        let mut table = Self::empty();
        for (kind, path) in config.paths() {
            let loaded = table.load_file(kind, path)?;
            info!(source = %kind, path = %path.display(), rows = loaded, "Loaded fallback data");
        }
        Ok(table)
    }

    /// Load one source's CSV file, returning the number of rows added.
    pub fn load_file(&mut self, kind: SourceKind, path: &Path) -> Result<usize, ClinomicsError> {
        let file = std::fs::File::open(path).map_err(|e| {
            ClinomicsError::Config(format!(
                "Fallback file for {} not readable at {}: {}",
                kind,
                path.display(),
                e
            ))
        })?;
        self.load_reader(kind, file)
    }

    /// Load one source's rows from any CSV reader.
    pub fn load_reader<R: Read>(&mut self, kind: SourceKind, reader: R) -> Result<usize, ClinomicsError> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|e| ClinomicsError::Config(format!("Fallback CSV for {} has no header: {}", kind, e)))?
            .clone();

        let gene_idx = headers
            .iter()
            .position(|h| canonical(h) == "gene")
            .ok_or_else(|| ClinomicsError::Config(format!("Fallback CSV for {} is missing a Gene column", kind)))?;

        // Column index for each schema field, in schema order.
        let field_idx: Vec<Option<usize>> = kind
            .schema()
            .iter()
            .map(|field| headers.iter().position(|h| header_matches(kind, field, h)))
            .collect();
        for (field, idx) in kind.schema().iter().zip(&field_idx) {
            if idx.is_none() {
                debug!(source = %kind, field, "Fallback CSV has no column for field");
            }
        }

        let mut added = 0usize;
        for (line, record) in csv.records().enumerate() {
            let record = record.map_err(|e| {
                ClinomicsError::Config(format!("Fallback CSV for {} unreadable at record {}: {}", kind, line + 1, e))
            })?;

            let raw_gene = record.get(gene_idx).unwrap_or("");
            let gene = match GeneSymbol::parse(raw_gene) {
                Ok(g) => g,
                Err(e) => {
                    warn!(source = %kind, record = line + 1, error = %e, "Skipping fallback row");
                    continue;
                }
            };

            let values = field_idx
                .iter()
                .map(|idx| {
                    idx.and_then(|i| record.get(i))
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                })
                .collect();

            self.insert(gene, kind, ResultRow::new(kind, values));
            added += 1;
        }

        Ok(added)
    }

    /// Append one row for (gene, kind).
    pub fn insert(&mut self, gene: GeneSymbol, kind: SourceKind, row: ResultRow) {
        self.rows.entry((gene, kind)).or_default().push(row);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, gene: &str, kind: SourceKind, row: ResultRow) -> Self {
        match GeneSymbol::parse(gene) {
            Ok(gene) => self.insert(gene, kind, row),
            Err(e) => warn!(error = %e, "Ignoring fallback row with invalid gene"),
        }
        self
    }

    /// Substitute rows for (gene, source): `Ok` on a match, else `Empty`.
    pub fn resolve(&self, gene: &GeneSymbol, kind: SourceKind) -> SourceResult {
        match self.rows.get(&(gene.clone(), kind)) {
            Some(rows) => SourceResult::from_rows(rows.clone()),
            None => SourceResult::Empty,
        }
    }

    /// Number of (gene, source) keys.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lowercase alphanumerics only: `"Interaction Type"` → `"interactiontype"`.
fn canonical(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn header_matches(kind: SourceKind, field: &str, header: &str) -> bool {
    let header = canonical(header);
    if header == canonical(field) {
        return true;
    }
    let aliases: &[&str] = match (kind, field) {
        (SourceKind::Expression, "MedianTPM") => &["median", "tpm", "expression", "value"],
        (SourceKind::Mutation, "VariantID") => &["variant", "id", "mutation"],
        (SourceKind::DrugInteraction, "InteractionType") => &["interaction", "type"],
        (SourceKind::ClinicalTrial, "TrialId") => &["nctid", "trial", "id"],
        (SourceKind::ClinicalTrial, "Country") => &["locationcountry", "countries"],
        _ => &[],
    };
    aliases.contains(&header.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gene(s: &str) -> GeneSymbol {
        GeneSymbol::parse(s).unwrap()
    }

    const DRUG_CSV: &str = "\
Gene,Drug,Interaction Type,Source
TP53,APR-246,activator,fallback
tp53,Nutlin-3,,
BRCA1,Olaparib,inhibitor,fallback
,orphan,x,y
";

    #[test]
    fn test_load_reader_and_resolve() {
        let mut table = FallbackTable::empty();
        let added = table.load_reader(SourceKind::DrugInteraction, DRUG_CSV.as_bytes()).unwrap();
        assert_eq!(added, 3);

        let result = table.resolve(&gene("tp53"), SourceKind::DrugInteraction);
        let rows = result.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Drug"), Some("APR-246"));
        assert_eq!(rows[0].get("InteractionType"), Some("activator"));
        assert_eq!(rows[1].get("InteractionType"), None);
    }

    #[test]
    fn test_resolve_unknown_is_empty() {
        let mut table = FallbackTable::empty();
        table.load_reader(SourceKind::DrugInteraction, DRUG_CSV.as_bytes()).unwrap();
        assert_eq!(table.resolve(&gene("EGFR"), SourceKind::DrugInteraction), SourceResult::Empty);
        // Same gene, other source
        assert_eq!(table.resolve(&gene("TP53"), SourceKind::Mutation), SourceResult::Empty);
    }

    #[test]
    fn test_alias_headers() {
        let csv = "Gene,Drug,Interaction\nEGFR,Erlotinib,inhibitor\n";
        let mut table = FallbackTable::empty();
        table.load_reader(SourceKind::DrugInteraction, csv.as_bytes()).unwrap();
        let result = table.resolve(&gene("EGFR"), SourceKind::DrugInteraction);
        assert_eq!(result.rows()[0].get("InteractionType"), Some("inhibitor"));
        assert_eq!(result.rows()[0].get("Source"), None);
    }

    #[test]
    fn test_missing_gene_column_is_error() {
        let mut table = FallbackTable::empty();
        let err = table
            .load_reader(SourceKind::Mutation, "VariantID,Description\n1,x\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, ClinomicsError::Config(_)));
    }

    #[test]
    fn test_load_from_config_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Gene,NCTId,Title,Status,Country\nKRAS,NCT1,Trial,Recruiting,France\n").unwrap();

        let config = FallbackConfig {
            clinical_trial: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let table = FallbackTable::load(&config).unwrap();
        assert_eq!(table.len(), 1);
        let rows = table.resolve(&gene("kras"), SourceKind::ClinicalTrial);
        assert_eq!(rows.rows()[0].get("TrialId"), Some("NCT1"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let config = FallbackConfig {
            mutation: Some(PathBuf::from("/definitely/not/here.csv")),
            ..Default::default()
        };
        assert!(FallbackTable::load(&config).is_err());
    }
}
