//! Gene lists from free text and uploaded files.
//!
//! These only split input into tokens; validation happens in
//! [`crate::batch::normalize_genes`].

use clinomics_common::ClinomicsError;

/// Split on newlines, commas, semicolons and whitespace.
pub fn parse_gene_text(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens from an uploaded file.
///
/// `.csv` files contribute the first column of every record after the
/// header; anything else is read as one gene per line.
pub fn parse_gene_file(filename: &str, bytes: &[u8]) -> Result<Vec<String>, ClinomicsError> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        ClinomicsError::InvalidInput(format!("{} is not a UTF-8 text file.", display_name(filename)))
    })?;

    if filename.to_ascii_lowercase().ends_with(".csv") {
        parse_csv_first_column(text)
    } else {
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn parse_csv_first_column(text: &str) -> Result<Vec<String>, ClinomicsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut genes = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| ClinomicsError::InvalidInput(format!("Could not read CSV upload: {}", e)))?;
        if let Some(first) = record.get(0).filter(|v| !v.is_empty()) {
            genes.push(first.to_string());
        }
    }
    Ok(genes)
}

fn display_name(filename: &str) -> &str {
    if filename.is_empty() { "Upload" } else { filename }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gene_text_separators() {
        assert_eq!(
            parse_gene_text("TP53, brca1;EGFR\n\n KRAS\tMYC"),
            vec!["TP53", "brca1", "EGFR", "KRAS", "MYC"]
        );
        assert!(parse_gene_text("  \n ,; ").is_empty());
    }

    #[test]
    fn test_csv_uses_first_column_after_header() {
        let csv = b"gene,score\nTP53,0.9\nBRCA1,0.8\n,0.1\n";
        assert_eq!(parse_gene_file("genes.CSV", csv).unwrap(), vec!["TP53", "BRCA1"]);
    }

    #[test]
    fn test_text_file_one_per_line() {
        let txt = b"tp53\r\n\r\nbrca1\n";
        assert_eq!(parse_gene_file("genes.txt", txt).unwrap(), vec!["tp53", "brca1"]);
    }

    #[test]
    fn test_non_utf8_rejected() {
        let err = parse_gene_file("genes.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ClinomicsError::InvalidInput(_)));
    }
}
