//! PDF report builder.
//!
//! Each gene gets its own page run: a centred title, then one bold heading per
//! source followed by `field: value, ...` lines. Text is set in the standard
//! Helvetica faces with WinAnsi encoding, so anything outside Latin-1 is
//! dropped before layout.

use clinomics_ingestion::models::NOT_AVAILABLE;
use clinomics_ingestion::{BatchReport, GeneReport, SourceResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// A4 in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

/// Mean Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Title(String),
    Heading(String),
    Body(String),
    /// Warnings and fallback notices, set in the body face.
    Note(String),
    Gap,
}

/// Flatten one gene's report into text lines.
pub fn report_lines(report: &GeneReport) -> Vec<ReportLine> {
    let mut lines = vec![ReportLine::Title(format!("ClinOmics Report: {}", report.gene)), ReportLine::Gap];

    for (kind, entry) in &report.sources {
        lines.push(ReportLine::Heading(kind.title().to_string()));

        if entry.is_degraded() {
            let reason = entry
                .upstream
                .as_ref()
                .map(|u| format!(" ({})", u.message()))
                .unwrap_or_default();
            lines.push(ReportLine::Note(format!("Served from local fallback{}.", reason)));
        }

        match &entry.result {
            SourceResult::Ok { rows } => {
                for row in rows {
                    let text = row
                        .fields()
                        .map(|(name, value)| format!("{}: {}", name, value.unwrap_or(NOT_AVAILABLE)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    lines.push(ReportLine::Body(text));
                }
            }
            SourceResult::Empty => {
                let message = entry
                    .upstream
                    .as_ref()
                    .map(|u| u.message())
                    .unwrap_or_else(|| "No data found".to_string());
                lines.push(ReportLine::Note(message));
            }
            SourceResult::Failed { reason } => {
                lines.push(ReportLine::Note(format!("Service unavailable: {}", reason)));
            }
        }
        lines.push(ReportLine::Gap);
    }

    lines
}

/// Suggested download name, e.g. `TP53_ClinOmics_Report.pdf`.
pub fn report_filename(batch: &BatchReport) -> String {
    match batch.iter().next() {
        Some(first) if batch.len() == 1 => format!("{}_ClinOmics_Report.pdf", first.gene),
        _ => "ClinOmics_Batch_Report.pdf".to_string(),
    }
}

/// Drop characters the WinAnsi-encoded standard fonts cannot show.
/// C0 and C1 controls go too; WinAnsi maps 0x80..=0x9F to other glyphs.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| u8::try_from(u32::from(c)).ok())
        .filter(|b| *b >= 0x20 && !(0x7F..=0x9F).contains(b))
        .collect()
}

/// Greedy word wrap at `max_chars`; words longer than a line are split.
fn wrap(text: &[u8], max_chars: usize) -> Vec<Vec<u8>> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for word in text.split(|b| *b == b' ').filter(|w| !w.is_empty()) {
        let needed = if current.is_empty() { word.len() } else { current.len() + 1 + word.len() };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        let mut word = word;
        while word.len() > max_chars {
            let (head, tail) = word.split_at(max_chars);
            lines.push(head.to_vec());
            word = tail;
        }
        if !current.is_empty() {
            current.push(b' ');
        }
        current.extend_from_slice(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn chars_per_line(size: f32) -> usize {
    ((PAGE_WIDTH - 2.0 * MARGIN) / (size * AVG_GLYPH_WIDTH)) as usize
}

/// Accumulates positioned text and breaks pages.
struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self { pages: Vec::new(), ops: Vec::new(), y: PAGE_HEIGHT - MARGIN }
    }

    fn new_page(&mut self) {
        if !self.ops.is_empty() {
            self.pages.push(std::mem::take(&mut self.ops));
        }
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn advance(&mut self, leading: f32) {
        if self.y - leading < MARGIN {
            self.new_page();
        }
        self.y -= leading;
    }

    fn text(&mut self, font: &str, size: f32, x: f32, bytes: Vec<u8>) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops.push(Operation::new("Td", vec![x.into(), self.y.into()]));
        self.ops.push(Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn paragraph(&mut self, font: &str, size: f32, leading: f32, text: &str) {
        for line in wrap(&latin1(text), chars_per_line(size)) {
            self.advance(leading);
            self.text(font, size, MARGIN, line);
        }
    }

    fn push(&mut self, line: &ReportLine) {
        match line {
            ReportLine::Title(text) => {
                for line in wrap(&latin1(text), chars_per_line(TITLE_SIZE)) {
                    self.advance(TITLE_SIZE * 1.5);
                    let width = line.len() as f32 * TITLE_SIZE * AVG_GLYPH_WIDTH;
                    let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
                    self.text("F2", TITLE_SIZE, x, line);
                }
            }
            ReportLine::Heading(text) => self.paragraph("F2", HEADING_SIZE, HEADING_SIZE * 1.6, text),
            ReportLine::Body(text) | ReportLine::Note(text) => {
                self.paragraph("F1", BODY_SIZE, BODY_SIZE * 1.4, text)
            }
            ReportLine::Gap => self.advance(BODY_SIZE),
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.new_page();
        self.pages
    }
}

/// Render a whole batch; each gene starts on a fresh page.
pub fn render_pdf(batch: &BatchReport) -> Result<Vec<u8>, lopdf::Error> {
    let mut layout = Layout::new();
    for (i, report) in batch.iter().enumerate() {
        if i > 0 {
            layout.new_page();
        }
        for line in report_lines(report) {
            layout.push(&line);
        }
    }
    let mut pages = layout.finish();
    if pages.is_empty() {
        pages.push(Vec::new());
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => regular, "F2" => bold },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinomics_common::GeneSymbol;
    use clinomics_ingestion::{Origin, ResultRow, SourceEntry, SourceKind, UpstreamIssue};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn report(gene: &str, expression_rows: usize) -> GeneReport {
        let rows: Vec<_> = (0..expression_rows)
            .map(|i| ResultRow::from_strings(SourceKind::Expression, [format!("Tissue_{}", i), "1.00".into(), "TPM".into()]))
            .collect();
        let mut sources = BTreeMap::new();
        sources.insert(SourceKind::Expression, SourceEntry::live(SourceResult::from_rows(rows)));
        sources.insert(
            SourceKind::DrugInteraction,
            SourceEntry {
                result: SourceResult::from_rows(vec![ResultRow::new(
                    SourceKind::DrugInteraction,
                    vec![Some("APR-246".into()), None, Some("fallback".into())],
                )]),
                origin: Origin::Fallback,
                upstream: Some(UpstreamIssue::Unavailable { reason: "request timed out".into() }),
            },
        );
        GeneReport { gene: GeneSymbol::parse(gene).unwrap(), sources }
    }

    #[test]
    fn test_report_lines_layout() {
        let lines = report_lines(&report("TP53", 1));
        assert_eq!(
            lines,
            vec![
                ReportLine::Title("ClinOmics Report: TP53".into()),
                ReportLine::Gap,
                ReportLine::Heading("Gene Expression".into()),
                ReportLine::Body("Tissue: Tissue_0, MedianTPM: 1.00, Unit: TPM".into()),
                ReportLine::Gap,
                ReportLine::Heading("Drug Matches".into()),
                ReportLine::Note("Served from local fallback (Service unavailable: request timed out).".into()),
                ReportLine::Body("Drug: APR-246, InteractionType: N/A, Source: fallback".into()),
                ReportLine::Gap,
            ]
        );
    }

    #[test]
    fn test_empty_source_line() {
        let mut r = report("EGFR", 0);
        r.sources.insert(
            SourceKind::Mutation,
            SourceEntry { result: SourceResult::Empty, origin: Origin::Live, upstream: Some(UpstreamIssue::NoData) },
        );
        let lines = report_lines(&r);
        assert!(lines.contains(&ReportLine::Note("No data found".into())));
    }

    #[test]
    fn test_latin1_filter_and_wrap() {
        assert_eq!(latin1("Café ✓ 5µg"), b"Caf\xe9  5\xb5g".to_vec());
        assert_eq!(latin1("a\u{7f}b\u{85}c\u{9f}d\u{a0}"), b"abcd\xa0".to_vec());
        let wrapped = wrap(b"alpha beta gamma delta", 11);
        assert_eq!(wrapped, vec![b"alpha beta".to_vec(), b"gamma delta".to_vec()]);
        assert_eq!(wrap(b"abcdefghij", 4).len(), 3);
    }

    #[test]
    fn test_render_pdf_paginates() {
        let mut batch = BatchReport::new();
        batch.push(report("TP53", 120));
        batch.push(report("BRCA1", 1));

        let bytes = render_pdf(&batch).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        // 120 rows overflow one page; BRCA1 starts a new one.
        assert!(doc.get_pages().len() >= 3);
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename(&BatchReport::from(report("TP53", 0))), "TP53_ClinOmics_Report.pdf");
        assert_eq!(report_filename(&BatchReport::new()), "ClinOmics_Batch_Report.pdf");
    }
}
