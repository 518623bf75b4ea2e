//! Report encodings: table card, JSON, CSV and Arrow IPC.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{Array, ArrayRef, ListArray, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::ValueEnum;
use dpdpa_core::{ComplianceReport, verdicts};

use crate::display;

/// Separator for list values flattened into a single CSV cell.
const LIST_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Report card followed by a verdict table.
    Table,
    /// The full report as JSON; `dpdpa diff` reads this back.
    Json,
    /// One row per verdict.
    Csv,
    /// Arrow IPC file with run metadata on the schema.
    Arrow,
}

pub fn write_report<W: Write>(
    report: &ComplianceReport,
    format: Format,
    mut out: W,
) -> anyhow::Result<()> {
    match format {
        Format::Table => display::write_report_card(&mut out, report)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, report).context("encoding report as JSON")?;
            writeln!(out)?;
        }
        Format::Csv => {
            let batch = verdicts::verdict_batch(report).context("building verdict batch")?;
            let flat = flatten_lists(&batch).context("flattening list columns")?;
            let mut writer = arrow::csv::WriterBuilder::new()
                .with_header(true)
                .build(&mut out);
            writer.write(&flat).context("writing CSV")?;
        }
        Format::Arrow => {
            let batch = verdicts::verdict_batch(report).context("building verdict batch")?;
            let mut writer = arrow::ipc::writer::FileWriter::try_new(&mut out, &batch.schema())
                .context("opening Arrow IPC writer")?;
            writer.write(&batch).context("writing Arrow IPC batch")?;
            writer.finish().context("finishing Arrow IPC file")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Replace every `List<Utf8>` column with a `Utf8` column of joined values.
///
/// The CSV writer has no representation for nested types.
pub fn flatten_lists(batch: &RecordBatch) -> Result<RecordBatch, arrow::error::ArrowError> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, col) in schema.fields().iter().zip(batch.columns()) {
        match field.data_type() {
            DataType::List(inner) if inner.data_type() == &DataType::Utf8 => {
                let list = col
                    .as_any()
                    .downcast_ref::<ListArray>()
                    .ok_or_else(|| {
                        arrow::error::ArrowError::CastError(format!(
                            "column {} is not a ListArray",
                            field.name()
                        ))
                    })?;
                let mut joined = StringBuilder::new();
                for row in 0..list.len() {
                    if list.is_null(row) {
                        joined.append_null();
                        continue;
                    }
                    let values = list.value(row);
                    let items: Vec<&str> = values
                        .as_any()
                        .downcast_ref::<StringArray>()
                        .map(|s| (0..s.len()).filter(|&i| !s.is_null(i)).map(|i| s.value(i)).collect())
                        .unwrap_or_default();
                    joined.append_value(items.join(LIST_SEPARATOR));
                }
                fields.push(Field::new(field.name(), DataType::Utf8, field.is_nullable()));
                columns.push(Arc::new(joined.finish()));
            }
            _ => {
                fields.push(field.as_ref().clone());
                columns.push(Arc::clone(col));
            }
        }
    }

    let flat = Schema::new(fields).with_metadata(schema.metadata().clone());
    RecordBatch::try_new(Arc::new(flat), columns)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use dpdpa_core::{
        Category, ClauseId, Gap, Industry, MatchStatus, MatchVerdict, MatchingConfiguration,
        ReportParts, Scope, Strictness,
    };
    use uuid::Uuid;

    use super::*;

    fn sample_report() -> ComplianceReport {
        let notice = MatchVerdict {
            requirement_id: "DPDPA-5-1-NOTICE".into(),
            section_ref: "5(1)".into(),
            category: Category::Notice,
            matched_clause_ids: BTreeSet::from([ClauseId(1), ClauseId(2)]),
            status: MatchStatus::Matched,
            confidence: 0.81,
            missing_elements: vec![],
            note: "2 clause(s) cover 4/4 elements".into(),
        };
        let children = MatchVerdict {
            requirement_id: "DPDPA-9-1-CHILD-CONSENT".into(),
            section_ref: "9(1)".into(),
            category: Category::ChildrensData,
            matched_clause_ids: BTreeSet::new(),
            status: MatchStatus::Missing,
            confidence: 0.0,
            missing_elements: vec!["parental consent".into(), "verification".into()],
            note: "no clause addresses this requirement".into(),
        };
        let gap = Gap {
            requirement_id: children.requirement_id.clone(),
            section_ref: children.section_ref.clone(),
            category: children.category,
            status: children.status,
            description: "Obtain verifiable parental consent".into(),
            missing_elements: children.missing_elements.clone(),
        };
        ComplianceReport::new(ReportParts {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            corpus_version: "test-1".into(),
            overall_score: 0.5,
            verdicts: vec![notice, children],
            gaps: vec![gap],
            scope_config: MatchingConfiguration::new(
                Strictness::Moderate,
                Scope::FullAct,
                Industry::General,
            ),
        })
    }

    fn render(format: Format) -> Vec<u8> {
        let mut buf = Vec::new();
        write_report(&sample_report(), format, &mut buf).unwrap();
        buf
    }

    #[test]
    fn json_reads_back_into_a_report() {
        let report = sample_report();
        let mut buf = Vec::new();
        write_report(&report, Format::Json, &mut buf).unwrap();
        let back: ComplianceReport = serde_json::from_slice(&buf).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn csv_has_header_and_flattened_lists() {
        let text = String::from_utf8(render(Format::Csv)).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "requirement_id,section_ref,category,status,confidence,is_gap,matched_clauses,missing_elements,note"
        );
        let notice = lines.next().unwrap();
        assert!(notice.starts_with("DPDPA-5-1-NOTICE,5(1),notice,matched,0.81,false,C001; C002,"));
        let children = lines.next().unwrap();
        assert!(children.contains("parental consent; verification"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn arrow_ipc_round_trips_with_metadata() {
        let bytes = render(Format::Arrow);
        let reader =
            arrow::ipc::reader::FileReader::try_new(std::io::Cursor::new(bytes), None).unwrap();
        let schema = reader.schema();
        assert_eq!(schema.metadata().get("corpus_version").map(String::as_str), Some("test-1"));
        let batches: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);
    }

    #[test]
    fn table_contains_card_and_verdicts() {
        let text = String::from_utf8(render(Format::Table)).unwrap();
        assert!(text.contains("overall_score"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("DPDPA-9-1-CHILD-CONSENT"));
        assert!(text.contains("| requirement_id"));
    }
}
