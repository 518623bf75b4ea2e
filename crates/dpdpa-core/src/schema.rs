/// Arrow record-set representation of compliance reports.
///
/// One row per verdict; run-level fields travel as schema metadata so the
/// batch is self-describing for downstream PDF/CSV/JSON renderers.
pub mod verdicts {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use arrow::array::{ArrayRef, BooleanArray, Float64Array, ListBuilder, StringArray, StringBuilder};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::ComplianceReport;

    /// Schema for per-requirement verdict rows.
    pub fn verdict_schema() -> Schema {
        Schema::new(vec![
            Field::new("requirement_id", DataType::Utf8, false),
            Field::new("section_ref", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("status", DataType::Utf8, false),
            Field::new("confidence", DataType::Float64, false),
            Field::new("is_gap", DataType::Boolean, false),
            Field::new(
                "matched_clauses",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
            Field::new(
                "missing_elements",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
            Field::new("note", DataType::Utf8, true),
        ])
    }

    /// Run-level metadata attached to the verdict schema.
    pub fn report_metadata(report: &ComplianceReport) -> HashMap<String, String> {
        let config = report.scope_config();
        HashMap::from([
            ("run_id".to_string(), report.run_id().to_string()),
            ("timestamp".to_string(), report.timestamp().to_rfc3339()),
            ("corpus_version".to_string(), report.corpus_version().to_string()),
            ("overall_score".to_string(), format!("{:.4}", report.overall_score())),
            ("strictness".to_string(), config.strictness.to_string()),
            ("scope".to_string(), config.scope.label()),
            ("industry".to_string(), report.industry_context().to_string()),
        ])
    }

    /// Build the verdict record set for a report.
    pub fn verdict_batch(report: &ComplianceReport) -> Result<RecordBatch, ArrowError> {
        let verdicts = report.verdicts();
        let gap_ids: HashSet<&str> = report
            .gaps()
            .iter()
            .map(|g| g.requirement_id.as_str())
            .collect();

        let mut clauses = ListBuilder::new(StringBuilder::new());
        let mut missing = ListBuilder::new(StringBuilder::new());
        for v in verdicts {
            for id in &v.matched_clause_ids {
                clauses.values().append_value(id.to_string());
            }
            clauses.append(true);
            for name in &v.missing_elements {
                missing.values().append_value(name);
            }
            missing.append(true);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                verdicts.iter().map(|v| v.requirement_id.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                verdicts.iter().map(|v| v.section_ref.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                verdicts.iter().map(|v| v.category.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                verdicts.iter().map(|v| v.status.as_str()),
            )),
            Arc::new(Float64Array::from_iter_values(
                verdicts.iter().map(|v| v.confidence),
            )),
            Arc::new(BooleanArray::from(
                verdicts
                    .iter()
                    .map(|v| gap_ids.contains(v.requirement_id.as_str()))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(clauses.finish()),
            Arc::new(missing.finish()),
            Arc::new(StringArray::from(
                verdicts
                    .iter()
                    .map(|v| (!v.note.is_empty()).then_some(v.note.as_str()))
                    .collect::<Vec<_>>(),
            )),
        ];

        let schema = verdict_schema().with_metadata(report_metadata(report));
        RecordBatch::try_new(Arc::new(schema), columns)
    }
}
