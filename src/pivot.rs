//! Year -> income type -> employer summary table, ready for vertical cell merging.
//!
//! Rows come out sorted by the full (year, type, employer) key because the
//! sums are collected in a `BTreeMap`, so every year and every (year, type)
//! occupies exactly one contiguous block of rows. Only the first row of a
//! block carries the value; the rest hold `None`. The same blocks are also
//! returned as explicit [`CellSpan`]s so a renderer never has to infer them.

use crate::aggregate::employer_names;
use crate::format::format_amount_or_na;
use crate::labels::{LabelCatalog, UNNAMED_EMPLOYER};
use crate::schema::IncomeRecord;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PivotColumn {
    Year,
    IncomeType,
    Employer,
    YearTotal,
}

impl PivotColumn {
    pub const ALL: [PivotColumn; 4] = [
        PivotColumn::Year,
        PivotColumn::IncomeType,
        PivotColumn::Employer,
        PivotColumn::YearTotal,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            PivotColumn::Year => "Year",
            PivotColumn::IncomeType => "Income type",
            PivotColumn::Employer => "Agent name",
            PivotColumn::YearTotal => "Sum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PivotRow {
    /// `None` continues the year cell of the row above.
    pub year: Option<String>,
    /// `None` continues the income-type cell of the row above.
    pub income_type: Option<String>,
    pub employer: String,
    /// Year total; set on the same rows as `year`.
    pub year_total: Option<String>,
}

impl PivotRow {
    pub fn cell(&self, column: PivotColumn) -> Option<&str> {
        match column {
            PivotColumn::Year => self.year.as_deref(),
            PivotColumn::IncomeType => self.income_type.as_deref(),
            PivotColumn::Employer => Some(self.employer.as_str()),
            PivotColumn::YearTotal => self.year_total.as_deref(),
        }
    }

    pub fn is_continuation(&self, column: PivotColumn) -> bool {
        self.cell(column).is_none()
    }
}

/// A vertically merged cell: `value` starting at `start_row`, covering
/// `span_rows` rows (row indices exclude the header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CellSpan {
    pub value: String,
    pub start_row: usize,
    pub span_rows: usize,
}

impl CellSpan {
    pub fn end_row(&self) -> usize {
        self.start_row + self.span_rows - 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PivotTable {
    pub headers: Vec<String>,
    pub rows: Vec<PivotRow>,
    pub year_spans: Vec<CellSpan>,
    pub income_type_spans: Vec<CellSpan>,
    pub year_total_spans: Vec<CellSpan>,
    /// Unformatted year totals, ascending by year.
    pub year_sums: Vec<(i32, f64)>,
}

impl PivotTable {
    pub fn spans(&self, column: PivotColumn) -> Vec<CellSpan> {
        match column {
            PivotColumn::Year => self.year_spans.clone(),
            PivotColumn::IncomeType => self.income_type_spans.clone(),
            PivotColumn::YearTotal => self.year_total_spans.clone(),
            PivotColumn::Employer => self
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| CellSpan {
                    value: row.employer.clone(),
                    start_row: i,
                    span_rows: 1,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Builds the pivot over the profit column.
pub fn build_pivot(records: &[IncomeRecord], labels: &LabelCatalog) -> PivotTable {
    let mut leaves: BTreeMap<(i32, &str, &str), f64> = BTreeMap::new();
    let mut year_sums: BTreeMap<i32, f64> = BTreeMap::new();
    let mut type_sums: BTreeMap<(i32, &str), f64> = BTreeMap::new();

    for record in records {
        let year = record.year;
        let code = record.income_type_code.as_str();
        *leaves
            .entry((year, code, record.employer_id.as_str()))
            .or_insert(0.0) += record.profit;
        *year_sums.entry(year).or_insert(0.0) += record.profit;
        *type_sums.entry((year, code)).or_insert(0.0) += record.profit;
    }

    let names = employer_names(records);
    let titles = labels.company_titles();

    let mut rows: Vec<PivotRow> = Vec::with_capacity(leaves.len());
    let mut year_spans: Vec<CellSpan> = Vec::new();
    let mut income_type_spans: Vec<CellSpan> = Vec::new();
    let mut year_total_spans: Vec<CellSpan> = Vec::new();

    let mut last_year: Option<i32> = None;
    let mut last_type: Option<(i32, &str)> = None;

    for (idx, &(year, code, employer_id)) in leaves.keys().enumerate() {
        let (year_cell, total_cell) = if last_year != Some(year) {
            last_year = Some(year);
            let label = year.to_string();
            let total = format_amount_or_na(year_sums.get(&year).copied().unwrap_or(0.0));
            year_spans.push(open_span(&label, idx));
            year_total_spans.push(open_span(&total, idx));
            (Some(label), Some(total))
        } else {
            extend_last(&mut year_spans);
            extend_last(&mut year_total_spans);
            (None, None)
        };

        let type_cell = if last_type != Some((year, code)) {
            last_type = Some((year, code));
            let subtotal = type_sums.get(&(year, code)).copied().unwrap_or(0.0);
            let text = format!(
                "{} (code {}) - {}",
                labels.income_type_short(code),
                code,
                format_amount_or_na(subtotal)
            );
            income_type_spans.push(open_span(&text, idx));
            Some(text)
        } else {
            extend_last(&mut income_type_spans);
            None
        };

        let name = names
            .get(employer_id)
            .filter(|n| !n.trim().is_empty())
            .map(|n| titles.title(n))
            .unwrap_or_else(|| UNNAMED_EMPLOYER.to_string());

        rows.push(PivotRow {
            year: year_cell,
            income_type: type_cell,
            employer: format!("CODE {} - {}", employer_id, name),
            year_total: total_cell,
        });
    }

    debug!(
        "Pivot table built: {} rows, {} years, {} income type blocks",
        rows.len(),
        year_spans.len(),
        income_type_spans.len()
    );

    PivotTable {
        headers: PivotColumn::ALL
            .iter()
            .map(|c| c.header().to_string())
            .collect(),
        rows,
        year_spans,
        income_type_spans,
        year_total_spans,
        year_sums: year_sums.into_iter().collect(),
    }
}

fn open_span(value: &str, start_row: usize) -> CellSpan {
    CellSpan {
        value: value.to_string(),
        start_row,
        span_rows: 1,
    }
}

fn extend_last(spans: &mut [CellSpan]) {
    if let Some(span) = spans.last_mut() {
        span.span_rows += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::CompanyFormRule;

    fn record(year: i32, code: &str, employer: &str, profit: f64) -> IncomeRecord {
        IncomeRecord {
            year,
            quarter: 1,
            employer_id: employer.to_string(),
            employer_name: format!("limited liability company {}", employer),
            income: profit,
            tax: 0.0,
            profit,
            income_type_code: code.to_string(),
        }
    }

    fn labels() -> LabelCatalog {
        let mut labels = LabelCatalog::default();
        labels
            .income_type_short
            .insert("101".to_string(), "Salary".to_string());
        labels.company_forms.push(CompanyFormRule {
            phrase: "limited liability company".to_string(),
            abbreviation: "llc".to_string(),
        });
        labels
    }

    // Deliberately unsorted so ordering comes from the builder.
    fn sample() -> Vec<IncomeRecord> {
        vec![
            record(2022, "101", "200", 1000.0),
            record(2021, "126", "300", 50.0),
            record(2021, "101", "100", 700.0),
            record(2022, "101", "100", 300.0),
            record(2021, "101", "200", 250.0),
            record(2021, "101", "100", 300.0),
        ]
    }

    #[test]
    fn test_rows_sorted_and_merged() {
        let table = build_pivot(&sample(), &labels());
        assert_eq!(table.headers, vec!["Year", "Income type", "Agent name", "Sum"]);
        assert_eq!(table.rows.len(), 5);

        let years: Vec<Option<&str>> = table.rows.iter().map(|r| r.year.as_deref()).collect();
        assert_eq!(
            years,
            vec![Some("2021"), None, None, Some("2022"), None]
        );

        assert_eq!(
            table.rows[0].income_type.as_deref(),
            Some("Salary (code 101) - 1 250.00")
        );
        assert!(table.rows[1].is_continuation(PivotColumn::IncomeType));
        assert_eq!(
            table.rows[2].income_type.as_deref(),
            Some("126 (code 126) - 50.00")
        );
        assert_eq!(
            table.rows[3].income_type.as_deref(),
            Some("Salary (code 101) - 1 300.00")
        );

        assert_eq!(table.rows[0].employer, "CODE 100 - LLC 100");
        assert_eq!(table.rows[0].year_total.as_deref(), Some("1 300.00"));
        assert_eq!(table.rows[3].year_total.as_deref(), Some("1 300.00"));
        assert!(table.rows[4].year_total.is_none());
    }

    #[test]
    fn test_spans_cover_every_row_once() {
        let table = build_pivot(&sample(), &labels());

        for column in PivotColumn::ALL {
            let spans = table.spans(column);
            let mut next_row = 0;
            for span in &spans {
                assert_eq!(span.start_row, next_row, "{:?}", column);
                assert!(span.span_rows >= 1);
                assert_eq!(
                    table.rows[span.start_row].cell(column),
                    Some(span.value.as_str())
                );
                for row in &table.rows[span.start_row + 1..=span.end_row()] {
                    assert!(row.is_continuation(column));
                }
                next_row = span.end_row() + 1;
            }
            // the trailing run reaches the last row
            assert_eq!(next_row, table.rows.len(), "{:?}", column);
        }

        assert_eq!(table.year_spans.len(), 2);
        assert_eq!(table.year_spans[0].span_rows, 3);
        assert_eq!(table.year_spans[1].span_rows, 2);
        assert_eq!(table.income_type_spans.len(), 3);
    }

    #[test]
    fn test_year_runs_are_distinct() {
        let table = build_pivot(&sample(), &labels());
        let mut seen: Vec<&str> = table.year_spans.iter().map(|s| s.value.as_str()).collect();
        let before = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), before);
        assert_eq!(table.year_sums, vec![(2021, 1300.0), (2022, 1300.0)]);
    }

    #[test]
    fn test_empty_input() {
        let table = build_pivot(&[], &LabelCatalog::default());
        assert!(table.is_empty());
        assert!(table.year_spans.is_empty());
        assert_eq!(table.headers.len(), 4);
    }
}
