use crate::period::Period;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeRecord {
    #[schemars(description = "Calendar year the income was reported for")]
    pub year: i32,

    #[schemars(description = "Quarter of the year, 1 to 4")]
    pub quarter: u8,

    #[schemars(description = "Registry code of the paying agent (employer)")]
    pub employer_id: String,

    #[schemars(description = "Full legal name of the paying agent as it appears in the registry")]
    pub employer_name: String,

    #[schemars(description = "Accrued income amount")]
    pub income: f64,

    #[schemars(description = "Tax withheld from the income")]
    pub tax: f64,

    #[schemars(description = "Income net of tax. Averages per period are based on this value.")]
    pub profit: f64,

    #[schemars(description = "Registry code of the income type (the income 'sign')")]
    pub income_type_code: String,
}

impl IncomeRecord {
    /// The (year, quarter) pair this record belongs to. The quarter is not
    /// range-checked here; [`crate::PeriodRange::from_records`] does that.
    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            quarter: self.quarter,
        }
    }
}

/// Which optional sections a subject report carries, and the thresholds
/// used while building them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportOptions {
    #[schemars(description = "Add the per-year breakdown (timeline plus per-year totals)")]
    pub include_yearly_breakdown: bool,

    #[schemars(description = "Add the per-income-type breakdown (pie buckets plus per-type totals)")]
    pub include_income_type_breakdown: bool,

    #[schemars(description = "Add the detail table with one row per income record")]
    pub include_detail_table: bool,

    #[schemars(description = "Under each year/type entry, list its employers as text lines")]
    pub show_employer_sublist_as_text: bool,

    #[schemars(description = "Under each year/type entry, list its employers as a table")]
    pub show_employer_sublist_as_table: bool,

    #[schemars(
        description = "Income types contributing strictly less than this percentage of the total are folded into 'Other' on the pie chart"
    )]
    pub pie_percent_threshold: f64,

    #[schemars(
        description = "When the covered duration exceeds this many months the timeline is per year, otherwise per quarter"
    )]
    pub yearly_chart_after_months: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_yearly_breakdown: false,
            include_income_type_breakdown: false,
            include_detail_table: false,
            show_employer_sublist_as_text: false,
            show_employer_sublist_as_table: false,
            pie_percent_threshold: 5.0,
            yearly_chart_after_months: 36,
        }
    }
}

impl ReportOptions {
    pub fn wants_employer_sublist(&self) -> bool {
        self.show_employer_sublist_as_text || self.show_employer_sublist_as_table
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportOptions)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_fill_missing_fields() {
        let options = ReportOptions::from_json(r#"{"include_detail_table": true}"#).unwrap();
        assert!(options.include_detail_table);
        assert!(!options.include_yearly_breakdown);
        assert_eq!(options.pie_percent_threshold, 5.0);
        assert_eq!(options.yearly_chart_after_months, 36);
    }

    #[test]
    fn test_options_schema_generation() {
        let schema = serde_json::to_string_pretty(&ReportOptions::json_schema()).unwrap();
        assert!(schema.contains("include_yearly_breakdown"));
        assert!(schema.contains("pie_percent_threshold"));
    }

    #[test]
    fn test_record_period() {
        let record = IncomeRecord {
            year: 2022,
            quarter: 3,
            employer_id: "12345678".to_string(),
            employer_name: "Acme".to_string(),
            income: 1000.0,
            tax: 195.0,
            profit: 805.0,
            income_type_code: "101".to_string(),
        };
        assert_eq!(record.period().key(), 20223);
    }
}
