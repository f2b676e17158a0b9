//! Per-subject report assembly.
//!
//! Everything a renderer needs for one subject, computed in one pass over
//! that subject's records. Amounts meant for display are pre-formatted;
//! chart data keeps raw numbers.

use crate::aggregate::{
    aggregate, employer_names, quarterly_timeline, yearly_timeline, Amount, GroupField, PeriodRow,
    PeriodTotals,
};
use crate::error::Result;
use crate::format::format_amount_or_na;
use crate::labels::{CompanyTitles, LabelCatalog, UNNAMED_EMPLOYER};
use crate::period::{profit_averages, Duration, Period, PeriodRange, ProfitAverages};
use crate::pivot::{build_pivot, PivotTable};
use crate::ranking::{rank, rank_descending, RankedBucket};
use crate::schema::{IncomeRecord, ReportOptions};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntroSummary {
    pub first_period: Period,
    pub last_period: Period,
    pub duration: Duration,
    pub totals: PeriodTotals,
    pub averages: ProfitAverages,
    pub total_income: String,
    pub total_tax: String,
    pub total_profit: String,
    pub average_yearly_profit: String,
    pub average_monthly_profit: String,
}

/// One employer in a ranked list or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmployerLine {
    pub rank: usize,
    pub amount: f64,
    pub amount_text: String,
    pub employer_id: String,
    pub employer_name: String,
}

/// One year or income type with its total and, when requested, the
/// employers that make it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BreakdownEntry {
    pub label: String,
    pub amount: f64,
    pub amount_text: String,
    pub employers: Vec<EmployerLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimelineGranularity {
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    pub granularity: TimelineGranularity,
    pub rows: Vec<PeriodRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct YearlyBreakdown {
    pub timeline: Timeline,
    /// Most recent year first.
    pub years: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeTypeBreakdown {
    /// Short-label pie buckets; absent when only one label remains.
    pub pie: Option<Vec<RankedBucket>>,
    /// Descending by amount, labelled with long names.
    pub types: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetailRow {
    pub period: String,
    pub employer: String,
    pub income: String,
    pub tax: String,
    pub income_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubjectReport {
    pub subject: String,
    pub options: ReportOptions,
    pub intro: IntroSummary,
    /// Descending by income.
    pub employers: Vec<EmployerLine>,
    pub pivot: PivotTable,
    pub yearly: Option<YearlyBreakdown>,
    pub income_types: Option<IncomeTypeBreakdown>,
    pub detail: Option<Vec<DetailRow>>,
}

impl SubjectReport {
    pub fn build(
        subject: &str,
        records: &[IncomeRecord],
        options: &ReportOptions,
        labels: &LabelCatalog,
    ) -> Result<Self> {
        info!("Building income report for subject: {}", subject);

        let range = PeriodRange::from_records(subject, records)?;
        let ctx = ReportContext::new(records, labels);

        let intro = build_intro(records, &range);
        debug!(
            "Subject {} covers {} to {} ({} months, {} records)",
            subject,
            range.first,
            range.last,
            intro.duration.months,
            records.len()
        );

        let employers = ctx.employer_lines(records);
        let pivot = build_pivot(records, labels);

        let yearly = if options.include_yearly_breakdown {
            Some(ctx.yearly_breakdown(records, &range, options))
        } else {
            None
        };

        let income_types = if options.include_income_type_breakdown {
            Some(ctx.income_type_breakdown(records, options)?)
        } else {
            None
        };

        let detail = if options.include_detail_table {
            Some(ctx.detail_rows(records))
        } else {
            None
        };

        Ok(Self {
            subject: subject.to_string(),
            options: options.clone(),
            intro,
            employers,
            pivot,
            yearly,
            income_types,
            detail,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn build_intro(records: &[IncomeRecord], range: &PeriodRange) -> IntroSummary {
    let totals = PeriodTotals::of(records);
    let duration = range.duration();
    let averages = profit_averages(totals.profit, &duration);

    IntroSummary {
        first_period: range.first,
        last_period: range.last,
        total_income: format_amount_or_na(totals.income),
        total_tax: format_amount_or_na(totals.tax),
        total_profit: format_amount_or_na(totals.profit),
        average_yearly_profit: format_amount_or_na(averages.yearly),
        average_monthly_profit: format_amount_or_na(averages.monthly),
        duration,
        totals,
        averages,
    }
}

struct ReportContext<'a> {
    names: HashMap<String, String>,
    titles: CompanyTitles,
    labels: &'a LabelCatalog,
}

impl<'a> ReportContext<'a> {
    fn new(records: &[IncomeRecord], labels: &'a LabelCatalog) -> Self {
        Self {
            names: employer_names(records),
            titles: labels.company_titles(),
            labels,
        }
    }

    fn employer_title(&self, employer_id: &str) -> String {
        self.names
            .get(employer_id)
            .filter(|n| !n.trim().is_empty())
            .map(|n| self.titles.title(n))
            .unwrap_or_else(|| UNNAMED_EMPLOYER.to_string())
    }

    /// Employers of `records` ranked by income, highest first.
    fn employer_lines<'r, I>(&self, records: I) -> Vec<EmployerLine>
    where
        I: IntoIterator<Item = &'r IncomeRecord>,
    {
        let groups = aggregate(records, &[GroupField::Employer], Amount::Income);

        rank_descending(groups.iter().map(|g| (g.label(), g.sum)))
            .into_iter()
            .map(|bucket| EmployerLine {
                rank: bucket.rank,
                amount: bucket.amount,
                amount_text: format_amount_or_na(bucket.amount),
                employer_name: self.employer_title(&bucket.label),
                employer_id: bucket.label,
            })
            .collect()
    }

    fn sublist<'r, I>(&self, options: &ReportOptions, records: I) -> Vec<EmployerLine>
    where
        I: IntoIterator<Item = &'r IncomeRecord>,
    {
        if options.wants_employer_sublist() {
            self.employer_lines(records)
        } else {
            Vec::new()
        }
    }

    fn yearly_breakdown(
        &self,
        records: &[IncomeRecord],
        range: &PeriodRange,
        options: &ReportOptions,
    ) -> YearlyBreakdown {
        let months = range.duration().months;
        let timeline = if months > options.yearly_chart_after_months {
            Timeline {
                granularity: TimelineGranularity::Yearly,
                rows: yearly_timeline(records, range),
            }
        } else {
            Timeline {
                granularity: TimelineGranularity::Quarterly,
                rows: quarterly_timeline(records, range),
            }
        };
        debug!(
            "Timeline: {:?} with {} rows",
            timeline.granularity,
            timeline.rows.len()
        );

        let mut year_sums: BTreeMap<i32, f64> = BTreeMap::new();
        for record in records {
            *year_sums.entry(record.year).or_insert(0.0) += record.income;
        }

        let years = year_sums
            .into_iter()
            .rev()
            .map(|(year, sum)| BreakdownEntry {
                label: year.to_string(),
                amount: sum,
                amount_text: format_amount_or_na(sum),
                employers: self.sublist(options, records.iter().filter(|r| r.year == year)),
            })
            .collect();

        YearlyBreakdown { timeline, years }
    }

    fn income_type_breakdown(
        &self,
        records: &[IncomeRecord],
        options: &ReportOptions,
    ) -> Result<IncomeTypeBreakdown> {
        // Codes sharing a short label become one slice.
        let mut short_sums: Vec<(String, f64)> = Vec::new();
        for record in records {
            let label = self.labels.income_type_short(&record.income_type_code);
            match short_sums.iter_mut().find(|(l, _)| l == label) {
                Some((_, sum)) => *sum += record.income,
                None => short_sums.push((label.to_string(), record.income)),
            }
        }
        let pie = if short_sums.len() > 1 {
            Some(rank(short_sums, options.pie_percent_threshold)?)
        } else {
            None
        };

        let groups = aggregate(records, &[GroupField::IncomeType], Amount::Income);
        let types = rank_descending(groups.iter().map(|g| (g.label(), g.sum)))
            .into_iter()
            .map(|bucket| {
                let code = bucket.label;
                BreakdownEntry {
                    label: self.labels.income_type_long(&code).to_string(),
                    amount: bucket.amount,
                    amount_text: format_amount_or_na(bucket.amount),
                    employers: self.sublist(
                        options,
                        records.iter().filter(|r| r.income_type_code == code),
                    ),
                }
            })
            .collect();

        Ok(IncomeTypeBreakdown { pie, types })
    }

    fn detail_rows(&self, records: &[IncomeRecord]) -> Vec<DetailRow> {
        records
            .iter()
            .map(|record| DetailRow {
                period: record.period().label(),
                employer: format!("{} (code {})", record.employer_name, record.employer_id),
                income: format_amount_or_na(record.income),
                tax: format_amount_or_na(record.tax),
                income_type: self
                    .labels
                    .income_type_long(&record.income_type_code)
                    .to_string(),
            })
            .collect()
    }
}
