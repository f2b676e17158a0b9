//! Grouping of income records by arbitrary key combinations.
//!
//! Groups come back in the order their key first occurs in the input. The
//! timeline views are the exception: they walk the covered period range and
//! emit one zero-filled row per quarter (or year), in chronological order.

use crate::period::{Period, PeriodRange};
use crate::schema::IncomeRecord;
use crate::utils::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Year,
    Quarter,
    IncomeType,
    Employer,
}

/// Which monetary column of a record is summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Amount {
    Income,
    Tax,
    Profit,
}

impl Amount {
    pub fn of(&self, record: &IncomeRecord) -> f64 {
        match self {
            Amount::Income => record.income,
            Amount::Tax => record.tax,
            Amount::Profit => record.profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Number(i64),
    Text(String),
}

impl KeyPart {
    fn of(field: GroupField, record: &IncomeRecord) -> Self {
        match field {
            GroupField::Year => KeyPart::Number(record.year as i64),
            GroupField::Quarter => KeyPart::Number(record.quarter as i64),
            GroupField::IncomeType => KeyPart::Text(record.income_type_code.clone()),
            GroupField::Employer => KeyPart::Text(record.employer_id.clone()),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Number(n) => write!(f, "{}", n),
            KeyPart::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateGroup {
    pub key: Vec<KeyPart>,
    pub sum: f64,
}

impl AggregateGroup {
    /// Key parts joined with " / ", e.g. "2022 / 101".
    pub fn label(&self) -> String {
        self.key
            .iter()
            .map(KeyPart::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Sums `amount` per distinct combination of `fields`, in first-occurrence order.
pub fn aggregate<'a, I>(records: I, fields: &[GroupField], amount: Amount) -> Vec<AggregateGroup>
where
    I: IntoIterator<Item = &'a IncomeRecord>,
{
    let mut groups: Vec<AggregateGroup> = Vec::new();
    let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();

    for record in records {
        let key: Vec<KeyPart> = fields.iter().map(|f| KeyPart::of(*f, record)).collect();
        let value = amount.of(record);

        match index.get(&key) {
            Some(&pos) => groups[pos].sum += value,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(AggregateGroup { key, sum: value });
            }
        }
    }

    groups
}

/// Same grouping, sorted by key instead of first occurrence.
pub fn aggregate_sorted<'a, I>(
    records: I,
    fields: &[GroupField],
    amount: Amount,
) -> Vec<AggregateGroup>
where
    I: IntoIterator<Item = &'a IncomeRecord>,
{
    let mut groups = aggregate(records, fields, amount);
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodTotals {
    pub income: f64,
    pub tax: f64,
    pub profit: f64,
}

impl PeriodTotals {
    pub fn add(&mut self, record: &IncomeRecord) {
        self.income += record.income;
        self.tax += record.tax;
        self.profit += record.profit;
    }

    pub fn of<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a IncomeRecord>,
    {
        let mut totals = Self::default();
        for record in records {
            totals.add(record);
        }
        totals
    }

    pub fn rounded(&self) -> Self {
        Self {
            income: round2(self.income),
            tax: round2(self.tax),
            profit: round2(self.profit),
        }
    }
}

/// One bar of a timeline chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodRow {
    pub label: String,
    pub year: i32,
    /// `None` on yearly timelines.
    pub quarter: Option<u8>,
    pub totals: PeriodTotals,
}

/// One row per quarter in `range`, chronological, zero-filled where no
/// record falls in the quarter.
pub fn quarterly_timeline(records: &[IncomeRecord], range: &PeriodRange) -> Vec<PeriodRow> {
    let mut by_period: HashMap<Period, PeriodTotals> = HashMap::new();
    for record in records {
        by_period.entry(record.period()).or_default().add(record);
    }

    range
        .iter()
        .map(|period| PeriodRow {
            label: period.label(),
            year: period.year,
            quarter: Some(period.quarter),
            totals: by_period
                .get(&period)
                .copied()
                .unwrap_or_default()
                .rounded(),
        })
        .collect()
}

/// One row per calendar year in `range`, ascending, zero-filled.
pub fn yearly_timeline(records: &[IncomeRecord], range: &PeriodRange) -> Vec<PeriodRow> {
    let mut by_year: BTreeMap<i32, PeriodTotals> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year).or_default().add(record);
    }

    range
        .years()
        .map(|year| PeriodRow {
            label: year.to_string(),
            year,
            quarter: None,
            totals: by_year.get(&year).copied().unwrap_or_default().rounded(),
        })
        .collect()
}

/// Employer id -> the first name recorded for it.
pub fn employer_names(records: &[IncomeRecord]) -> HashMap<String, String> {
    let mut names: HashMap<String, String> = HashMap::new();
    for record in records {
        names
            .entry(record.employer_id.clone())
            .or_insert_with(|| record.employer_name.clone());
    }
    names
}
