//! Read-only display-label lookups injected into aggregation and pivot building.
//!
//! Every lookup falls back to the raw code when no label is configured.

use crate::error::Result;
use log::warn;
use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shown for an employer whose registry name is blank.
pub const UNNAMED_EMPLOYER: &str = "name not specified";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LabelCatalog {
    #[schemars(description = "Income type code -> full descriptive name, used in lists and detail rows")]
    pub income_type_long: BTreeMap<String, String>,

    #[schemars(description = "Income type code -> short name, used on charts and in the pivot table")]
    pub income_type_short: BTreeMap<String, String>,

    #[schemars(
        description = "Legal-entity form phrases and their abbreviations, applied in order to employer names"
    )]
    pub company_forms: Vec<CompanyFormRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompanyFormRule {
    #[schemars(description = "Phrase to look for, matched case-insensitively")]
    pub phrase: String,

    #[schemars(description = "Replacement; always written in upper case")]
    pub abbreviation: String,
}

impl LabelCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LabelCatalog)
    }

    pub fn income_type_long<'a>(&'a self, code: &'a str) -> &'a str {
        self.income_type_long
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }

    pub fn income_type_short<'a>(&'a self, code: &'a str) -> &'a str {
        self.income_type_short
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }

    /// Compiles the company-form rules once so they can be applied to many names.
    pub fn company_titles(&self) -> CompanyTitles {
        let rules = self
            .company_forms
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&regex::escape(&rule.phrase))
                    .case_insensitive(true)
                    .build()
                {
                    Ok(pattern) => Some((pattern, rule.abbreviation.to_uppercase())),
                    Err(e) => {
                        warn!("Skipping company form rule '{}': {}", rule.phrase, e);
                        None
                    }
                }
            })
            .collect();

        CompanyTitles {
            spaces: Regex::new(" +").ok(),
            rules,
        }
    }
}

pub struct CompanyTitles {
    spaces: Option<Regex>,
    rules: Vec<(Regex, String)>,
}

impl CompanyTitles {
    /// Collapses runs of spaces, then shortens every legal-form phrase.
    pub fn title(&self, full_name: &str) -> String {
        let mut title = match &self.spaces {
            Some(spaces) => spaces.replace_all(full_name, " ").into_owned(),
            None => full_name.to_string(),
        };
        for (pattern, abbreviation) in &self.rules {
            title = pattern
                .replace_all(&title, regex::NoExpand(abbreviation.as_str()))
                .into_owned();
        }
        title
    }
}
