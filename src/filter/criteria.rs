//! Cohort selection criteria.

use crate::data::Value;
use serde::{Deserialize, Serialize};

/// Keep subjects whose QC column holds one of the accepted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcCriterion {
    /// QC or outlier-label column in the QC table.
    pub column: String,
    /// Values that mark a subject as included.
    pub accepted: Vec<Value>,
}

impl QcCriterion {
    /// Create a criterion from a column and its accepted values.
    pub fn new<I, V>(column: &str, accepted: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            column: column.to_string(),
            accepted: accepted.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a QC value is accepted. Missing values never are.
    pub fn accepts(&self, value: &Value) -> bool {
        match value.key() {
            Some(k) => self.accepted.iter().any(|a| a.key().as_deref() == Some(k.as_str())),
            None => false,
        }
    }
}

/// Minimum group size for one covariate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateRule {
    /// Covariate column (e.g. a site or scanner column).
    pub covariate: String,
    /// Groups need strictly more rows than this to be kept.
    pub min_count: usize,
}

impl CovariateRule {
    pub fn new(covariate: &str, min_count: usize) -> Self {
        Self {
            covariate: covariate.to_string(),
            min_count,
        }
    }
}

/// Ordered sequence of minimum-sample-size rules.
///
/// Each rule is applied to the output of the previous one, so the order of
/// the rules changes the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalCriteria {
    rules: Vec<CovariateRule>,
}

impl ExternalCriteria {
    /// Create an empty rule sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule applied after all existing ones.
    pub fn then(mut self, covariate: &str, min_count: usize) -> Self {
        self.rules.push(CovariateRule::new(covariate, min_count));
        self
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[CovariateRule] {
        &self.rules
    }

    /// Covariate names in application order.
    pub fn covariates(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.covariate.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CovariateRule> {
        self.rules.iter()
    }
}

impl FromIterator<CovariateRule> for ExternalCriteria {
    fn from_iter<T: IntoIterator<Item = CovariateRule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ExternalCriteria {
    type Item = &'a CovariateRule;
    type IntoIter = std::slice::Iter<'a, CovariateRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
