//! Label selectors — match expressions over cluster labels.
//!
//! A [`LabelSelector`] is the AND of its [`MatchExpression`]s. An empty
//! selector matches every cluster.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// Cluster labels, ordered so diagnostics are stable.
pub type Labels = BTreeMap<String, String>;

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

/// Match expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Label present and its value is in the set.
    In,
    /// Label absent, or its value is not in the set.
    NotIn,
    /// Label key present, any value.
    Exists,
    /// Label key absent.
    DoesNotExist,
}

impl FromStr for Operator {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In" => Ok(Self::In),
            "NotIn" => Ok(Self::NotIn),
            "Exists" => Ok(Self::Exists),
            "DoesNotExist" => Ok(Self::DoesNotExist),
            other => Err(PlacementError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::Exists => "Exists",
            Self::DoesNotExist => "DoesNotExist",
        };
        f.write_str(s)
    }
}

/// A single `key <operator> values` requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchExpression {
    pub key: String,
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl MatchExpression {
    /// Build and validate an expression.
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: Vec<String>,
    ) -> PlacementResult<Self> {
        let expr = Self {
            key: key.into(),
            operator,
            values,
        };
        expr.validate()?;
        Ok(expr)
    }

    /// `key In [value]`, the expansion of a `matchLabels` entry.
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> PlacementResult<Self> {
        Self::new(key, Operator::In, vec![value.into()])
    }

    pub fn validate(&self) -> PlacementResult<()> {
        validate_label_key(&self.key)?;
        match self.operator {
            Operator::In | Operator::NotIn if self.values.is_empty() => {
                Err(PlacementError::InvalidSelector(format!(
                    "{} {} requires at least one value",
                    self.key, self.operator
                )))
            }
            Operator::Exists | Operator::DoesNotExist if !self.values.is_empty() => {
                Err(PlacementError::InvalidSelector(format!(
                    "{} {} takes no values",
                    self.key, self.operator
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn => !value.is_some_and(|v| self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for MatchExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::In | Operator::NotIn => {
                write!(f, "{} {} ({})", self.key, self.operator, self.values.join(", "))
            }
            Operator::Exists | Operator::DoesNotExist => {
                write!(f, "{} {}", self.key, self.operator)
            }
        }
    }
}

/// Conjunction of match expressions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelSelector {
    #[serde(default)]
    pub expressions: Vec<MatchExpression>,
}

impl LabelSelector {
    pub fn new(expressions: Vec<MatchExpression>) -> Self {
        Self { expressions }
    }

    /// The selector that matches every cluster.
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn validate(&self) -> PlacementResult<()> {
        self.expressions.iter().try_for_each(MatchExpression::validate)
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.first_unmatched(labels).is_none()
    }

    /// The first expression the labels fail, if any.
    pub fn first_unmatched(&self, labels: &Labels) -> Option<&MatchExpression> {
        self.expressions.iter().find(|e| !e.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expressions.is_empty() {
            return f.write_str("<everything>");
        }
        let parts: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

/// An affinity term: a selector plus a display name for reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityTerm {
    pub name: Option<String>,
    pub selector: LabelSelector,
}

impl AffinityTerm {
    pub fn new(name: Option<String>, selector: LabelSelector) -> Self {
        Self { name, selector }
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.selector.matches(labels)
    }

    pub fn validate(&self) -> PlacementResult<()> {
        self.selector.validate()
    }
}

impl fmt::Display for AffinityTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} [{}]", self.selector),
            None => write!(f, "[{}]", self.selector),
        }
    }
}

/// Validate a label key: `[prefix/]name`.
///
/// The name is at most 63 characters of `[A-Za-z0-9-_.]`, starting and
/// ending alphanumeric. The optional prefix is a DNS subdomain.
pub fn validate_label_key(key: &str) -> PlacementResult<()> {
    let invalid = |why: &str| PlacementError::InvalidSelector(format!("label key {key:?}: {why}"));

    if key.is_empty() {
        return Err(invalid("empty"));
    }

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
            return Err(invalid("prefix must be 1-253 characters"));
        }
        let prefix_ok = prefix.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                && !part.starts_with('-')
                && !part.ends_with('-')
        });
        if !prefix_ok {
            return Err(invalid("prefix must be a DNS subdomain"));
        }
    }

    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid("name must be 1-63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid("name contains invalid characters"));
    }
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(invalid("name must start and end alphanumeric"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn expr(key: &str, op: Operator, values: &[&str]) -> MatchExpression {
        MatchExpression::new(key, op, values.iter().map(|v| v.to_string()).collect()).unwrap()
    }

    #[test]
    fn in_requires_value_in_set() {
        let e = expr("region", Operator::In, &["us-east", "us-west"]);
        assert!(e.matches(&labels(&[("region", "us-east")])));
        assert!(!e.matches(&labels(&[("region", "eu-west")])));
        assert!(!e.matches(&labels(&[])));
    }

    #[test]
    fn not_in_passes_when_label_absent() {
        let e = expr("region", Operator::NotIn, &["us-east"]);
        assert!(e.matches(&labels(&[])));
        assert!(e.matches(&labels(&[("region", "eu-west")])));
        assert!(!e.matches(&labels(&[("region", "us-east")])));
    }

    #[test]
    fn exists_and_does_not_exist() {
        let exists = expr("gpu", Operator::Exists, &[]);
        let absent = expr("gpu", Operator::DoesNotExist, &[]);
        let with_gpu = labels(&[("gpu", "")]);
        let without = labels(&[("cpu", "x86")]);

        assert!(exists.matches(&with_gpu));
        assert!(!exists.matches(&without));
        assert!(!absent.matches(&with_gpu));
        assert!(absent.matches(&without));
    }

    #[test]
    fn selector_is_conjunction() {
        let selector = LabelSelector::new(vec![
            expr("region", Operator::In, &["us-east"]),
            expr("tier", Operator::Exists, &[]),
        ]);
        assert!(selector.matches(&labels(&[("region", "us-east"), ("tier", "gold")])));
        assert!(!selector.matches(&labels(&[("region", "us-east")])));

        let failing = selector.first_unmatched(&labels(&[("region", "us-east")]));
        assert_eq!(failing.unwrap().key, "tier");
    }

    #[test]
    fn empty_selector_matches_everything() {
        assert!(LabelSelector::everything().matches(&labels(&[])));
        assert!(LabelSelector::everything().matches(&labels(&[("a", "b")])));
    }

    #[test]
    fn rejects_in_without_values() {
        let err = MatchExpression::new("region", Operator::In, vec![]).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidSelector(_)));
    }

    #[test]
    fn rejects_exists_with_values() {
        let err = MatchExpression::new("gpu", Operator::Exists, vec!["true".into()]).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidSelector(_)));
    }

    #[test]
    fn parses_operators() {
        assert_eq!("NotIn".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!(
            "Equals".parse::<Operator>().unwrap_err(),
            PlacementError::UnknownOperator("Equals".to_string())
        );
    }

    #[test]
    fn label_key_validation() {
        assert!(validate_label_key("region").is_ok());
        assert!(validate_label_key("topology.kubernetes.io/zone").is_ok());
        assert!(validate_label_key("app_name-1.x").is_ok());

        assert!(validate_label_key("").is_err());
        assert!(validate_label_key("-region").is_err());
        assert!(validate_label_key("region!").is_err());
        assert!(validate_label_key("/zone").is_err());
        assert!(validate_label_key("Example.com/zone").is_err());
        assert!(validate_label_key(&"a".repeat(64)).is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(
            expr("region", Operator::In, &["a", "b"]).to_string(),
            "region In (a, b)"
        );
        assert_eq!(expr("gpu", Operator::Exists, &[]).to_string(), "gpu Exists");

        let term = AffinityTerm::new(
            Some("gpu".to_string()),
            LabelSelector::new(vec![expr("gpu", Operator::Exists, &[])]),
        );
        assert_eq!(term.to_string(), "gpu [gpu Exists]");
    }
}
