//! Investor profile: income bracket, risk tolerance, horizon and goals.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Ordered household income bands.
///
/// Unknown or missing labels deserialize to [`IncomeBracket::Unspecified`],
/// which uses the default parameter tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum IncomeBracket {
    #[serde(rename = "Under $30,000")]
    Under30k,
    #[serde(rename = "$30,000 - $50,000")]
    From30kTo50k,
    #[serde(rename = "$50,000 - $75,000")]
    From50kTo75k,
    #[serde(rename = "$75,000 - $100,000")]
    From75kTo100k,
    #[serde(rename = "$100,000 - $150,000")]
    From100kTo150k,
    #[serde(rename = "Over $150,000")]
    Over150k,
    #[default]
    #[serde(rename = "Unspecified")]
    Unspecified,
}

impl IncomeBracket {
    pub const ALL: [IncomeBracket; 6] = [
        IncomeBracket::Under30k,
        IncomeBracket::From30kTo50k,
        IncomeBracket::From50kTo75k,
        IncomeBracket::From75kTo100k,
        IncomeBracket::From100kTo150k,
        IncomeBracket::Over150k,
    ];

    /// Display label as produced by the profile form.
    pub fn label(&self) -> &'static str {
        match self {
            IncomeBracket::Under30k => "Under $30,000",
            IncomeBracket::From30kTo50k => "$30,000 - $50,000",
            IncomeBracket::From50kTo75k => "$50,000 - $75,000",
            IncomeBracket::From75kTo100k => "$75,000 - $100,000",
            IncomeBracket::From100kTo150k => "$100,000 - $150,000",
            IncomeBracket::Over150k => "Over $150,000",
            IncomeBracket::Unspecified => "Unspecified",
        }
    }

    /// Parse a band label. Matching ignores case and whitespace, so
    /// "$30,000-$50,000" and "under $30,000" both resolve.
    pub fn parse(s: &str) -> Self {
        let key = squash(s);
        Self::ALL
            .into_iter()
            .find(|b| squash(b.label()) == key)
            .unwrap_or(IncomeBracket::Unspecified)
    }
}

impl From<Option<String>> for IncomeBracket {
    fn from(s: Option<String>) -> Self {
        s.map_or(Self::Unspecified, |s| Self::parse(&s))
    }
}

impl std::fmt::Display for IncomeBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Self-reported risk tolerance. Unset or unrecognized values are `Moderate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Self::Conservative,
            "aggressive" => Self::Aggressive,
            _ => Self::Moderate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "Conservative",
            Self::Moderate => "Moderate",
            Self::Aggressive => "Aggressive",
        }
    }
}

impl From<Option<String>> for RiskTolerance {
    fn from(s: Option<String>) -> Self {
        s.as_deref().map_or(Self::Moderate, Self::parse)
    }
}

/// Coarse classification of the free-form horizon bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Short,
    Medium,
    Long,
}

impl Horizon {
    const SHORT_MARKERS: [&'static str; 5] = ["1-3", "3-5", "under 1", "< 1", "less than 1"];

    /// Classify a horizon string such as "1-3 years" or "10+ years".
    /// Missing input is treated as a medium (roughly five year) horizon.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Medium;
        };
        let lower = raw.to_lowercase();
        if Self::SHORT_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::Short
        } else if lower.contains("10+") {
            Self::Long
        } else {
            Self::Medium
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Self::Short)
    }
}

/// User investment context. Owned by the caller and never mutated here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub income_bracket: IncomeBracket,

    #[serde(default)]
    pub risk_tolerance: RiskTolerance,

    /// Free-form bucket, e.g. "3-5 years"
    #[serde(default)]
    pub investment_horizon: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub investment_goals: Vec<String>,

    /// Total portfolio value in USD, used for the small-account rules
    #[serde(default)]
    pub portfolio_value: Option<Decimal>,
}

impl Profile {
    pub fn horizon(&self) -> Horizon {
        Horizon::classify(self.investment_horizon.as_deref())
    }

    /// True when any goal contains one of `needles` (case-insensitive).
    pub fn has_goal_matching(&self, needles: &[&str]) -> bool {
        self.investment_goals.iter().any(|goal| {
            let goal = goal.to_lowercase();
            needles.iter().any(|n| goal.contains(&n.to_lowercase()))
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_parse_is_lenient() {
        assert_eq!(IncomeBracket::parse("Under $30,000"), IncomeBracket::Under30k);
        assert_eq!(IncomeBracket::parse("  under $30,000 "), IncomeBracket::Under30k);
        assert_eq!(IncomeBracket::parse("$30,000-$50,000"), IncomeBracket::From30kTo50k);
        assert_eq!(IncomeBracket::parse("Over $150,000"), IncomeBracket::Over150k);
        assert_eq!(IncomeBracket::parse("lots"), IncomeBracket::Unspecified);
    }

    #[test]
    fn test_horizon_classification() {
        assert_eq!(Horizon::classify(Some("1-3 years")), Horizon::Short);
        assert_eq!(Horizon::classify(Some("3-5 years")), Horizon::Short);
        assert_eq!(Horizon::classify(Some("5-10 years")), Horizon::Medium);
        assert_eq!(Horizon::classify(Some("10+ years")), Horizon::Long);
        assert_eq!(Horizon::classify(None), Horizon::Medium);
    }

    #[test]
    fn test_profile_deserialize_defaults() {
        let profile: Profile = serde_json::from_str(
            r#"{"incomeBracket": "Somewhere", "riskTolerance": "AGGRESSIVE"}"#,
        )
        .unwrap();

        assert_eq!(profile.income_bracket, IncomeBracket::Unspecified);
        assert_eq!(profile.risk_tolerance, RiskTolerance::Aggressive);
        assert_eq!(profile.horizon(), Horizon::Medium);
        assert!(profile.investment_goals.is_empty());
    }

    #[test]
    fn test_profile_null_fields_use_defaults() {
        let profile: Profile = serde_json::from_str(
            r#"{
                "incomeBracket": null,
                "riskTolerance": null,
                "investmentHorizon": null,
                "investmentGoals": null,
                "portfolioValue": null
            }"#,
        )
        .unwrap();

        assert_eq!(profile.income_bracket, IncomeBracket::Unspecified);
        assert_eq!(profile.risk_tolerance, RiskTolerance::Moderate);
        assert_eq!(profile.horizon(), Horizon::Medium);
        assert!(profile.investment_goals.is_empty());
        assert!(profile.portfolio_value.is_none());
    }

    #[test]
    fn test_goal_matching_ignores_case() {
        let profile = Profile {
            investment_goals: vec!["Wealth Building".to_string()],
            ..Default::default()
        };
        assert!(profile.has_goal_matching(&["wealth"]));
        assert!(!profile.has_goal_matching(&["retire"]));
    }
}
