use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::projection::Side;

/// Odds-derived bucket used to group comparable matches.
///
/// Variants are declared in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "SuperCompetitive")]
    SuperCompetitive,
    #[serde(rename = "Home-StrongFavorite")]
    HomeStrongFavorite,
    #[serde(rename = "Home-MediumFavorite")]
    HomeMediumFavorite,
    #[serde(rename = "Home-SmallFavorite")]
    HomeSmallFavorite,
    #[serde(rename = "Away-StrongFavorite")]
    AwayStrongFavorite,
    #[serde(rename = "Away-MediumFavorite")]
    AwayMediumFavorite,
    #[serde(rename = "Away-SmallFavorite")]
    AwaySmallFavorite,
    #[serde(rename = "Other")]
    Other,
}

impl Label {
    pub const ALL: [Label; 8] = [
        Label::SuperCompetitive,
        Label::HomeStrongFavorite,
        Label::HomeMediumFavorite,
        Label::HomeSmallFavorite,
        Label::AwayStrongFavorite,
        Label::AwayMediumFavorite,
        Label::AwaySmallFavorite,
        Label::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Label::SuperCompetitive => "SuperCompetitive",
            Label::HomeStrongFavorite => "Home-StrongFavorite",
            Label::HomeMediumFavorite => "Home-MediumFavorite",
            Label::HomeSmallFavorite => "Home-SmallFavorite",
            Label::AwayStrongFavorite => "Away-StrongFavorite",
            Label::AwayMediumFavorite => "Away-MediumFavorite",
            Label::AwaySmallFavorite => "Away-SmallFavorite",
            Label::Other => "Other",
        }
    }

    pub fn favored_side(self) -> Option<Side> {
        match self {
            Label::HomeStrongFavorite | Label::HomeMediumFavorite | Label::HomeSmallFavorite => {
                Some(Side::Home)
            }
            Label::AwayStrongFavorite | Label::AwayMediumFavorite | Label::AwaySmallFavorite => {
                Some(Side::Away)
            }
            Label::SuperCompetitive | Label::Other => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Label {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Label::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| anyhow!("unknown label {key:?}"))
    }
}

/// Maps pre-match decimal odds to a [`Label`].
///
/// Home tiers are always checked before away tiers; a match only reaches the away tiers when
/// the home price is above 3.0.
pub fn classify(home: Option<f64>, away: Option<f64>) -> Label {
    let (Some(h), Some(a)) = (home, away) else {
        return Label::Other;
    };
    if !h.is_finite() || !a.is_finite() {
        return Label::Other;
    }

    if h <= 3.0 && a <= 3.0 {
        return Label::SuperCompetitive;
    }

    if h < 1.5 {
        return Label::HomeStrongFavorite;
    } else if (1.5..=2.0).contains(&h) {
        return Label::HomeMediumFavorite;
    } else if h > 2.0 && h <= 3.0 {
        return Label::HomeSmallFavorite;
    }

    if a < 1.5 {
        Label::AwayStrongFavorite
    } else if (1.5..=2.0).contains(&a) {
        Label::AwayMediumFavorite
    } else if a > 2.0 && a <= 3.0 {
        Label::AwaySmallFavorite
    } else {
        Label::Other
    }
}

/// Classifies raw text odds as exported by the data provider.
pub fn classify_raw(home: &str, away: &str) -> Label {
    classify(parse_decimal_odds(home), parse_decimal_odds(away))
}

/// Parses a decimal price, accepting a comma as the decimal separator.
pub fn parse_decimal_odds(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let v = s.replace(',', ".").parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_matches_documented_tiers() {
        assert_eq!(classify(Some(2.5), Some(2.9)), Label::SuperCompetitive);
        assert_eq!(classify(Some(3.0), Some(3.0)), Label::SuperCompetitive);
        assert_eq!(classify(Some(1.3), Some(9.0)), Label::HomeStrongFavorite);
        assert_eq!(classify(Some(1.5), Some(6.0)), Label::HomeMediumFavorite);
        assert_eq!(classify(Some(2.0), Some(4.0)), Label::HomeMediumFavorite);
        assert_eq!(classify(Some(2.01), Some(3.4)), Label::HomeSmallFavorite);
        assert_eq!(classify(Some(8.0), Some(1.4)), Label::AwayStrongFavorite);
        assert_eq!(classify(Some(5.0), Some(1.5)), Label::AwayMediumFavorite);
        assert_eq!(classify(Some(3.2), Some(2.5)), Label::AwaySmallFavorite);
        assert_eq!(classify(Some(3.5), Some(3.5)), Label::Other);
    }

    #[test]
    fn missing_or_nan_odds_are_other() {
        assert_eq!(classify(None, Some(1.2)), Label::Other);
        assert_eq!(classify(Some(1.2), None), Label::Other);
        assert_eq!(classify(Some(f64::NAN), Some(2.0)), Label::Other);
        assert_eq!(classify(Some(f64::INFINITY), Some(2.0)), Label::Other);
        assert_eq!(classify_raw("abc", "2,1"), Label::Other);
    }

    #[test]
    fn comma_decimals_parse() {
        assert_eq!(parse_decimal_odds("1,85"), Some(1.85));
        assert_eq!(parse_decimal_odds(" 2.10 "), Some(2.10));
        assert_eq!(parse_decimal_odds(""), None);
        assert_eq!(classify_raw("1,4", "7,5"), Label::HomeStrongFavorite);
    }

    #[test]
    fn labels_round_trip_through_display() {
        for label in Label::ALL {
            assert_eq!(label.to_string().parse::<Label>().unwrap(), label);
        }
        assert!("Nope".parse::<Label>().is_err());
    }

    #[test]
    fn favored_side_follows_prefix() {
        assert_eq!(Label::HomeSmallFavorite.favored_side(), Some(Side::Home));
        assert_eq!(Label::AwayStrongFavorite.favored_side(), Some(Side::Away));
        assert_eq!(Label::SuperCompetitive.favored_side(), None);
    }
}
