use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use tracing::{debug, warn};

use crate::dataset::{GOAL_LINES, HistoricalMatch, MatchOdds, MatchRecord};
use crate::goal_minutes::parse_goal_minutes;
use crate::label::parse_decimal_odds;

/// Provider column names for the over/under prices, ordered like [`GOAL_LINES`].
const OVER_COLUMNS: [&str; GOAL_LINES.len()] = ["cotao0", "cotao1", "cotao", "cotao3", "cotao4"];
const UNDER_COLUMNS: [&str; GOAL_LINES.len()] = ["cotau0", "cotau1", "cotau", "cotau3", "cotau4"];

#[derive(Debug, Default)]
pub struct ParquetLoad {
    pub matches: Vec<HistoricalMatch>,
    /// Rows without both team names or a full-time score.
    pub skipped: usize,
}

/// Reads a provider parquet export. `league_hint` fills records whose `country` column is
/// empty or missing (the export is usually one file per league).
pub fn load_parquet(path: &Path, league_hint: Option<&str>) -> Result<ParquetLoad> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader matches")?;
    let iter = reader.get_row_iter(None).context("iterate match rows")?;

    let mut out = ParquetLoad::default();
    let mut unreadable = 0usize;
    for row in iter {
        let Ok(row) = row else {
            unreadable += 1;
            continue;
        };
        let cells: HashMap<String, String> = row
            .get_column_iter()
            .filter_map(|(name, field)| Some((name.to_ascii_lowercase(), field_text(field)?)))
            .collect();
        match match_from_columns(&cells, league_hint) {
            Some(m) => out.matches.push(m),
            None => out.skipped += 1,
        }
    }
    if unreadable > 0 {
        warn!(unreadable, path = %path.display(), "parquet rows failed to decode");
    }
    out.skipped += unreadable;
    debug!(
        loaded = out.matches.len(),
        skipped = out.skipped,
        "parquet export read"
    );
    Ok(out)
}

/// Builds one record from a row keyed by lower-case provider column names.
pub fn match_from_columns(
    cells: &HashMap<String, String>,
    league_hint: Option<&str>,
) -> Option<HistoricalMatch> {
    let text = |key: &str| cells.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
    let odds = |key: &str| text(key).and_then(parse_decimal_odds);

    let home_team = text("txtechipa1")?.to_string();
    let away_team = text("txtechipa2")?.to_string();
    let home_goals = text("scor1").and_then(parse_goal_count)?;
    let away_goals = text("scor2").and_then(parse_goal_count)?;

    let league = text("country")
        .or(league_hint.map(str::trim))
        .unwrap_or_default()
        .to_string();

    let mut over = [None; GOAL_LINES.len()];
    let mut under = [None; GOAL_LINES.len()];
    for idx in 0..GOAL_LINES.len() {
        over[idx] = odds(OVER_COLUMNS[idx]);
        under[idx] = odds(UNDER_COLUMNS[idx]);
    }

    Some(HistoricalMatch::new(MatchRecord {
        league,
        season: text("sezonul").unwrap_or_default().to_string(),
        date: text("datameci").and_then(parse_date),
        home_team,
        away_team,
        home_goals,
        away_goals,
        home_goals_ht: text("scorp1").and_then(parse_goal_count),
        away_goals_ht: text("scorp2").and_then(parse_goal_count),
        home_goal_minutes: parse_goal_minutes(text("mgolh")),
        away_goal_minutes: parse_goal_minutes(text("mgola")),
        odds: MatchOdds {
            home: odds("cotaa"),
            draw: odds("cotae"),
            away: odds("cotad"),
            over,
            under,
        },
        ..MatchRecord::default()
    }))
}

fn field_text(field: &Field) -> Option<String> {
    let text = match field {
        Field::Null => return None,
        Field::Bool(v) => v.to_string(),
        Field::Byte(v) => v.to_string(),
        Field::Short(v) => v.to_string(),
        Field::Int(v) => v.to_string(),
        Field::Long(v) => v.to_string(),
        Field::UByte(v) => v.to_string(),
        Field::UShort(v) => v.to_string(),
        Field::UInt(v) => v.to_string(),
        Field::ULong(v) => v.to_string(),
        Field::Float(v) => v.to_string(),
        Field::Double(v) => v.to_string(),
        Field::Str(v) => v.clone(),
        Field::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)?
            .checked_add_days(Days::new(u64::try_from(*days).ok()?))?
            .format("%Y-%m-%d")
            .to_string(),
        Field::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)?
            .date_naive()
            .format("%Y-%m-%d")
            .to_string(),
        Field::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)?
            .date_naive()
            .format("%Y-%m-%d")
            .to_string(),
        _ => return None,
    };
    Some(text)
}

/// Accepts `"2"`, `"2.0"` and `"2,0"`; anything negative or above 255 is rejected.
fn parse_goal_count(raw: &str) -> Option<u8> {
    let value = raw.trim().replace(',', ".").parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 || value > f64::from(u8::MAX) {
        return None;
    }
    Some(value as u8)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%d/%m/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn maps_provider_columns() {
        let cells = row(&[
            ("country", "Italy Serie A"),
            ("sezonul", "2023/2024"),
            ("datameci", "2024-03-02 00:00:00"),
            ("txtechipa1", "Lazio"),
            ("txtechipa2", "Roma"),
            ("scor1", "2.0"),
            ("scor2", "1"),
            ("scorp1", "1"),
            ("scorp2", "0"),
            ("cotaa", "2,10"),
            ("cotae", "3.3"),
            ("cotad", "3.6"),
            ("cotao", "1.95"),
            ("cotau", "1,85"),
            ("mgolh", "12;77"),
            ("mgola", "58"),
        ]);
        let m = match_from_columns(&cells, None).unwrap();
        assert_eq!(m.league, "Italy Serie A");
        assert_eq!(m.date, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!((m.home_goals, m.away_goals), (2, 1));
        assert_eq!(m.half_time(), Some((1, 0)));
        assert_eq!(m.odds.home, Some(2.10));
        assert_eq!(m.odds.over_line(2.5), Some(1.95));
        assert_eq!(m.odds.under_line(2.5), Some(1.85));
        assert_eq!(m.odds.over_line(0.5), None);
        assert_eq!(m.home_goal_minutes, vec![12, 77]);
    }

    #[test]
    fn rows_without_teams_or_score_are_rejected() {
        let no_score = row(&[("txtechipa1", "A"), ("txtechipa2", "B"), ("scor1", "1")]);
        assert!(match_from_columns(&no_score, None).is_none());
        let no_team = row(&[("txtechipa1", " "), ("txtechipa2", "B"), ("scor1", "1"), ("scor2", "0")]);
        assert!(match_from_columns(&no_team, None).is_none());
    }

    #[test]
    fn league_hint_fills_missing_country() {
        let cells = row(&[("txtechipa1", "A"), ("txtechipa2", "B"), ("scor1", "0"), ("scor2", "0")]);
        let m = match_from_columns(&cells, Some("England Premier League")).unwrap();
        assert_eq!(m.league, "England Premier League");
        assert!(m.date.is_none());
    }

    #[test]
    fn date_fields_render_as_iso_days() {
        assert_eq!(field_text(&Field::Date(19_000)).as_deref(), Some("2022-01-08"));
        assert_eq!(field_text(&Field::Null), None);
        assert_eq!(field_text(&Field::Str("x".into())).as_deref(), Some("x"));
    }
}
