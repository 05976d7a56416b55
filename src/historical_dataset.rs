use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::dataset::{DatasetFilter, GOAL_LINES, HistoricalMatch, MatchOdds, MatchRecord};
use crate::goal_minutes::{format_goal_minutes, parse_goal_minutes};

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub source: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub matches_upserted: usize,
    pub leagues: Vec<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    crate::config::default_db_path()
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            league TEXT NOT NULL,
            season TEXT NOT NULL,
            match_date TEXT NOT NULL DEFAULT '',
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NOT NULL,
            away_goals INTEGER NOT NULL,
            home_goals_ht INTEGER NULL,
            away_goals_ht INTEGER NULL,
            home_goal_minutes TEXT NOT NULL,
            away_goal_minutes TEXT NOT NULL,
            odds_home REAL NULL,
            odds_draw REAL NULL,
            odds_away REAL NULL,
            over_05 REAL NULL,
            over_15 REAL NULL,
            over_25 REAL NULL,
            over_35 REAL NULL,
            over_45 REAL NULL,
            under_05 REAL NULL,
            under_15 REAL NULL,
            under_25 REAL NULL,
            under_35 REAL NULL,
            under_45 REAL NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(league, season, match_date, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_matches_league ON matches(league);
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source TEXT NOT NULL,
            rows_read INTEGER NOT NULL,
            rows_skipped INTEGER NOT NULL,
            matches_upserted INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Writes the records inside one transaction and logs the run in `ingest_runs`.
pub fn ingest_matches(
    conn: &mut Connection,
    db_path: PathBuf,
    source: &str,
    matches: &[HistoricalMatch],
    rows_skipped: usize,
) -> Result<IngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, source, rows_read, rows_skipped, matches_upserted)
         VALUES (?1, NULL, ?2, ?3, ?4, 0)",
        params![
            started_at,
            source,
            (matches.len() + rows_skipped) as i64,
            rows_skipped as i64
        ],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    let tx = conn.transaction().context("begin ingest transaction")?;
    let mut matches_upserted = 0usize;
    for m in matches {
        upsert_match(&tx, m)?;
        matches_upserted += 1;
    }
    tx.commit().context("commit ingest transaction")?;

    conn.execute(
        "UPDATE ingest_runs SET finished_at = ?1, matches_upserted = ?2 WHERE run_id = ?3",
        params![Utc::now().to_rfc3339(), matches_upserted as i64, run_id],
    )
    .context("update ingest run")?;
    info!(source, matches_upserted, rows_skipped, "ingest finished");

    Ok(IngestSummary {
        db_path,
        source: source.to_string(),
        rows_read: matches.len() + rows_skipped,
        rows_skipped,
        matches_upserted,
        leagues: list_leagues(conn)?,
    })
}

pub fn upsert_match(conn: &Connection, m: &HistoricalMatch) -> Result<()> {
    let o = &m.odds;
    conn.execute(
        r#"
        INSERT INTO matches (
            league, season, match_date, home_team, away_team,
            home_goals, away_goals, home_goals_ht, away_goals_ht,
            home_goal_minutes, away_goal_minutes,
            odds_home, odds_draw, odds_away,
            over_05, over_15, over_25, over_35, over_45,
            under_05, under_15, under_25, under_35, under_45,
            updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11,
            ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19,
            ?20, ?21, ?22, ?23, ?24,
            ?25
        )
        ON CONFLICT(league, season, match_date, home_team, away_team) DO UPDATE SET
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            home_goals_ht = excluded.home_goals_ht,
            away_goals_ht = excluded.away_goals_ht,
            home_goal_minutes = excluded.home_goal_minutes,
            away_goal_minutes = excluded.away_goal_minutes,
            odds_home = excluded.odds_home,
            odds_draw = excluded.odds_draw,
            odds_away = excluded.odds_away,
            over_05 = excluded.over_05,
            over_15 = excluded.over_15,
            over_25 = excluded.over_25,
            over_35 = excluded.over_35,
            over_45 = excluded.over_45,
            under_05 = excluded.under_05,
            under_15 = excluded.under_15,
            under_25 = excluded.under_25,
            under_35 = excluded.under_35,
            under_45 = excluded.under_45,
            updated_at = excluded.updated_at
        "#,
        params![
            m.league.trim(),
            m.season.trim(),
            date_key(m.date),
            m.home_team.trim(),
            m.away_team.trim(),
            m.home_goals,
            m.away_goals,
            m.home_goals_ht,
            m.away_goals_ht,
            format_goal_minutes(&m.home_goal_minutes),
            format_goal_minutes(&m.away_goal_minutes),
            o.home,
            o.draw,
            o.away,
            o.over[0],
            o.over[1],
            o.over[2],
            o.over[3],
            o.over[4],
            o.under[0],
            o.under[1],
            o.under[2],
            o.under[3],
            o.under[4],
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert match")?;
    Ok(())
}

/// Loads matches accepted by `filter`, oldest first. League, seasons and the date cut are
/// pushed into SQL; team filters are applied in memory with the same case rules as
/// [`DatasetFilter::accepts`].
pub fn load_matches(conn: &Connection, filter: &DatasetFilter) -> Result<Vec<HistoricalMatch>> {
    let mut sql = String::from(
        r#"
        SELECT
            league, season, match_date, home_team, away_team,
            home_goals, away_goals, home_goals_ht, away_goals_ht,
            home_goal_minutes, away_goal_minutes,
            odds_home, odds_draw, odds_away,
            over_05, over_15, over_25, over_35, over_45,
            under_05, under_15, under_25, under_35, under_45
        FROM matches
        WHERE 1 = 1
        "#,
    );
    let mut args: Vec<SqlValue> = Vec::new();
    if let Some(league) = filter.league.as_deref() {
        sql.push_str(" AND lower(trim(league)) = ?");
        args.push(SqlValue::Text(league.trim().to_lowercase()));
    }
    if !filter.seasons.is_empty() {
        let marks = vec!["?"; filter.seasons.len()].join(", ");
        sql.push_str(&format!(" AND season IN ({marks})"));
        args.extend(
            filter
                .seasons
                .iter()
                .map(|s| SqlValue::Text(s.trim().to_string())),
        );
    }
    if let Some(before) = filter.before {
        sql.push_str(" AND match_date <> '' AND match_date < ?");
        args.push(SqlValue::Text(before.format("%Y-%m-%d").to_string()));
    }
    sql.push_str(" ORDER BY match_date ASC, league ASC, home_team ASC");

    let mut stmt = conn.prepare(&sql).context("prepare load matches query")?;
    let rows = stmt
        .query_map(params_from_iter(args), decode_row)
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        let m = row.context("decode match row")?;
        if filter.accepts(&m) {
            out.push(m);
        }
    }
    debug!(loaded = out.len(), "matches loaded from sqlite");
    Ok(out)
}

pub fn list_leagues(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT league FROM matches ORDER BY league ASC")
        .context("prepare list leagues")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query list leagues")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode league row")?);
    }
    Ok(out)
}

/// Seasons of one league, most recent first.
pub fn list_seasons(conn: &Connection, league: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT season FROM matches WHERE lower(trim(league)) = ?1 ORDER BY season DESC",
        )
        .context("prepare list seasons")?;
    let rows = stmt
        .query_map(params![league.trim().to_lowercase()], |row| {
            row.get::<_, String>(0)
        })
        .context("query list seasons")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode season row")?);
    }
    Ok(out)
}

fn decode_row(row: &Row<'_>) -> rusqlite::Result<HistoricalMatch> {
    let date_raw: String = row.get(2)?;
    let home_minutes: String = row.get(9)?;
    let away_minutes: String = row.get(10)?;
    let mut over = [None; GOAL_LINES.len()];
    let mut under = [None; GOAL_LINES.len()];
    for idx in 0..GOAL_LINES.len() {
        over[idx] = row.get::<_, Option<f64>>(14 + idx)?;
        under[idx] = row.get::<_, Option<f64>>(19 + idx)?;
    }
    Ok(HistoricalMatch::new(MatchRecord {
        league: row.get(0)?,
        season: row.get(1)?,
        date: NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").ok(),
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        home_goals: row.get(5)?,
        away_goals: row.get(6)?,
        home_goals_ht: row.get(7)?,
        away_goals_ht: row.get(8)?,
        home_goal_minutes: parse_goal_minutes(Some(&home_minutes)),
        away_goal_minutes: parse_goal_minutes(Some(&away_minutes)),
        odds: MatchOdds {
            home: row.get(11)?,
            draw: row.get(12)?,
            away: row.get(13)?,
            over,
            under,
        },
        ..MatchRecord::default()
    }))
}

/// Undated rows share the empty key so they still participate in the unique constraint.
fn date_key(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date: &str, home: &str, hg: u8) -> HistoricalMatch {
        HistoricalMatch::new(MatchRecord {
            league: "Italy Serie A".to_string(),
            season: "2023/2024".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            home_team: home.to_string(),
            away_team: "Roma".to_string(),
            home_goals: hg,
            away_goals: 1,
            home_goals_ht: Some(0),
            away_goals_ht: Some(1),
            home_goal_minutes: (0..hg).map(|i| 50 + u16::from(i)).collect(),
            away_goal_minutes: vec![12],
            odds: MatchOdds {
                home: Some(1.8),
                draw: Some(3.6),
                away: Some(4.5),
                over: [Some(1.05), Some(1.3), Some(1.9), Some(3.2), None],
                under: [None, Some(3.4), Some(1.95), Some(1.3), Some(1.1)],
            },
            ..MatchRecord::default()
        })
    }

    #[test]
    fn upsert_is_keyed_on_league_season_date_and_teams() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        upsert_match(&conn, &sample("2024-01-10", "Lazio", 1)).unwrap();
        upsert_match(&conn, &sample("2024-01-10", "Lazio", 3)).unwrap();
        upsert_match(&conn, &sample("2024-02-01", "Milan", 2)).unwrap();

        let all = load_matches(&conn, &DatasetFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        let lazio = &all[0];
        assert_eq!(lazio.home_goals, 3);
        assert_eq!(lazio.home_goal_minutes, vec![50, 51, 52]);
        assert_eq!(lazio.odds.under[4], Some(1.1));
        assert_eq!(lazio.odds.over[4], None);
        assert_eq!(lazio.half_time(), Some((0, 1)));
    }

    #[test]
    fn filter_is_pushed_down() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        upsert_match(&conn, &sample("2024-01-10", "Lazio", 1)).unwrap();
        upsert_match(&conn, &sample("2024-02-01", "Milan", 2)).unwrap();

        let filter = DatasetFilter {
            league: Some(" italy serie a ".to_string()),
            before: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..DatasetFilter::default()
        };
        let rows = load_matches(&conn, &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_team, "Lazio");

        assert_eq!(list_leagues(&conn).unwrap(), vec!["Italy Serie A"]);
        assert_eq!(list_seasons(&conn, "ITALY SERIE A").unwrap(), vec!["2023/2024"]);
    }
}
