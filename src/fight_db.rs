//! SQLite-backed fight store: fighters, fights with per-side bout stats, point-in-time
//! snapshots (JSON blobs) and issued predictions for later accuracy tracking.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::engine::Prediction;
use crate::model::{
    BoutStats, CareerTotals, Fight, FightId, FightRecord, FightStatus, Fighter, FighterId,
    ResultMethod,
};
use crate::snapshot::FighterSnapshot;
use crate::store::{FightDataSource, MemoryStore};

pub struct FightDb {
    conn: Connection,
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS fighters (
            fighter_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            nickname TEXT NULL,
            date_of_birth TEXT NULL,
            height_cm REAL NULL,
            reach_cm REAL NULL,
            weight_class TEXT NULL,
            career_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fights (
            fight_id INTEGER PRIMARY KEY,
            fight_date TEXT NOT NULL,
            fighter_a INTEGER NOT NULL,
            fighter_b INTEGER NOT NULL,
            weight_class TEXT NULL,
            is_title_fight INTEGER NOT NULL,
            scheduled_rounds INTEGER NOT NULL,
            status TEXT NOT NULL,
            winner_id INTEGER NULL,
            method TEXT NULL,
            is_draw INTEGER NOT NULL,
            is_no_contest INTEGER NOT NULL,
            ending_round INTEGER NULL,
            ending_time TEXT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_fights_date ON fights(fight_date);
        CREATE INDEX IF NOT EXISTS idx_fights_status ON fights(status);
        CREATE INDEX IF NOT EXISTS idx_fights_a ON fights(fighter_a);
        CREATE INDEX IF NOT EXISTS idx_fights_b ON fights(fighter_b);

        CREATE TABLE IF NOT EXISTS bout_stats (
            fight_id INTEGER NOT NULL,
            fighter_id INTEGER NOT NULL,
            sig_strikes_landed INTEGER NOT NULL,
            sig_strikes_attempted INTEGER NOT NULL,
            takedowns_landed INTEGER NOT NULL,
            takedowns_attempted INTEGER NOT NULL,
            submission_attempts INTEGER NOT NULL,
            PRIMARY KEY (fight_id, fighter_id)
        );

        CREATE TABLE IF NOT EXISTS snapshots (
            fighter_id INTEGER NOT NULL,
            fight_id INTEGER NOT NULL,
            as_of TEXT NOT NULL,
            snapshot_json TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (fighter_id, fight_id)
        );

        CREATE TABLE IF NOT EXISTS predictions (
            prediction_id INTEGER PRIMARY KEY AUTOINCREMENT,
            fight_id INTEGER NULL,
            as_of TEXT NOT NULL,
            fighter_a INTEGER NOT NULL,
            fighter_b INTEGER NOT NULL,
            predicted_winner INTEGER NOT NULL,
            probability_a REAL NOT NULL,
            confidence REAL NOT NULL,
            basis TEXT NOT NULL,
            prediction_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_fight ON predictions(fight_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

const FIGHT_COLUMNS: &str = r#"
    f.fight_id, f.fight_date, f.fighter_a, f.fighter_b, f.weight_class,
    f.is_title_fight, f.scheduled_rounds, f.status, f.winner_id, f.method,
    f.is_draw, f.is_no_contest, f.ending_round, f.ending_time,
    sa.sig_strikes_landed, sa.sig_strikes_attempted, sa.takedowns_landed,
    sa.takedowns_attempted, sa.submission_attempts,
    sb.sig_strikes_landed, sb.sig_strikes_attempted, sb.takedowns_landed,
    sb.takedowns_attempted, sb.submission_attempts
    FROM fights f
    LEFT JOIN bout_stats sa ON sa.fight_id = f.fight_id AND sa.fighter_id = f.fighter_a
    LEFT JOIN bout_stats sb ON sb.fight_id = f.fight_id AND sb.fighter_id = f.fighter_b
"#;

/// Raw column values; dates and enums are parsed outside the row callback.
struct FightRow {
    id: u64,
    date: String,
    fighter_a: u64,
    fighter_b: u64,
    weight_class: Option<String>,
    is_title_fight: bool,
    scheduled_rounds: u8,
    status: String,
    winner: Option<u64>,
    method: Option<String>,
    is_draw: bool,
    is_no_contest: bool,
    ending_round: Option<u8>,
    ending_time: Option<String>,
    stats_a: Option<BoutStats>,
    stats_b: Option<BoutStats>,
}

fn read_fight_row(row: &Row<'_>) -> rusqlite::Result<FightRow> {
    Ok(FightRow {
        id: row.get::<_, u64>(0)?,
        date: row.get(1)?,
        fighter_a: row.get::<_, u64>(2)?,
        fighter_b: row.get::<_, u64>(3)?,
        weight_class: row.get(4)?,
        is_title_fight: row.get::<_, i64>(5)? != 0,
        scheduled_rounds: row.get::<_, u8>(6)?,
        status: row.get(7)?,
        winner: row.get::<_, Option<u64>>(8)?,
        method: row.get(9)?,
        is_draw: row.get::<_, i64>(10)? != 0,
        is_no_contest: row.get::<_, i64>(11)? != 0,
        ending_round: row.get::<_, Option<u8>>(12)?,
        ending_time: row.get(13)?,
        stats_a: read_bout_stats(row, 14)?,
        stats_b: read_bout_stats(row, 19)?,
    })
}

fn read_bout_stats(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<BoutStats>> {
    let Some(sig_strikes_landed) = row.get::<_, Option<u32>>(start)? else {
        return Ok(None);
    };
    Ok(Some(BoutStats {
        sig_strikes_landed,
        sig_strikes_attempted: row.get(start + 1)?,
        takedowns_landed: row.get(start + 2)?,
        takedowns_attempted: row.get(start + 3)?,
        submission_attempts: row.get(start + 4)?,
    }))
}

impl TryFrom<FightRow> for Fight {
    type Error = anyhow::Error;

    fn try_from(r: FightRow) -> Result<Self> {
        Ok(Fight {
            id: r.id,
            date: parse_date(&r.date).with_context(|| format!("fight {} date", r.id))?,
            fighter_a: r.fighter_a,
            fighter_b: r.fighter_b,
            weight_class: r.weight_class,
            is_title_fight: r.is_title_fight,
            scheduled_rounds: r.scheduled_rounds,
            status: parse_status(&r.status).with_context(|| format!("fight {} status", r.id))?,
            winner: r.winner,
            method: r.method.as_deref().map(ResultMethod::parse),
            is_draw: r.is_draw,
            is_no_contest: r.is_no_contest,
            ending_round: r.ending_round,
            ending_time: r.ending_time,
            stats_a: r.stats_a,
            stats_b: r.stats_b,
        })
    }
}

impl FightDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn upsert_fighter(&self, fighter: &Fighter) -> Result<()> {
        upsert_fighter(&self.conn, fighter)
    }

    pub fn upsert_fight(&mut self, fight: &Fight) -> Result<()> {
        let tx = self.conn.transaction().context("begin fight upsert")?;
        upsert_fight(&tx, fight)?;
        tx.commit().context("commit fight upsert")?;
        Ok(())
    }

    /// Loads a whole dataset in one transaction.
    pub fn import(&mut self, fighters: &[Fighter], fights: &[Fight]) -> Result<usize> {
        let tx = self.conn.transaction().context("begin import")?;
        for fighter in fighters {
            upsert_fighter(&tx, fighter)?;
        }
        for fight in fights {
            upsert_fight(&tx, fight)?;
        }
        tx.commit().context("commit import")?;
        Ok(fighters.len() + fights.len())
    }

    /// Stores a snapshot keyed by (fighter, fight). Snapshots not tied to a fight are
    /// skipped and reported as `false`.
    pub fn save_snapshot(&self, snapshot: &FighterSnapshot) -> Result<bool> {
        save_snapshot(&self.conn, snapshot)
    }

    pub fn save_snapshots(&mut self, snapshots: &[FighterSnapshot]) -> Result<usize> {
        let tx = self.conn.transaction().context("begin snapshot backfill")?;
        let mut saved = 0;
        for snap in snapshots {
            if save_snapshot(&tx, snap)? {
                saved += 1;
            }
        }
        tx.commit().context("commit snapshot backfill")?;
        Ok(saved)
    }

    pub fn save_prediction(&self, prediction: &Prediction) -> Result<i64> {
        let json = serde_json::to_string(prediction).context("serialize prediction")?;
        self.conn
            .execute(
                r#"
                INSERT INTO predictions (
                    fight_id, as_of, fighter_a, fighter_b, predicted_winner,
                    probability_a, confidence, basis, prediction_json, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    prediction.fight_id.map(|id| id as i64),
                    prediction.as_of.to_string(),
                    prediction.fighter_a.id as i64,
                    prediction.fighter_b.id as i64,
                    prediction.winner_id as i64,
                    prediction.probability_a,
                    prediction.confidence,
                    format!("{:?}", prediction.basis),
                    json,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert prediction")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Hit rate of stored predictions whose fight has since been decided.
    pub fn prediction_accuracy(&self) -> Result<AccuracySummary> {
        let (stored, resolved, correct) = self
            .conn
            .query_row(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM predictions),
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN p.predicted_winner = f.winner_id THEN 1 ELSE 0 END), 0)
                FROM predictions p
                JOIN fights f ON f.fight_id = p.fight_id
                WHERE f.status = 'completed'
                  AND f.winner_id IS NOT NULL
                  AND f.is_draw = 0
                  AND f.is_no_contest = 0
                "#,
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .context("query prediction accuracy")?;
        Ok(AccuracySummary {
            stored: stored as usize,
            resolved: resolved as usize,
            correct: correct as usize,
        })
    }

    pub fn all_fighters(&self) -> Result<Vec<Fighter>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT fighter_id, name, nickname, date_of_birth, height_cm, reach_cm,
                       weight_class, career_json
                FROM fighters
                ORDER BY fighter_id ASC
                "#,
            )
            .context("prepare load fighters query")?;
        let rows = stmt
            .query_map([], read_fighter_row)
            .context("query load fighters")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(Fighter::try_from(row.context("decode fighter row")?)?);
        }
        Ok(out)
    }

    pub fn all_fights(&self) -> Result<Vec<Fight>> {
        self.load_fights("1 = 1", params![], None)
    }

    /// Copies every fighter, fight and snapshot into memory, for parallel readers.
    pub fn load_memory_store(&self) -> Result<MemoryStore> {
        let mut store = MemoryStore::new();
        for fighter in self.all_fighters()? {
            store.insert_fighter(fighter);
        }
        for fight in self.all_fights()? {
            store.insert_fight(fight);
        }
        let mut stmt = self
            .conn
            .prepare("SELECT snapshot_json FROM snapshots")
            .context("prepare load snapshots query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query load snapshots")?;
        for row in rows {
            let raw = row.context("decode snapshot row")?;
            let snap: FighterSnapshot =
                serde_json::from_str(&raw).context("parse stored snapshot")?;
            store.insert_snapshot(snap);
        }
        Ok(store)
    }

    fn load_fights(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
        limit: Option<usize>,
    ) -> Result<Vec<Fight>> {
        let limit_clause = limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default();
        let sql = format!(
            "SELECT {FIGHT_COLUMNS} WHERE {filter} ORDER BY f.fight_date ASC, f.fight_id ASC{limit_clause}"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare load fights query")?;
        let rows = stmt
            .query_map(args, read_fight_row)
            .context("query load fights")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(Fight::try_from(row.context("decode fight row")?)?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccuracySummary {
    pub stored: usize,
    pub resolved: usize,
    pub correct: usize,
}

impl AccuracySummary {
    pub fn hit_rate(&self) -> Option<f64> {
        (self.resolved > 0).then(|| self.correct as f64 / self.resolved as f64)
    }
}

impl FightDataSource for FightDb {
    fn fight(&self, id: FightId) -> Result<Option<Fight>> {
        Ok(self
            .load_fights("f.fight_id = ?1", params![id as i64], Some(1))?
            .into_iter()
            .next())
    }

    fn fighter(&self, id: FighterId) -> Result<Option<Fighter>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT fighter_id, name, nickname, date_of_birth, height_cm, reach_cm,
                       weight_class, career_json
                FROM fighters WHERE fighter_id = ?1
                "#,
                params![id as i64],
                read_fighter_row,
            )
            .optional()
            .context("query fighter")?;
        row.map(Fighter::try_from).transpose()
    }

    fn fighter_history(&self, id: FighterId) -> Result<Vec<FightRecord>> {
        let fights = self.load_fights(
            "(f.fighter_a = ?1 OR f.fighter_b = ?1) AND f.status = 'completed'",
            params![id as i64],
            None,
        )?;
        Ok(fights.iter().filter_map(|f| f.record_for(id)).collect())
    }

    fn snapshot(&self, fighter: FighterId, fight: FightId) -> Result<Option<FighterSnapshot>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot_json FROM snapshots WHERE fighter_id = ?1 AND fight_id = ?2",
                params![fighter as i64, fight as i64],
                |row| row.get(0),
            )
            .optional()
            .context("query snapshot")?;
        raw.map(|json| serde_json::from_str(&json).context("parse stored snapshot"))
            .transpose()
    }

    fn upcoming_fights(&self, limit: usize) -> Result<Vec<Fight>> {
        self.load_fights("f.status = 'scheduled'", params![], Some(limit))
    }

    fn completed_fights(&self) -> Result<Vec<Fight>> {
        self.load_fights("f.status = 'completed'", params![], None)
    }
}

struct FighterRow {
    id: u64,
    name: String,
    nickname: Option<String>,
    date_of_birth: Option<String>,
    height_cm: Option<f64>,
    reach_cm: Option<f64>,
    weight_class: Option<String>,
    career_json: String,
}

fn read_fighter_row(row: &Row<'_>) -> rusqlite::Result<FighterRow> {
    Ok(FighterRow {
        id: row.get::<_, u64>(0)?,
        name: row.get(1)?,
        nickname: row.get(2)?,
        date_of_birth: row.get(3)?,
        height_cm: row.get(4)?,
        reach_cm: row.get(5)?,
        weight_class: row.get(6)?,
        career_json: row.get(7)?,
    })
}

impl TryFrom<FighterRow> for Fighter {
    type Error = anyhow::Error;

    fn try_from(r: FighterRow) -> Result<Self> {
        let career: CareerTotals = serde_json::from_str(&r.career_json)
            .with_context(|| format!("fighter {} career totals", r.id))?;
        let date_of_birth = r
            .date_of_birth
            .as_deref()
            .map(parse_date)
            .transpose()
            .with_context(|| format!("fighter {} date of birth", r.id))?;
        Ok(Fighter {
            id: r.id,
            name: r.name,
            nickname: r.nickname,
            date_of_birth,
            height_cm: r.height_cm,
            reach_cm: r.reach_cm,
            weight_class: r.weight_class,
            career,
        })
    }
}

fn upsert_fighter(conn: &Connection, f: &Fighter) -> Result<()> {
    let career = serde_json::to_string(&f.career).context("serialize career totals")?;
    conn.execute(
        r#"
        INSERT INTO fighters (
            fighter_id, name, nickname, date_of_birth, height_cm, reach_cm,
            weight_class, career_json, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(fighter_id) DO UPDATE SET
            name = excluded.name,
            nickname = excluded.nickname,
            date_of_birth = excluded.date_of_birth,
            height_cm = excluded.height_cm,
            reach_cm = excluded.reach_cm,
            weight_class = excluded.weight_class,
            career_json = excluded.career_json,
            updated_at = excluded.updated_at
        "#,
        params![
            f.id as i64,
            f.name,
            f.nickname,
            f.date_of_birth.map(|d| d.to_string()),
            f.height_cm,
            f.reach_cm,
            f.weight_class,
            career,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert fighter")?;
    Ok(())
}

fn upsert_fight(conn: &Connection, f: &Fight) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO fights (
            fight_id, fight_date, fighter_a, fighter_b, weight_class,
            is_title_fight, scheduled_rounds, status, winner_id, method,
            is_draw, is_no_contest, ending_round, ending_time, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15
        )
        ON CONFLICT(fight_id) DO UPDATE SET
            fight_date = excluded.fight_date,
            fighter_a = excluded.fighter_a,
            fighter_b = excluded.fighter_b,
            weight_class = excluded.weight_class,
            is_title_fight = excluded.is_title_fight,
            scheduled_rounds = excluded.scheduled_rounds,
            status = excluded.status,
            winner_id = excluded.winner_id,
            method = excluded.method,
            is_draw = excluded.is_draw,
            is_no_contest = excluded.is_no_contest,
            ending_round = excluded.ending_round,
            ending_time = excluded.ending_time,
            updated_at = excluded.updated_at
        "#,
        params![
            f.id as i64,
            f.date.to_string(),
            f.fighter_a as i64,
            f.fighter_b as i64,
            f.weight_class,
            bool_to_i64(f.is_title_fight),
            i64::from(f.scheduled_rounds),
            status_str(f.status),
            f.winner.map(|w| w as i64),
            f.method.map(ResultMethod::label),
            bool_to_i64(f.is_draw),
            bool_to_i64(f.is_no_contest),
            f.ending_round.map(i64::from),
            f.ending_time,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert fight")?;

    conn.execute(
        "DELETE FROM bout_stats WHERE fight_id = ?1",
        params![f.id as i64],
    )
    .context("clear bout stats")?;
    for (fighter, stats) in [(f.fighter_a, f.stats_a), (f.fighter_b, f.stats_b)] {
        let Some(s) = stats else {
            continue;
        };
        conn.execute(
            r#"
            INSERT INTO bout_stats (
                fight_id, fighter_id, sig_strikes_landed, sig_strikes_attempted,
                takedowns_landed, takedowns_attempted, submission_attempts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                f.id as i64,
                fighter as i64,
                s.sig_strikes_landed,
                s.sig_strikes_attempted,
                s.takedowns_landed,
                s.takedowns_attempted,
                s.submission_attempts,
            ],
        )
        .context("insert bout stats")?;
    }
    Ok(())
}

fn save_snapshot(conn: &Connection, snap: &FighterSnapshot) -> Result<bool> {
    let Some(fight_id) = snap.fight_id else {
        return Ok(false);
    };
    let json = serde_json::to_string(snap).context("serialize snapshot")?;
    conn.execute(
        r#"
        INSERT INTO snapshots (fighter_id, fight_id, as_of, snapshot_json, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(fighter_id, fight_id) DO UPDATE SET
            as_of = excluded.as_of,
            snapshot_json = excluded.snapshot_json,
            updated_at = excluded.updated_at
        "#,
        params![
            snap.fighter_id as i64,
            fight_id as i64,
            snap.as_of.to_string(),
            json,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert snapshot")?;
    Ok(true)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").with_context(|| format!("bad date '{raw}'"))
}

fn status_str(status: FightStatus) -> &'static str {
    match status {
        FightStatus::Scheduled => "scheduled",
        FightStatus::Completed => "completed",
        FightStatus::Cancelled => "cancelled",
    }
}

fn parse_status(raw: &str) -> Result<FightStatus> {
    match raw {
        "scheduled" => Ok(FightStatus::Scheduled),
        "completed" => Ok(FightStatus::Completed),
        "cancelled" => Ok(FightStatus::Cancelled),
        other => Err(anyhow!("unknown fight status '{other}'")),
    }
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
