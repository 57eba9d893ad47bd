mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::error::{StoreError, MAX_ID};
use crate::models::*;

type StoreResult<T> = std::result::Result<T, StoreError>;

const REGISTRATION_COLUMNS: &str =
    "id, participant_id, hackathon_id, team_id, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, hackathon_id, lead_id, created_at, updated_at";
const PARTICIPANT_COLUMNS: &str = "id, external_id, name, email, created_at";

/// Shared handle to the entity store.
///
/// Cloning is cheap; every clone talks to the same connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "hackathon-registry")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("registry.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    /// Round-trip a trivial query to prove the connection is usable.
    pub fn ping(&self) -> StoreResult<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Run `f` as one atomic unit of work.
    ///
    /// The closure runs inside an immediate transaction while holding the
    /// connection, so no other store operation can interleave with it. The
    /// transaction commits only when `f` returns `Ok`.
    pub fn atomically<T, E>(
        &self,
        f: impl FnOnce(&StoreTx<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let value = f(&StoreTx { conn: &tx })?;

        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    // ============================================================
    // Participant operations
    // ============================================================

    pub fn create_participant(&self, input: CreateParticipantInput) -> StoreResult<Participant> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO participants (external_id, name, email, created_at) VALUES (?, ?, ?, ?)",
            (&input.external_id, &input.name, &input.email, now.to_rfc3339()),
        )?;

        Ok(Participant {
            id: last_id(&conn),
            external_id: input.external_id,
            name: input.name,
            email: input.email,
            created_at: now,
        })
    }

    pub fn get_participant(&self, id: u64) -> StoreResult<Option<Participant>> {
        if !storable(&[id]) {
            return Ok(None);
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let participant = conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?"),
                [id],
                participant_from_row,
            )
            .optional()?;
        Ok(participant)
    }

    /// Look up the participant behind a verified identity.
    pub fn get_participant_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let participant = conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE external_id = ?"),
                [external_id],
                participant_from_row,
            )
            .optional()?;
        Ok(participant)
    }

    // ============================================================
    // Hackathon operations
    // ============================================================

    pub fn create_hackathon(&self, input: CreateHackathonInput) -> StoreResult<Hackathon> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO hackathons (title, description, starts_at, ends_at, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                &input.title,
                &input.description,
                input.starts_at.to_rfc3339(),
                input.ends_at.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Hackathon {
            id: last_id(&conn),
            title: input.title,
            description: input.description,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            created_at: now,
        })
    }

    pub fn get_hackathon(&self, id: u64) -> StoreResult<Option<Hackathon>> {
        if !storable(&[id]) {
            return Ok(None);
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let hackathon = conn
            .query_row(
                "SELECT id, title, description, starts_at, ends_at, created_at
                 FROM hackathons WHERE id = ?",
                [id],
                |row| {
                    Ok(Hackathon {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        starts_at: parse_datetime(row.get::<_, String>(3)?),
                        ends_at: parse_datetime(row.get::<_, String>(4)?),
                        created_at: parse_datetime(row.get::<_, String>(5)?),
                    })
                },
            )
            .optional()?;
        Ok(hackathon)
    }

    // ============================================================
    // Team operations
    // ============================================================

    /// Insert a team without any precondition on its lead. Used for seeding;
    /// the team authority goes through [`StoreTx::insert_team`].
    pub fn create_team(&self, input: CreateTeamInput) -> StoreResult<Team> {
        let conn = self.conn.lock().expect("database lock poisoned");
        insert_team(&conn, input)
    }

    pub fn get_team(&self, id: u64) -> StoreResult<Option<Team>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        find_team(&conn, id)
    }

    /// All teams, or only those of one hackathon, in creation order.
    pub fn get_teams(&self, hackathon_id: Option<u64>) -> StoreResult<Vec<Team>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        match hackathon_id {
            Some(id) if !storable(&[id]) => Ok(Vec::new()),
            Some(id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TEAM_COLUMNS} FROM teams WHERE hackathon_id = ? ORDER BY id"
                ))?;
                let teams = stmt
                    .query_map([id], team_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(teams)
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY id"))?;
                let teams = stmt
                    .query_map([], team_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(teams)
            }
        }
    }

    // ============================================================
    // Registration operations
    // ============================================================

    pub fn get_registration(&self, id: u64) -> StoreResult<Option<Registration>> {
        if !storable(&[id]) {
            return Ok(None);
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let registration = conn
            .query_row(
                &format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = ?"),
                [id],
                registration_from_row,
            )
            .optional()?;
        Ok(registration)
    }

    pub fn get_registration_by_participant(
        &self,
        participant_id: u64,
        hackathon_id: u64,
    ) -> StoreResult<Option<Registration>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        find_registration(&conn, participant_id, hackathon_id)
    }

    pub fn get_all_registrations(&self) -> StoreResult<Vec<Registration>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations ORDER BY id"
        ))?;

        let registrations = stmt
            .query_map([], registration_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(registrations)
    }

    pub fn get_registrations_by_hackathon(&self, hackathon_id: u64) -> StoreResult<Vec<Registration>> {
        if !storable(&[hackathon_id]) {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE hackathon_id = ? ORDER BY id"
        ))?;

        let registrations = stmt
            .query_map([hackathon_id], registration_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(registrations)
    }

    pub fn delete_registration(&self, id: u64) -> StoreResult<bool> {
        if !storable(&[id]) {
            return Ok(false);
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM registrations WHERE id = ?", [id])?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Store operations available inside [`Database::atomically`].
pub struct StoreTx<'a> {
    conn: &'a Connection,
}

impl StoreTx<'_> {
    pub fn get_team(&self, id: u64) -> StoreResult<Option<Team>> {
        find_team(self.conn, id)
    }

    pub fn insert_team(&self, input: CreateTeamInput) -> StoreResult<Team> {
        insert_team(self.conn, input)
    }

    pub fn get_registration_by_participant(
        &self,
        participant_id: u64,
        hackathon_id: u64,
    ) -> StoreResult<Option<Registration>> {
        find_registration(self.conn, participant_id, hackathon_id)
    }

    /// Insert a registration. A second row for the same (participant,
    /// hackathon) pair fails with [`StoreError::Conflict`].
    pub fn insert_registration(
        &self,
        participant_id: u64,
        hackathon_id: u64,
        team_id: Option<u64>,
    ) -> StoreResult<Registration> {
        let now = Utc::now();

        self.conn.execute(
            "INSERT INTO registrations (participant_id, hackathon_id, team_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                participant_id,
                hackathon_id,
                team_id,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Registration {
            id: last_id(self.conn),
            participant_id,
            hackathon_id,
            team_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Set the team on a registration that has none yet.
    ///
    /// Returns `false` when the registration is missing or already attached.
    pub fn attach_registration(
        &self,
        registration_id: u64,
        team_id: u64,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let rows = self.conn.execute(
            "UPDATE registrations SET team_id = ?, updated_at = ? WHERE id = ? AND team_id IS NULL",
            (team_id, at.to_rfc3339(), registration_id),
        )?;
        Ok(rows == 1)
    }

    pub fn update_team_lead(&self, team_id: u64, lead_id: u64, at: DateTime<Utc>) -> StoreResult<bool> {
        let rows = self.conn.execute(
            "UPDATE teams SET lead_id = ?, updated_at = ? WHERE id = ?",
            (lead_id, at.to_rfc3339(), team_id),
        )?;
        Ok(rows == 1)
    }
}

// SQLite cannot bind a u64 past i64::MAX, and no stored row has such an id.
fn storable(ids: &[u64]) -> bool {
    ids.iter().all(|&id| id <= MAX_ID)
}

fn insert_team(conn: &Connection, input: CreateTeamInput) -> StoreResult<Team> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO teams (name, hackathon_id, lead_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        (
            &input.name,
            input.hackathon_id,
            input.lead_id,
            now.to_rfc3339(),
            now.to_rfc3339(),
        ),
    )?;

    Ok(Team {
        id: last_id(conn),
        name: input.name,
        hackathon_id: input.hackathon_id,
        lead_id: input.lead_id,
        created_at: now,
        updated_at: now,
    })
}

fn find_team(conn: &Connection, id: u64) -> StoreResult<Option<Team>> {
    if !storable(&[id]) {
        return Ok(None);
    }
    let team = conn
        .query_row(
            &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?"),
            [id],
            team_from_row,
        )
        .optional()?;
    Ok(team)
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        hackathon_id: row.get(2)?,
        lead_id: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn find_registration(
    conn: &Connection,
    participant_id: u64,
    hackathon_id: u64,
) -> StoreResult<Option<Registration>> {
    if !storable(&[participant_id, hackathon_id]) {
        return Ok(None);
    }
    let registration = conn
        .query_row(
            &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations
                 WHERE participant_id = ? AND hackathon_id = ?"
            ),
            [participant_id, hackathon_id],
            registration_from_row,
        )
        .optional()?;
    Ok(registration)
}

fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<Registration> {
    Ok(Registration {
        id: row.get(0)?,
        participant_id: row.get(1)?,
        hackathon_id: row.get(2)?,
        team_id: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

// Rowids from AUTOINCREMENT tables start at 1 and never go negative.
fn last_id(conn: &Connection) -> u64 {
    conn.last_insert_rowid() as u64
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
