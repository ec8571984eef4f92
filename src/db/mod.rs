//! SQLite-backed project store.
//!
//! The core never persists on its own; hosts call [`ProjectStore::load`] and
//! [`ProjectStore::save`] with whole snapshots. Each save replaces the
//! project's rows inside one transaction, so a failed save leaves the
//! previously stored snapshot intact.

mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::integrity::ProjectSnapshot;
use crate::models::*;
use crate::recommend::{RecommendationKind, Selections};

/// Load/save collaborator for project snapshots.
pub trait ProjectStore {
    fn load(&self, project_id: Uuid) -> Result<ProjectSnapshot>;
    fn save(&self, project_id: Uuid, snapshot: &ProjectSnapshot) -> Result<()>;
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "scopeforge")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("scopeforge.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
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

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM projects ORDER BY name",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM projects WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(project_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        if input.name.trim().is_empty() {
            anyhow::bail!("Project name must not be empty");
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        tracing::info!(project_id = %id, name = %input.name, "project created");
        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Delete a project and everything stored under it.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    fn require_project(conn: &Connection, id: Uuid) -> Result<()> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if count == 0 {
            anyhow::bail!("Project not found: {}", id);
        }
        Ok(())
    }

    // ============================================================
    // Selection operations
    // ============================================================

    pub fn load_selections(&self, project_id: Uuid) -> Result<Selections> {
        let conn = self.conn.lock().expect("database lock poisoned");
        Self::require_project(&conn, project_id)?;

        let mut stmt = conn.prepare(
            "SELECT module_id, kind, item FROM selections
             WHERE project_id = ? ORDER BY module_id, kind, position",
        )?;
        let rows = stmt
            .query_map([project_id.to_string()], |row| {
                Ok((
                    parse_uuid(row.get::<_, String>(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut selections = Selections::new();
        for (module_id, kind, item) in rows {
            let Some(kind) = RecommendationKind::from_str(&kind) else {
                tracing::warn!(%kind, "skipping selection with unknown kind");
                continue;
            };
            let mut items = selections.get(module_id, kind).to_vec();
            items.push(item);
            selections.set(module_id, kind, items);
        }

        Ok(selections)
    }

    pub fn save_selections(&self, project_id: Uuid, selections: &Selections) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        Self::require_project(&conn, project_id)?;

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM selections WHERE project_id = ?",
            [project_id.to_string()],
        )?;
        for kind in [RecommendationKind::Feature, RecommendationKind::BusinessRule] {
            for module_id in selections.module_ids(kind) {
                for (position, item) in selections.get(module_id, kind).iter().enumerate() {
                    tx.execute(
                        "INSERT INTO selections (project_id, module_id, kind, position, item)
                         VALUES (?, ?, ?, ?, ?)",
                        (
                            project_id.to_string(),
                            module_id.to_string(),
                            kind.as_str(),
                            position as i64,
                            item,
                        ),
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl ProjectStore for Database {
    fn load(&self, project_id: Uuid) -> Result<ProjectSnapshot> {
        let conn = self.conn.lock().expect("database lock poisoned");
        Self::require_project(&conn, project_id)?;
        let pid = project_id.to_string();

        let mut stmt = conn.prepare(
            "SELECT id, name, description, priority, business_impact, dependencies, status,
                    user_story_id, created_at, updated_at
             FROM modules WHERE project_id = ? ORDER BY position",
        )?;
        let modules = stmt
            .query_map([&pid], |row| {
                Ok(Module {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    description: row.get(2)?,
                    priority: Priority::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
                    business_impact: row.get(4)?,
                    dependencies: row.get(5)?,
                    status: Status::from_str(&row.get::<_, String>(6)?).unwrap_or_default(),
                    user_story_id: row.get::<_, Option<String>>(7)?.map(parse_uuid),
                    created_at: parse_datetime(row.get::<_, String>(8)?),
                    updated_at: parse_datetime(row.get::<_, String>(9)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, module_id, title, user_role, description, acceptance_criteria,
                    priority, status, created_at, updated_at
             FROM user_stories WHERE project_id = ? ORDER BY position",
        )?;
        let user_stories = stmt
            .query_map([&pid], |row| {
                Ok(UserStory {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    module_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    user_role: row.get(3)?,
                    description: row.get(4)?,
                    acceptance_criteria: row.get(5)?,
                    priority: Priority::from_str(&row.get::<_, String>(6)?).unwrap_or_default(),
                    status: Status::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
                    created_at: parse_datetime(row.get::<_, String>(8)?),
                    updated_at: parse_datetime(row.get::<_, String>(9)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_story_id, module_id, title, description, priority, status,
                    estimated_hours, assignee, created_at, updated_at
             FROM features WHERE project_id = ? ORDER BY position",
        )?;
        let features = stmt
            .query_map([&pid], |row| {
                Ok(Feature {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    user_story_id: parse_uuid(row.get::<_, String>(1)?),
                    module_id: parse_uuid(row.get::<_, String>(2)?),
                    title: row.get(3)?,
                    description: row.get(4)?,
                    priority: Priority::from_str(&row.get::<_, String>(5)?).unwrap_or_default(),
                    status: Status::from_str(&row.get::<_, String>(6)?).unwrap_or_default(),
                    estimated_hours: row.get(7)?,
                    assignee: row.get(8)?,
                    created_at: parse_datetime(row.get::<_, String>(9)?),
                    updated_at: parse_datetime(row.get::<_, String>(10)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT id FROM retired_ids WHERE project_id = ?")?;
        let retired = stmt
            .query_map([&pid], |row| Ok(parse_uuid(row.get::<_, String>(0)?)))?
            .collect::<Result<HashSet<_>, _>>()?;

        let snapshot = ProjectSnapshot::from_parts(modules, user_stories, features, retired)
            .with_context(|| format!("Stored project {} is inconsistent", project_id))?;

        tracing::debug!(
            %project_id,
            modules = snapshot.modules().len(),
            stories = snapshot.user_stories().len(),
            features = snapshot.features().len(),
            "project loaded"
        );
        Ok(snapshot)
    }

    fn save(&self, project_id: Uuid, snapshot: &ProjectSnapshot) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        Self::require_project(&conn, project_id)?;
        let pid = project_id.to_string();

        let tx = conn.transaction()?;
        for table in ["features", "user_stories", "modules", "retired_ids"] {
            tx.execute(&format!("DELETE FROM {} WHERE project_id = ?", table), [&pid])?;
        }

        for (position, m) in snapshot.modules().iter().enumerate() {
            tx.execute(
                "INSERT INTO modules (id, project_id, position, name, description, priority,
                    business_impact, dependencies, status, user_story_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    m.id.to_string(),
                    &pid,
                    position as i64,
                    &m.name,
                    &m.description,
                    m.priority.as_str(),
                    &m.business_impact,
                    &m.dependencies,
                    m.status.as_str(),
                    m.user_story_id.map(|u| u.to_string()),
                    m.created_at.to_rfc3339(),
                    m.updated_at.to_rfc3339(),
                ),
            )?;
        }

        for (position, s) in snapshot.user_stories().iter().enumerate() {
            tx.execute(
                "INSERT INTO user_stories (id, project_id, position, module_id, title, user_role,
                    description, acceptance_criteria, priority, status, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    s.id.to_string(),
                    &pid,
                    position as i64,
                    s.module_id.to_string(),
                    &s.title,
                    &s.user_role,
                    &s.description,
                    &s.acceptance_criteria,
                    s.priority.as_str(),
                    s.status.as_str(),
                    s.created_at.to_rfc3339(),
                    s.updated_at.to_rfc3339(),
                ),
            )?;
        }

        for (position, f) in snapshot.features().iter().enumerate() {
            tx.execute(
                "INSERT INTO features (id, project_id, position, user_story_id, module_id, title,
                    description, priority, status, estimated_hours, assignee, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    f.id.to_string(),
                    &pid,
                    position as i64,
                    f.user_story_id.to_string(),
                    f.module_id.to_string(),
                    &f.title,
                    &f.description,
                    f.priority.as_str(),
                    f.status.as_str(),
                    f.estimated_hours,
                    &f.assignee,
                    f.created_at.to_rfc3339(),
                    f.updated_at.to_rfc3339(),
                ),
            )?;
        }

        for id in snapshot.retired_ids() {
            tx.execute(
                "INSERT INTO retired_ids (project_id, id) VALUES (?, ?)",
                (&pid, id.to_string()),
            )?;
        }

        tx.execute(
            "UPDATE projects SET updated_at = ? WHERE id = ?",
            (Utc::now().to_rfc3339(), &pid),
        )?;
        tx.commit()?;

        tracing::debug!(%project_id, "project saved");
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
