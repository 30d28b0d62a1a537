use rusqlite::{params, Result};
use uuid::Uuid;

use super::models::{ActivityLogEntry, NewActivity};
use super::Database;

impl Database {
    /// Insert an activity row and return its id.
    pub fn insert_activity(&self, entry: NewActivity<'_>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO activity_log (id, file_path, file_name, action, rule_name, destination, timestamp, result, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                entry.file_path,
                entry.file_name,
                entry.action,
                entry.rule_name,
                entry.destination,
                entry.timestamp,
                entry.result,
                entry.details
            ],
        )?;
        Ok(id)
    }

    /// Newest entries first.
    pub fn get_activity_log(&self, limit: u32, offset: u32) -> Result<Vec<ActivityLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, file_path, file_name, action, rule_name, destination, timestamp, result, details
             FROM activity_log ORDER BY timestamp DESC, rowid DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            Ok(ActivityLogEntry {
                id: row.get(0)?,
                file_path: row.get(1)?,
                file_name: row.get(2)?,
                action: row.get(3)?,
                rule_name: row.get(4)?,
                destination: row.get(5)?,
                timestamp: row.get(6)?,
                result: row.get(7)?,
                details: row.get(8)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn count_activity(&self) -> Result<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn prune_old_logs(&self, before: &str) -> Result<usize> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM activity_log WHERE timestamp < ?1",
            params![before],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry<'a>(path: &'a str, timestamp: &'a str) -> NewActivity<'a> {
        NewActivity {
            file_path: path,
            file_name: path.rsplit('/').next().unwrap_or(path),
            action: "archived",
            rule_name: Some("Notes → Archive"),
            destination: Some("Archive/a.md"),
            timestamp,
            result: "success",
            details: None,
        }
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_activity(entry("Notes/a.md", "2024-01-01 10:00:00")).unwrap();
        db.insert_activity(entry("Notes/b.md", "2024-01-02 10:00:00")).unwrap();

        let log = db.get_activity_log(10, 0).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].file_path, "Notes/b.md");
        assert_eq!(log[0].file_name, "b.md");
        assert_eq!(log[1].rule_name.as_deref(), Some("Notes → Archive"));

        let page = db.get_activity_log(1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].file_path, "Notes/a.md");
    }

    #[test]
    fn test_prune_old_logs() {
        let db = Database::open_in_memory().unwrap();
        db.insert_activity(entry("Notes/old.md", "2023-06-01 00:00:00")).unwrap();
        db.insert_activity(entry("Notes/new.md", "2024-06-01 00:00:00")).unwrap();

        let pruned = db.prune_old_logs("2024-01-01 00:00:00").unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(db.count_activity().unwrap(), 1);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_activity(entry("Notes/a.md", "2024-01-01 00:00:00")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_activity().unwrap(), 1);
    }
}
