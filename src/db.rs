use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS detections (
            id              INTEGER PRIMARY KEY,
            image_path      TEXT,
            image_url       TEXT,
            model           TEXT NOT NULL,
            raw_description TEXT,
            error           TEXT,
            latency_ms      INTEGER,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS extractions (
            detection_id     INTEGER PRIMARY KEY REFERENCES detections(id),
            item_name        TEXT NOT NULL,
            populated_fields INTEGER NOT NULL,
            json             TEXT NOT NULL,
            processed_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_extractions_item ON extractions(item_name);
        ",
    )?;
    Ok(())
}

// ── Detections ──

pub struct DetectionRow {
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub model: String,
    pub raw_description: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

pub fn insert_detection(conn: &Connection, row: &DetectionRow) -> Result<i64> {
    conn.execute(
        "INSERT INTO detections (image_path, image_url, model, raw_description, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            row.image_path, row.image_url, row.model, row.raw_description, row.error, row.latency_ms,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Processing ──

pub struct StoredDescription {
    pub detection_id: i64,
    pub image_url: String,
    pub raw_description: String,
}

/// Descriptions that were received but never extracted.
pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredDescription>> {
    let sql = format!(
        "SELECT d.id, COALESCE(d.image_url, ''), d.raw_description
         FROM detections d
         LEFT JOIN extractions e ON e.detection_id = d.id
         WHERE d.raw_description IS NOT NULL AND e.detection_id IS NULL
         ORDER BY d.id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredDescription {
                detection_id: row.get(0)?,
                image_url: row.get(1)?,
                raw_description: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct ExtractionRow {
    pub detection_id: i64,
    pub item_name: String,
    pub populated_fields: usize,
    pub json: String,
}

pub fn save_extractions(conn: &Connection, rows: &[ExtractionRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO extractions (detection_id, item_name, populated_fields, json)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.detection_id, r.item_name, r.populated_fields, r.json,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Stored extraction JSON for one detection.
pub fn fetch_extraction(conn: &Connection, detection_id: i64) -> Result<Option<String>> {
    let json = conn
        .query_row(
            "SELECT json FROM extractions WHERE detection_id = ?1",
            [detection_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json)
}

// ── Stats ──

pub struct Stats {
    pub detections: usize,
    pub failed: usize,
    pub extracted: usize,
    pub empty: usize,
    pub pending: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let detections: usize = conn.query_row("SELECT COUNT(*) FROM detections", [], |r| r.get(0))?;
    let failed: usize = conn.query_row(
        "SELECT COUNT(*) FROM detections WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let extracted: usize = conn.query_row("SELECT COUNT(*) FROM extractions", [], |r| r.get(0))?;
    let empty: usize = conn.query_row(
        "SELECT COUNT(*) FROM extractions WHERE populated_fields = 0",
        [],
        |r| r.get(0),
    )?;
    let pending: usize = conn.query_row(
        "SELECT COUNT(*) FROM detections d
         WHERE d.raw_description IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM extractions e WHERE e.detection_id = d.id)",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        detections,
        failed,
        extracted,
        empty,
        pending,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn described(text: &str) -> DetectionRow {
        DetectionRow {
            image_path: Some("captured_image.jpg".into()),
            image_url: Some("https://i.imgur.com/a.jpg".into()),
            model: "test-model".into(),
            raw_description: Some(text.into()),
            error: None,
            latency_ms: Some(1200),
        }
    }

    fn failed() -> DetectionRow {
        DetectionRow {
            image_path: Some("captured_image.jpg".into()),
            image_url: None,
            model: "test-model".into(),
            raw_description: None,
            error: Some("Imgur upload failed with 403".into()),
            latency_ms: None,
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn unprocessed_excludes_failures_and_extracted() {
        let conn = memory_db();
        let a = insert_detection(&conn, &described("Item Name: A")).unwrap();
        insert_detection(&conn, &failed()).unwrap();
        let c = insert_detection(&conn, &described("Item Name: C")).unwrap();

        let pending = fetch_unprocessed(&conn, None).unwrap();
        let ids: Vec<i64> = pending.iter().map(|p| p.detection_id).collect();
        assert_eq!(ids, vec![a, c]);

        save_extractions(
            &conn,
            &[ExtractionRow {
                detection_id: a,
                item_name: "A".into(),
                populated_fields: 1,
                json: "{}".into(),
            }],
        )
        .unwrap();

        let pending = fetch_unprocessed(&conn, None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].detection_id, c);
        assert_eq!(pending[0].raw_description, "Item Name: C");
    }

    #[test]
    fn unprocessed_limit() {
        let conn = memory_db();
        for i in 0..5 {
            insert_detection(&conn, &described(&format!("Item Name: {}", i))).unwrap();
        }
        assert_eq!(fetch_unprocessed(&conn, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn extraction_round_trip_and_replace() {
        let conn = memory_db();
        let id = insert_detection(&conn, &described("x")).unwrap();
        assert!(fetch_extraction(&conn, id).unwrap().is_none());

        for json in ["{\"v\":1}", "{\"v\":2}"] {
            save_extractions(
                &conn,
                &[ExtractionRow {
                    detection_id: id,
                    item_name: String::new(),
                    populated_fields: 0,
                    json: json.into(),
                }],
            )
            .unwrap();
        }
        assert_eq!(fetch_extraction(&conn, id).unwrap().as_deref(), Some("{\"v\":2}"));
    }

    #[test]
    fn stats_counts() {
        let conn = memory_db();
        let a = insert_detection(&conn, &described("Item Name: A")).unwrap();
        insert_detection(&conn, &described("nothing")).unwrap();
        insert_detection(&conn, &failed()).unwrap();
        save_extractions(
            &conn,
            &[ExtractionRow {
                detection_id: a,
                item_name: String::new(),
                populated_fields: 0,
                json: "{}".into(),
            }],
        )
        .unwrap();

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.detections, 3);
        assert_eq!(s.failed, 1);
        assert_eq!(s.extracted, 1);
        assert_eq!(s.empty, 1);
        assert_eq!(s.pending, 1);
    }

    #[test]
    fn connect_creates_parent_dir() {
        let dir = std::env::temp_dir().join(format!("detect-db-{}", std::process::id()));
        let path = dir.join("nested").join("detections.sqlite");
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        drop(conn);
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
