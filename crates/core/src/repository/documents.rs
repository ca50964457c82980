//! Metadata document operations on the SQLite backend.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::MetadataRepository;
use super::connection::MetadataDb;
use crate::{Error, MetadataDocument};

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("{column} '{value}': {e}")))
}

/// A `metadata` row before JSON and timestamp decoding.
struct StoredRow {
    url: String,
    status_code: i64,
    headers_json: String,
    cookies_json: String,
    page_source: Option<String>,
    created_at: String,
    updated_at: String,
}

impl StoredRow {
    fn into_document(self) -> Result<MetadataDocument, Error> {
        let status_code = u16::try_from(self.status_code)
            .map_err(|_| Error::Corrupt(format!("status_code {} out of range", self.status_code)))?;
        let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers_json)?;
        let cookies: BTreeMap<String, String> = serde_json::from_str(&self.cookies_json)?;

        Ok(MetadataDocument {
            url: self.url,
            status_code,
            headers,
            cookies,
            page_source: self.page_source,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
        })
    }
}

fn select_by_url(conn: &rusqlite::Connection, url: &str) -> Result<Option<MetadataDocument>, Error> {
    let mut stmt = conn.prepare(
        "SELECT url, status_code, headers_json, cookies_json, page_source, created_at, updated_at
         FROM metadata WHERE url = ?1",
    )?;

    let result = stmt.query_row(params![url], |row| {
        Ok(StoredRow {
            url: row.get(0)?,
            status_code: row.get(1)?,
            headers_json: row.get(2)?,
            cookies_json: row.get(3)?,
            page_source: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    });

    match result {
        Ok(row) => row.into_document().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl MetadataDb {
    /// Number of stored documents.
    pub async fn count_documents(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl MetadataRepository for MetadataDb {
    /// Insert or replace the document for `doc.url`.
    ///
    /// Runs as one transaction: the UPSERT leaves `created_at` untouched on
    /// conflict, and the stored row is read back before commit.
    async fn upsert(&self, doc: &MetadataDocument) -> Result<MetadataDocument, Error> {
        let headers_json = serde_json::to_string(&doc.headers)?;
        let cookies_json = serde_json::to_string(&doc.cookies)?;
        let now = Utc::now();
        let created_at = format_ts(doc.created_at.min(now));
        let updated_at = format_ts(now);
        let url = doc.url.clone();
        let status_code = i64::from(doc.status_code);
        let page_source = doc.page_source.clone();

        self.conn
            .call(move |conn| -> Result<MetadataDocument, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO metadata (
                    url, status_code, headers_json, cookies_json, page_source, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(url) DO UPDATE SET
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    cookies_json = excluded.cookies_json,
                    page_source = excluded.page_source,
                    updated_at = MAX(metadata.created_at, excluded.updated_at)",
                    params![&url, status_code, &headers_json, &cookies_json, &page_source, &created_at, &updated_at],
                )?;

                let stored =
                    select_by_url(&tx, &url)?.ok_or_else(|| Error::Corrupt(format!("upserted row missing: {url}")))?;
                tx.commit()?;
                Ok(stored)
            })
            .await
            .map_err(Error::from)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<MetadataDocument>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<MetadataDocument>, Error> { select_by_url(conn, &url) })
            .await
            .map_err(Error::from)
    }
}
