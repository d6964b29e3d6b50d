//! Crawl table definitions for a logical database
//!
//! Every logical database carries the same three tables: `seeds` (the URLs
//! a crawl may start from), `sites` (the dedup witness for every URL ever
//! scheduled), and `state` (the frontier persisted by pause). A reserved
//! `jobs` table is intentionally not created; its format is undecided.

use crate::store::StoreResult;

/// Maximum length of a stored site URL, in bytes
pub const MAX_SITE_LENGTH: usize = 1023;

/// Returns the create-or-replace DDL for the crawl tables of `db`
///
/// The caller must have validated `db` as a database name; it is spliced
/// into the statements as a quoted schema qualifier.
fn schema_sql(db: &str) -> String {
    format!(
        r#"
DROP TABLE IF EXISTS "{db}".seeds;
CREATE TABLE "{db}".seeds (
    site VARCHAR({MAX_SITE_LENGTH}),
    visited BIT DEFAULT 0
);

DROP TABLE IF EXISTS "{db}".sites;
CREATE TABLE "{db}".sites (
    site VARCHAR({MAX_SITE_LENGTH})
);

CREATE INDEX "{db}".idx_sites_site ON sites(site);

DROP TABLE IF EXISTS "{db}".state;
CREATE TABLE "{db}".state (
    site VARCHAR({MAX_SITE_LENGTH})
);
"#
    )
}

/// Creates or replaces the crawl tables inside the attached database `db`
pub fn init_tables(conn: &rusqlite::Connection, db: &str) -> StoreResult<()> {
    conn.execute_batch(&schema_sql(db))?;
    Ok(())
}
