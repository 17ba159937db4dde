use anyhow::{bail, Context, Result};
use log::{debug, info};
use rusqlite::Connection;

const CREATE_STOCKS: &str =
    "CREATE TABLE IF NOT EXISTS stocks (date text, trans text, symbol text, qty real, price real)";
const INSERT_STOCK: &str = "INSERT INTO stocks VALUES ('2006-01-05','BUY','RHAT',100,35.14)";

/// Integrity check, create `stocks`, insert one row and commit.
/// Returns the row count of `stocks` afterwards.
pub fn smoke_test(conn: &mut Connection) -> Result<u64> {
    let integrity: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .context("running integrity check")?;
    debug!("integrity_check: {integrity}");
    if integrity != "ok" {
        bail!("integrity check failed: {integrity}");
    }

    conn.execute(CREATE_STOCKS, [])
        .context("creating table stocks")?;

    let tx = conn.transaction()?;
    tx.execute(INSERT_STOCK, []).context("inserting into stocks")?;
    tx.commit().context("committing insert")?;

    let rows: u64 = conn.query_row("SELECT COUNT(*) FROM stocks", [], |row| row.get(0))?;
    Ok(rows)
}

/// Entry point of the `sqlite` subcommand.
pub fn run_sqlite(database: &str) -> Result<()> {
    let mut conn =
        Connection::open(database).with_context(|| format!("opening database {database}"))?;
    let rows = smoke_test(&mut conn)?;
    info!("stocks holds {rows} row(s) in {database}");
    conn.close()
        .map_err(|(_, err)| err)
        .context("closing database")?;

    println!("sqlite ok");
    Ok(())
}
