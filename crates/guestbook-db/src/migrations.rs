use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (ledger schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE blocks (
                number      INTEGER PRIMARY KEY,
                timestamp   INTEGER NOT NULL,
                tx_count    INTEGER NOT NULL
            );

            -- idx is the ledger position, assigned once and never reused
            CREATE TABLE entries (
                idx             INTEGER PRIMARY KEY,
                author          TEXT NOT NULL,
                display_name    TEXT NOT NULL,
                message         TEXT NOT NULL,
                timestamp       INTEGER NOT NULL,
                has_tipped      INTEGER NOT NULL,
                tx_hash         TEXT NOT NULL UNIQUE,
                block_number    INTEGER NOT NULL REFERENCES blocks(number)
            );

            CREATE TRIGGER entries_no_update BEFORE UPDATE ON entries
            BEGIN
                SELECT RAISE(ABORT, 'entries are append-only');
            END;

            CREATE TRIGGER entries_no_delete BEFORE DELETE ON entries
            BEGIN
                SELECT RAISE(ABORT, 'entries are append-only');
            END;

            CREATE TABLE accounts (
                address     TEXT PRIMARY KEY,
                balance     TEXT NOT NULL,
                nonce       INTEGER NOT NULL
            );

            CREATE TABLE transactions (
                hash            TEXT PRIMARY KEY,
                sender          TEXT NOT NULL,
                status          TEXT NOT NULL,
                revert_reason   TEXT,
                block_number    INTEGER REFERENCES blocks(number),
                position        INTEGER NOT NULL,
                entry_index     INTEGER,
                gas_used        INTEGER NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_transactions_block
                ON transactions(block_number, position);

            -- Single row: accumulated tips. Nothing ever withdraws from it.
            CREATE TABLE contract (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                balance     TEXT NOT NULL
            );

            INSERT INTO contract (id, balance) VALUES (1, '0');

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
