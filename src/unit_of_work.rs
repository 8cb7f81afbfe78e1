//! Row-level unit of work
//!
//! One CSV row is imported inside one `RowScope`: a SQLite transaction
//! plus the lookup cache entries created while it is open. The caller
//! owns the scope and decides whether it commits or is discarded.

use rusqlite::{Connection, Transaction};
use tracing::warn;

use crate::entities::lookup::{self, LookupCache, LookupKind};

pub struct RowScope<'conn, 'cache> {
    tx: Transaction<'conn>,
    lookups: &'cache mut LookupCache,
}

impl<'conn, 'cache> RowScope<'conn, 'cache> {
    /// Open a transaction for one row
    pub fn begin(
        conn: &'conn mut Connection,
        lookups: &'cache mut LookupCache,
    ) -> rusqlite::Result<Self> {
        let tx = conn.transaction()?;
        Ok(RowScope { tx, lookups })
    }

    /// Connection view inside the transaction; staged rows are visible here
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    /// Cached find-or-create of a lookup row
    pub fn lookup(&mut self, kind: LookupKind, name: &str) -> rusqlite::Result<i64> {
        if let Some(id) = self.lookups.get(kind, name) {
            return Ok(id);
        }

        let (row, created) = lookup::find_or_create(&self.tx, kind, name)?;
        if created {
            self.lookups.insert_pending(kind, name, row.id);
        } else {
            self.lookups.insert_committed(kind, name, row.id);
        }
        Ok(row.id)
    }

    /// Commit the row; its lookups become visible to later rows
    pub fn commit(self) -> rusqlite::Result<()> {
        let RowScope { tx, lookups } = self;
        match tx.commit() {
            Ok(()) => {
                lookups.promote();
                Ok(())
            }
            Err(e) => {
                lookups.discard_pending();
                Err(e)
            }
        }
    }

    /// Throw away everything the row staged
    pub fn discard(self) {
        let RowScope { tx, lookups } = self;
        if let Err(e) = tx.rollback() {
            warn!(error = %e, "rollback failed");
        }
        lookups.discard_pending();
    }
}
