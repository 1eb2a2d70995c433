//! Connection and transaction provider abstraction
//!
//! The unit of work never builds connections itself. A `ConnectionProvider`
//! opens connections to the backing store and drives transactions on them;
//! `Transaction` is the scoped guard the commit protocol runs inside.

use crate::errors::Result;

/// Source of connections and transactions for one backing store
///
/// Connections are returned by value and released when dropped.
pub trait ConnectionProvider {
    type Connection;

    /// Open a ready-to-use connection
    fn open(&self) -> Result<Self::Connection>;

    fn begin(&self, conn: &mut Self::Connection) -> Result<()>;

    fn commit(&self, conn: &mut Self::Connection) -> Result<()>;

    fn rollback(&self, conn: &mut Self::Connection) -> Result<()>;
}

impl<P: ConnectionProvider> ConnectionProvider for &P {
    type Connection = P::Connection;

    fn open(&self) -> Result<Self::Connection> {
        (**self).open()
    }

    fn begin(&self, conn: &mut Self::Connection) -> Result<()> {
        (**self).begin(conn)
    }

    fn commit(&self, conn: &mut Self::Connection) -> Result<()> {
        (**self).commit(conn)
    }

    fn rollback(&self, conn: &mut Self::Connection) -> Result<()> {
        (**self).rollback(conn)
    }
}

/// An open transaction on a borrowed connection
///
/// Rolls back on drop unless `commit` succeeded, so every exit path out of
/// a commit (including `?` on a mapper failure) releases the transaction.
pub struct Transaction<'c, P: ConnectionProvider> {
    provider: &'c P,
    conn: &'c mut P::Connection,
    finished: bool,
}

impl<'c, P: ConnectionProvider> Transaction<'c, P> {
    /// Begin a transaction on `conn`
    pub fn begin(provider: &'c P, conn: &'c mut P::Connection) -> Result<Self> {
        provider.begin(conn)?;
        Ok(Self {
            provider,
            conn,
            finished: false,
        })
    }

    /// Connection the transaction runs on; mappers issue their statements here
    pub fn connection(&self) -> &P::Connection {
        &*self.conn
    }

    /// Commit. On failure the guard still rolls back when dropped.
    pub fn commit(mut self) -> Result<()> {
        self.provider.commit(&mut *self.conn)?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.provider.rollback(&mut *self.conn)
    }
}

impl<P: ConnectionProvider> Drop for Transaction<'_, P> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::debug!("rolling back unfinished transaction");
        if let Err(err) = self.provider.rollback(&mut *self.conn) {
            tracing::warn!(err_code = err.code(), error = %err, "rollback failed");
        }
    }
}
