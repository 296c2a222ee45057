//! Transaction guard over a [`Connection`]

use super::Connection;
use crate::errors::StorehausError;

/// An open transaction on a borrowed connection
///
/// Statements are executed through `as_mut()`; the transaction must be
/// finished with `commit()` or `rollback()`.
///
/// # Example
/// ```ignore
/// let mut tx = Transaction::begin(conn).await?;
/// main.persist(tx.as_mut()).await?;
/// tx.commit().await?;
/// ```
pub struct Transaction<'c> {
    conn: &'c mut dyn Connection,
    finished: bool,
}

impl<'c> Transaction<'c> {
    pub async fn begin(conn: &'c mut dyn Connection) -> Result<Transaction<'c>, StorehausError> {
        conn.begin_transaction().await?;
        tracing::debug!("transaction started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Connection to run statements inside the transaction
    pub fn as_mut(&mut self) -> &mut dyn Connection {
        &mut *self.conn
    }

    pub async fn commit(mut self) -> Result<(), StorehausError> {
        self.finished = true;
        self.conn.commit().await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), StorehausError> {
        self.finished = true;
        self.conn.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("transaction dropped without commit or rollback");
        }
    }
}
