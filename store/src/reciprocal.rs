//! Reciprocal rate maintenance: every rate has a correctly valued inverse.

use tracing::debug;

use ratebook_common::{reciprocal_factor, RateKey, RateRecord, Result, DEFAULT_DECIMAL_SCALE};

use crate::traits::RateTx;

/// What a synchronization did to the reciprocal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReciprocalSync {
    /// The reciprocal already held the target factor.
    Unchanged,
    /// The reciprocal was created or updated.
    Written,
    /// The reciprocal was removed.
    Removed,
    /// There was no reciprocal to remove.
    Absent,
}

/// Keeps the `(to, from, date)` record consistent with every saved or deleted rate.
///
/// The maintainer only ever touches the exact reciprocal key of the
/// triggering record, and it never re-triggers itself: writing the
/// reciprocal does not synchronize the original back.
#[derive(Debug, Clone, Copy)]
pub struct ReciprocalRateMaintainer {
    scale: u32,
}

impl ReciprocalRateMaintainer {
    /// Create a maintainer computing reciprocals at the given scale.
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    /// Scale used for reciprocal factors.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Synchronize the reciprocal of a record that was just saved.
    pub async fn on_save<T>(&self, tx: &mut T, saved: &RateRecord) -> Result<ReciprocalSync>
    where
        T: RateTx + ?Sized,
    {
        let target = reciprocal_factor(saved.factor, self.scale);
        let key = saved.key().reciprocal();

        if let Some(existing) = tx.find_rate(&key).await? {
            if existing.factor == target {
                debug!(rate = %saved, "Reciprocal already up to date");
                return Ok(ReciprocalSync::Unchanged);
            }
        }

        let written = tx.write_rate(&key, target).await?;
        debug!(rate = %saved, reciprocal = %written, "Reciprocal written");
        Ok(ReciprocalSync::Written)
    }

    /// Remove the reciprocal of a record that was just deleted.
    pub async fn on_delete<T>(&self, tx: &mut T, deleted: &RateKey) -> Result<ReciprocalSync>
    where
        T: RateTx + ?Sized,
    {
        let key = deleted.reciprocal();

        match tx.remove_rate(&key).await? {
            Some(removed) => {
                debug!(rate = %deleted, reciprocal = %removed, "Reciprocal removed");
                Ok(ReciprocalSync::Removed)
            }
            None => Ok(ReciprocalSync::Absent),
        }
    }
}

impl Default for ReciprocalRateMaintainer {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMAL_SCALE)
    }
}
