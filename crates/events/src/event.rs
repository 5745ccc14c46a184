use core::fmt::Debug;

use chrono::{DateTime, Utc};

/// One entry of the ledger's audit trail.
///
/// An implementor describes a stock change that has already been committed.
/// The ledger appends entries and never edits them afterwards, so consumers
/// may cache them freely.
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// Dotted name used in logs, e.g. `inventory.quantity.transferred`.
    fn event_type(&self) -> &'static str;

    /// Wall-clock time at which the change was committed.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Serialized shape of the entry; bump when fields change meaning.
    fn version(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Restocked(DateTime<Utc>);

    impl Event for Restocked {
        fn event_type(&self) -> &'static str {
            "inventory.quantity.added"
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn entries_start_at_version_one() {
        let at = Utc::now();
        let entry = Restocked(at);
        assert_eq!(entry.version(), 1);
        assert_eq!(entry.occurred_at(), at);
    }
}
