//! Change accounting for decision-model variables
//!
//! Every structural mutation reports the variables it touched. Records for the
//! same variable collapse to their net effect, so a batch always shows at most
//! one record per variable.

use std::fmt;

/// Kind of change applied to one variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeType::Created => "CREATED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Deleted => "DELETED",
        })
    }
}

/// Net effect of `previous` followed by `next`; `None` cancels the record
pub fn merge(previous: ChangeType, next: ChangeType) -> Option<ChangeType> {
    use ChangeType::*;
    match (previous, next) {
        (Created, Deleted) => None,
        (Created, Created | Modified) => Some(Created),
        (Modified, Created | Modified) => Some(Modified),
        (Modified, Deleted) => Some(Deleted),
        (Deleted, Created) => Some(Modified),
        (Deleted, Modified | Deleted) => Some(Deleted),
    }
}

/// One change to one variable, identified by its qualified name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub variable: String,
    pub change: ChangeType,
}

impl ChangeRecord {
    pub fn new(variable: impl Into<String>, change: ChangeType) -> Self {
        Self {
            variable: variable.into(),
            change,
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.change, self.variable)
    }
}

/// Ordered change records of the current batch
///
/// Records keep the position of their first report. Single writer only.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    records: Vec<ChangeRecord>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, variable: &str, change: ChangeType) {
        match self.records.iter().position(|r| r.variable == variable) {
            None => self.records.push(ChangeRecord::new(variable, change)),
            Some(index) => match merge(self.records[index].change, change) {
                Some(merged) => self.records[index].change = merged,
                None => {
                    self.records.remove(index);
                }
            },
        }
    }

    /// Move a pending record to a new identity
    ///
    /// Used when a variable is renamed so an earlier CREATED stays attached.
    pub fn rekey(&mut self, old: &str, new: &str) {
        if let Some(record) = self.records.iter_mut().find(|r| r.variable == old) {
            record.variable = new.to_string();
        }
    }

    /// Fold another batch into this one, in its order
    pub fn absorb(&mut self, other: &ChangeTracker) {
        for record in &other.records {
            self.record(&record.variable, record.change);
        }
    }

    pub fn snapshot(&self) -> Vec<ChangeRecord> {
        self.records.clone()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn get(&self, variable: &str) -> Option<ChangeType> {
        self.records
            .iter()
            .find(|r| r.variable == variable)
            .map(|r| r.change)
    }

    pub fn count(&self, change: ChangeType) -> usize {
        self.records.iter().filter(|r| r.change == change).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeType::*;
    use super::*;

    #[test]
    fn test_merge_all_pairs() {
        let table = [
            (Created, Created, Some(Created)),
            (Created, Modified, Some(Created)),
            (Created, Deleted, None),
            (Modified, Created, Some(Modified)),
            (Modified, Modified, Some(Modified)),
            (Modified, Deleted, Some(Deleted)),
            (Deleted, Created, Some(Modified)),
            (Deleted, Modified, Some(Deleted)),
            (Deleted, Deleted, Some(Deleted)),
        ];
        for (previous, next, expected) in table {
            assert_eq!(merge(previous, next), expected, "{} then {}", previous, next);
        }
    }

    #[test]
    fn test_create_then_delete_cancels() {
        let mut tracker = ChangeTracker::new();
        tracker.record("P::x", Created);
        tracker.record("P::y", Modified);
        tracker.record("P::x", Deleted);
        assert_eq!(tracker.snapshot(), vec![ChangeRecord::new("P::y", Modified)]);
    }

    #[test]
    fn test_record_keeps_first_position() {
        let mut tracker = ChangeTracker::new();
        tracker.record("a", Modified);
        tracker.record("b", Created);
        tracker.record("a", Deleted);
        let names: Vec<_> = tracker.records().iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["DELETED a", "CREATED b"]);
    }

    #[test]
    fn test_rekey_keeps_created() {
        let mut tracker = ChangeTracker::new();
        tracker.record("P::old", Created);
        tracker.rekey("P::old", "P::new");
        tracker.record("P::new", Modified);
        assert_eq!(tracker.get("P::new"), Some(Created));
        assert_eq!(tracker.get("P::old"), None);
    }

    #[test]
    fn test_absorb_and_clear() {
        let mut session = ChangeTracker::new();
        session.record("a", Created);
        let mut batch = ChangeTracker::new();
        batch.record("a", Deleted);
        batch.record("b", Modified);
        session.absorb(&batch);
        assert_eq!(session.len(), 1);
        assert_eq!(session.count(Modified), 1);
        session.clear();
        assert!(session.is_empty());
    }
}
