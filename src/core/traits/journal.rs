use crate::core::errors::Result;
use crate::core::models::journal_entry::JournalEntry;

/// Port for recording and querying executed steps.
pub trait RunJournal: Send + Sync {
    /// Append an entry to the journal.
    fn record(&self, entry: &JournalEntry) -> Result<()>;

    /// Query all entries, optionally since a point in time.
    fn query(&self, since: Option<chrono::DateTime<chrono::Utc>>) -> Result<Vec<JournalEntry>>;
}
