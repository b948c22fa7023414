use crate::domain::{AppId, GameRecord};

/// Stable reference to a record in the unfiltered batch.
///
/// Handles carry the batch generation, so one obtained before a refresh never
/// resolves against the records that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    generation: u64,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct VisibleRecord<'a> {
    pub handle: RecordHandle,
    pub record: &'a GameRecord,
}

/// The fetched batch plus the live name filter.
#[derive(Debug, Default)]
pub struct GameLibrary {
    records: Vec<GameRecord>,
    filter: String,
    filter_lower: String,
    generation: u64,
}

impl GameLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, records: Vec<GameRecord>) {
        self.records = records
            .into_iter()
            .map(|mut record| {
                record.selected = false;
                record
            })
            .collect();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        self.filter_lower = text.to_lowercase();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn visible_records(&self) -> Vec<VisibleRecord<'_>> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches(record))
            .map(|(index, record)| VisibleRecord {
                handle: RecordHandle {
                    generation: self.generation,
                    index,
                },
                record,
            })
            .collect()
    }

    pub fn get(&self, handle: RecordHandle) -> Option<&GameRecord> {
        if handle.generation != self.generation {
            return None;
        }
        self.records.get(handle.index)
    }

    /// Flip `selected` on the record behind `handle`. Returns `false` when the
    /// handle belongs to a replaced batch.
    pub fn toggle(&mut self, handle: RecordHandle) -> bool {
        if handle.generation != self.generation {
            return false;
        }
        match self.records.get_mut(handle.index) {
            Some(record) => {
                record.selected = !record.selected;
                true
            }
            None => false,
        }
    }

    pub fn toggle_app(&mut self, app_id: &AppId) -> bool {
        match self.records.iter_mut().find(|record| &record.app_id == app_id) {
            Some(record) => {
                record.selected = !record.selected;
                true
            }
            None => false,
        }
    }

    pub fn selected_records(&self) -> Vec<GameRecord> {
        self.records
            .iter()
            .filter(|record| record.selected)
            .cloned()
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.records.iter().filter(|record| record.selected).count()
    }

    fn matches(&self, record: &GameRecord) -> bool {
        self.filter_lower.is_empty() || record.name.to_lowercase().contains(&self.filter_lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> GameRecord {
        GameRecord::new(id.parse().unwrap(), name)
    }

    #[test]
    fn stale_handle_is_a_no_op() {
        let mut library = GameLibrary::new();
        library.replace_all(vec![record("10", "Half-Life")]);
        let handle = library.visible_records()[0].handle;

        library.replace_all(vec![record("10", "Half-Life")]);
        assert!(!library.toggle(handle));
        assert!(library.selected_records().is_empty());
        assert!(library.get(handle).is_none());
    }

    #[test]
    fn toggle_twice_restores() {
        let mut library = GameLibrary::new();
        library.replace_all(vec![record("10", "Half-Life")]);
        let handle = library.visible_records()[0].handle;
        assert!(library.toggle(handle));
        assert!(library.toggle(handle));
        assert_eq!(library.selected_count(), 0);
    }

    #[test]
    fn empty_filter_matches_empty_name() {
        let mut library = GameLibrary::new();
        library.replace_all(vec![record("1", "")]);
        library.set_filter("");
        assert_eq!(library.visible_records().len(), 1);
    }
}
