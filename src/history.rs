//! History list policy: most-recent-first, capped, removable by id.

use crate::domain::HistoryEntry;

pub const MAX_HISTORY: usize = 20;

/// Put `entry` at the front and evict the oldest beyond `MAX_HISTORY`.
pub fn push_capped(list: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
  list.insert(0, entry);
  list.truncate(MAX_HISTORY);
}

/// Returns whether anything was removed.
pub fn remove(list: &mut Vec<HistoryEntry>, id: &str) -> bool {
  let before = list.len();
  list.retain(|e| e.id != id);
  list.len() != before
}

pub fn find<'a>(list: &'a [HistoryEntry], id: &str) -> Option<&'a HistoryEntry> {
  list.iter().find(|e| e.id == id)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{GeneratedDocument, GenerationRequest};

  fn entry(n: usize) -> HistoryEntry {
    HistoryEntry::from_document(&GeneratedDocument::new(format!("doc {n}"), GenerationRequest::new(format!("topic {n}"))))
  }

  #[test]
  fn keeps_twenty_most_recent_first() {
    let mut list = Vec::new();
    for n in 1..=25 {
      push_capped(&mut list, entry(n));
    }
    assert_eq!(list.len(), MAX_HISTORY);
    let contents: Vec<_> = list.iter().map(|e| e.content.clone()).collect();
    let expected: Vec<_> = (6..=25).rev().map(|n| format!("doc {n}")).collect();
    assert_eq!(contents, expected);
  }

  #[test]
  fn remove_and_find_by_id() {
    let mut list = vec![entry(1), entry(2)];
    let id = list[1].id.clone();
    assert_eq!(find(&list, &id).map(|e| e.content.as_str()), Some("doc 2"));
    assert!(remove(&mut list, &id));
    assert!(!remove(&mut list, &id));
    assert_eq!(list.len(), 1);
    assert!(find(&list, &id).is_none());
  }
}
