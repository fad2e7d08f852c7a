//! Case-insensitive substring filter over fetched messages.

use crate::model::message::Message;
use crate::model::page::MessageView;

/// Anything the search filter can match against.
pub trait Searchable {
    fn sender(&self) -> &str;
    fn content(&self) -> &str;

    /// `needle` must already be lower-cased.
    fn matches_lowered(&self, needle: &str) -> bool {
        self.content().to_lowercase().contains(needle)
            || self.sender().to_lowercase().contains(needle)
    }
}

impl Searchable for Message {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn content(&self) -> &str {
        &self.content
    }
}

impl Searchable for MessageView {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// The filtered projection of a message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilteredView {
    /// No query: the view is the whole list.
    All { len: usize },
    /// Positions into the list of the messages that matched, ascending.
    Subset(Vec<usize>),
}

impl Default for FilteredView {
    fn default() -> Self {
        Self::All { len: 0 }
    }
}

impl FilteredView {
    /// Filter `items` by `query`. A blank query selects everything without
    /// copying.
    pub fn compute<T: Searchable>(items: &[T], query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() {
            return Self::All { len: items.len() };
        }
        let needle = query.to_lowercase();
        Self::Subset(
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.matches_lowered(&needle))
                .map(|(i, _)| i)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::All { len } => *len,
            Self::Subset(hits) => hits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Subset(_))
    }

    /// Position in the underlying list of the `pos`-th visible message.
    pub fn resolve(&self, pos: usize) -> Option<usize> {
        match self {
            Self::All { len } => (pos < *len).then_some(pos),
            Self::Subset(hits) => hits.get(pos).copied(),
        }
    }

    /// View position of list position `index`, if it is visible.
    pub fn position_of(&self, index: usize) -> Option<usize> {
        match self {
            Self::All { len } => (index < *len).then_some(index),
            Self::Subset(hits) => hits.binary_search(&index).ok(),
        }
    }
}

/// Iterate over the messages in `items` matching `query`, with their
/// positions.
pub fn search<'a, T: Searchable>(
    items: &'a [T],
    query: &str,
) -> impl Iterator<Item = (usize, &'a T)> + 'a {
    let needle = query.trim().to_lowercase();
    items
        .iter()
        .enumerate()
        .filter(move |(_, item)| needle.is_empty() || item.matches_lowered(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn msg(sender: &str, content: &str) -> Message {
        Message {
            timestamp: NaiveDate::from_ymd_opt(2021, 5, 8)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            sender: sender.into(),
            content: content.into(),
            attachments: Vec::new(),
            is_system_message: false,
        }
    }

    #[test]
    fn test_blank_query_is_all() {
        let items = vec![msg("Marc", "a"), msg("Noemí", "b")];
        assert_eq!(FilteredView::compute(&items, "   "), FilteredView::All { len: 2 });
    }

    #[test]
    fn test_matches_content_or_sender_case_insensitive() {
        let items = vec![
            msg("Marc", "Anem a la PLATJA"),
            msg("Noemí", "d'acord"),
            msg("Platja Club", "reserva"),
        ];
        let view = FilteredView::compute(&items, "platja");
        assert_eq!(view, FilteredView::Subset(vec![0, 2]));
        assert_eq!(view.resolve(1), Some(2));
        assert_eq!(view.resolve(2), None);
        assert_eq!(view.position_of(2), Some(1));
        assert_eq!(view.position_of(1), None);
    }

    #[test]
    fn test_no_match_is_empty() {
        let items = vec![msg("Marc", "hola")];
        let view = FilteredView::compute(&items, "adeu");
        assert!(view.is_empty());
        assert!(view.is_filtered());
    }

    #[test]
    fn test_search_iterator() {
        let items = vec![msg("Marc", "hola"), msg("Noemí", "HOLA!"), msg("Marc", "adeu")];
        let hits: Vec<usize> = search(&items, "Hola").map(|(i, _)| i).collect();
        assert_eq!(hits, vec![0, 1]);
    }
}
