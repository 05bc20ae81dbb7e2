use std::collections::HashSet;

use crate::provider::Fragment;
use crate::state::Citation;

/// Running state of one streamed reply: the text so far and the citations
/// seen so far, deduplicated by URI in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TurnFold {
    text: String,
    citations: Vec<Citation>,
    seen: HashSet<String>,
    fragments: usize,
}

impl TurnFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, fragment: Fragment) {
        self.fragments += 1;
        self.text.push_str(&fragment.text);

        for citation in fragment.citations {
            // First-seen title wins; later duplicates of a URI are dropped.
            if self.seen.insert(citation.uri.clone()) {
                self.citations.push(citation);
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str, citations: &[(&str, &str)]) -> Fragment {
        Fragment {
            text: text.to_string(),
            citations: citations
                .iter()
                .map(|(title, uri)| Citation::new(*title, *uri))
                .collect(),
        }
    }

    #[test]
    fn text_is_concatenated_in_arrival_order() {
        let mut fold = TurnFold::new();
        fold.absorb(fragment("I hear ", &[]));
        fold.absorb(fragment("", &[]));
        fold.absorb(fragment("you. ", &[]));

        assert_eq!(fold.text(), "I hear you. ");
        assert_eq!(fold.fragment_count(), 3);
        assert!(fold.citations().is_empty());
    }

    #[test]
    fn duplicate_uri_keeps_first_title() {
        let mut fold = TurnFold::new();
        fold.absorb(fragment("See ", &[("A", "u1")]));
        fold.absorb(fragment("here.", &[("A2", "u1"), ("B", "u2")]));

        assert_eq!(fold.text(), "See here.");
        assert_eq!(
            fold.citations(),
            &[Citation::new("A", "u1"), Citation::new("B", "u2")]
        );
    }

    #[test]
    fn duplicates_within_one_fragment_collapse() {
        let mut fold = TurnFold::new();
        fold.absorb(fragment("x", &[("B", "u2"), ("A", "u1"), ("B again", "u2")]));

        let uris: Vec<&str> = fold.citations().iter().map(|c| c.uri.as_str()).collect();
        assert_eq!(uris, vec!["u2", "u1"]);
    }
}
