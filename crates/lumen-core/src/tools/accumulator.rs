//! Merging of streamed tool-call fragments

use super::types::ToolCall;
use std::collections::BTreeMap;

/// Collects partial tool calls across stream chunks, keyed by `index`
///
/// The first non-empty `id`/`name` win, argument text is concatenated in
/// arrival order and the latest thought signature is kept.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the tool-call fragments of one chunk
    pub fn merge(&mut self, fragments: &[ToolCall]) {
        for fragment in fragments {
            match self.calls.get_mut(&fragment.index) {
                None => {
                    self.calls.insert(fragment.index, fragment.clone());
                }
                Some(existing) => {
                    if existing.id.is_empty() && !fragment.id.is_empty() {
                        existing.id = fragment.id.clone();
                    }
                    if existing.name.is_empty() && !fragment.name.is_empty() {
                        existing.name = fragment.name.clone();
                    }
                    existing.arguments.push_str(&fragment.arguments);
                    if fragment.thought_signature.is_some() {
                        existing.thought_signature = fragment.thought_signature.clone();
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Hand out the completed calls in index order and reset
    pub fn flush(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(index: usize, id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall::new(index, id, name, args)
    }

    #[test]
    fn test_merge_concatenates_arguments() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&[fragment(0, "call_1", "get_weather", r#"{"city":"#)]);
        acc.merge(&[fragment(0, "", "", r#""Paris"}"#)]);

        let calls = acc.flush();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, r#"{"city":"Paris"}"#);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_first_non_empty_id_and_name_win() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&[fragment(0, "", "", "{")]);
        acc.merge(&[fragment(0, "call_a", "", "")]);
        acc.merge(&[fragment(0, "call_b", "search", "\"q\":1")]);
        acc.merge(&[fragment(0, "", "other", "}")]);

        let calls = acc.flush();
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments, "{\"q\":1}");
    }

    #[test]
    fn test_parallel_calls_keyed_by_index() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&[fragment(1, "b", "second", "{"), fragment(0, "a", "first", "{")]);
        acc.merge(&[fragment(0, "", "", "}"), fragment(1, "", "", "}")]);

        let calls = acc.flush();
        assert_eq!(acc.len(), 0);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "first");
        assert_eq!(calls[1].name, "second");
        assert!(calls.iter().all(|c| c.arguments == "{}"));
    }

    #[test]
    fn test_latest_thought_signature_kept() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(&[fragment(0, "a", "t", "").with_thought_signature("sig-1")]);
        acc.merge(&[fragment(0, "", "", "")]);
        assert_eq!(acc.flush()[0].thought_signature.as_deref(), Some("sig-1"));

        acc.merge(&[fragment(0, "a", "t", "").with_thought_signature("sig-1")]);
        acc.merge(&[fragment(0, "", "", "").with_thought_signature("sig-2")]);
        assert_eq!(acc.flush()[0].thought_signature.as_deref(), Some("sig-2"));
    }
}
