//! Query text edits as explicit intents.
//!
//! An edit carries its own focus instruction, so whoever renders the query
//! inputs learns where the cursor belongs from the edit outcome instead of
//! from a remembered "last focused input".

/// Where to put the cursor after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTarget {
    pub query_index: usize,
    /// Cursor position in characters.
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryChange {
    Replace(String),
    /// Inserts text at a character position, e.g. a metric name picked
    /// from a list.
    Insert { cursor: usize, text: String },
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEdit {
    pub index: usize,
    pub change: QueryChange,
    pub restore_focus: bool,
}

impl QueryEdit {
    pub fn replace(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            change: QueryChange::Replace(text.into()),
            restore_focus: false,
        }
    }

    pub fn insert(index: usize, cursor: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            change: QueryChange::Insert {
                cursor,
                text: text.into(),
            },
            restore_focus: true,
        }
    }

    pub fn remove(index: usize) -> Self {
        Self {
            index,
            change: QueryChange::Remove,
            restore_focus: false,
        }
    }

    pub fn with_focus(mut self, restore_focus: bool) -> Self {
        self.restore_focus = restore_focus;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOutcome {
    pub changed: bool,
    pub focus: Option<FocusTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryList {
    queries: Vec<String>,
}

fn byte_offset(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

impl QueryList {
    pub fn new(queries: Vec<String>) -> Self {
        Self { queries }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Applies an edit. Replacing or inserting at `len()` appends a new
    /// query; other out-of-range indices change nothing.
    pub fn apply(&mut self, edit: QueryEdit) -> EditOutcome {
        let QueryEdit {
            index,
            change,
            restore_focus,
        } = edit;
        if index > self.queries.len() {
            return EditOutcome::default();
        }
        if index == self.queries.len() {
            let empty = match &change {
                QueryChange::Remove => true,
                QueryChange::Replace(text) => text.is_empty(),
                QueryChange::Insert { text, .. } => text.is_empty(),
            };
            if empty {
                return EditOutcome::default();
            }
            self.queries.push(String::new());
        }

        let cursor = match change {
            QueryChange::Replace(text) => {
                if self.queries[index] == text {
                    return EditOutcome::default();
                }
                let cursor = text.chars().count();
                self.queries[index] = text;
                cursor
            }
            QueryChange::Insert { cursor, text } => {
                if text.is_empty() {
                    return EditOutcome::default();
                }
                let query = &mut self.queries[index];
                let at = byte_offset(query, cursor);
                let cursor = query[..at].chars().count() + text.chars().count();
                query.insert_str(at, &text);
                cursor
            }
            QueryChange::Remove => {
                self.queries.remove(index);
                return EditOutcome {
                    changed: true,
                    focus: None,
                };
            }
        };

        EditOutcome {
            changed: true,
            focus: restore_focus.then_some(FocusTarget {
                query_index: index,
                cursor,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_restores_focus_after_text() {
        let mut list = QueryList::new(vec!["sum()".to_string()]);
        let outcome = list.apply(QueryEdit::insert(0, 4, "up"));

        assert_eq!(list.as_slice(), ["sum(up)"]);
        assert_eq!(
            outcome,
            EditOutcome {
                changed: true,
                focus: Some(FocusTarget {
                    query_index: 0,
                    cursor: 6
                })
            }
        );
    }

    #[test]
    fn test_insert_uses_character_positions() {
        let mut list = QueryList::new(vec!["é{}".to_string()]);
        list.apply(QueryEdit::insert(0, 2, "a=\"b\""));
        assert_eq!(list.as_slice(), ["é{a=\"b\"}"]);

        // Past the end appends
        list.apply(QueryEdit::insert(0, 99, "!"));
        assert_eq!(list.as_slice(), ["é{a=\"b\"}!"]);
    }

    #[test]
    fn test_empty_insert_changes_nothing() {
        let mut list = QueryList::new(vec!["up".to_string()]);
        let outcome = list.apply(QueryEdit::insert(0, 0, ""));
        assert_eq!(outcome, EditOutcome::default());
        assert_eq!(list.as_slice(), ["up"]);
    }

    #[test]
    fn test_replace_without_focus() {
        let mut list = QueryList::new(vec!["up".to_string()]);
        let outcome = list.apply(QueryEdit::replace(0, "node_load1"));
        assert!(outcome.changed);
        assert_eq!(outcome.focus, None);

        let unchanged = list.apply(QueryEdit::replace(0, "node_load1"));
        assert!(!unchanged.changed);
    }

    #[test]
    fn test_append_and_remove() {
        let mut list = QueryList::default();
        assert!(list.apply(QueryEdit::replace(0, "up")).changed);
        assert!(list.apply(QueryEdit::replace(1, "down").with_focus(true)).changed);
        assert_eq!(list.len(), 2);

        assert!(!list.apply(QueryEdit::replace(5, "nope")).changed);
        assert!(!list.apply(QueryEdit::remove(2)).changed);

        assert!(list.apply(QueryEdit::remove(0)).changed);
        assert_eq!(list.as_slice(), ["down"]);

        // An empty append leaves no placeholder behind
        assert!(!list.apply(QueryEdit::replace(1, "")).changed);
        assert_eq!(list.len(), 1);
    }
}
