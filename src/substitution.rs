//! `$name` expansion inside token text.

use crate::env::VariableStore;

/// Characters that end a variable name. The boundary itself is kept in the output.
pub const NAME_BOUNDARIES: [char; 5] = [' ', '=', '.', ',', '|'];

/// Returns `true` if `ch` ends a `$name` reference.
pub fn is_name_boundary(ch: char) -> bool {
    NAME_BOUNDARIES.contains(&ch)
}

/// Replace every `$name` reference in `text` with its value from `store`.
///
/// A name runs from just after `$` up to the next boundary character, the next
/// `$`, or the end of the text. Unknown names expand to the empty string, so a
/// lone `$` disappears. References are expanded left to right, each one on its own.
pub fn substitute(text: &str, store: &VariableStore) -> String {
    if !text.contains('$') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            // `$` is not in NAME_BOUNDARIES but still ends the name: `$x$y`
            // expands both references instead of looking up `x$y` or keeping only `$y`.
            if next == '$' || is_name_boundary(next) {
                break;
            }
            name.push(next);
            chars.next();
        }
        out.push_str(store.lookup(&name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store.assign("i", "4");
        store.assign("name", "world");
        store.assign("dir", "/tmp");
        store
    }

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(substitute("hello", &store()), "hello");
    }

    #[test]
    fn test_whole_token_reference() {
        assert_eq!(substitute("$i", &store()), "4");
    }

    #[test]
    fn test_unknown_reference_is_empty() {
        assert_eq!(substitute("$j", &store()), "");
        assert_eq!(substitute("a$j", &store()), "a");
    }

    #[test]
    fn test_boundaries_are_preserved() {
        let store = store();
        assert_eq!(substitute("hello $name.", &store), "hello world.");
        assert_eq!(substitute("$i,$i", &store), "4,4");
        assert_eq!(substitute("x=$i=y", &store), "x=4=y");
        assert_eq!(substitute("$i|$i", &store), "4|4");
    }

    #[test]
    fn test_adjacent_references_expand_independently() {
        assert_eq!(substitute("$i$name", &store()), "4world");
    }

    #[test]
    fn test_slash_is_part_of_the_name() {
        // "dir/" is looked up as a whole, only the second reference resolves
        assert_eq!(substitute("$dir/$name", &store()), "world");
    }

    #[test]
    fn test_lone_dollar_vanishes() {
        assert_eq!(substitute("$", &store()), "");
        assert_eq!(substitute("cost $ now", &store()), "cost  now");
    }
}
