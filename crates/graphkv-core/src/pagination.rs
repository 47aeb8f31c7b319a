//! Cursor pagination (spec §4.4), shared between relationship listing and
//! entity `listQuery`'s paginated mode. Operates over an already-ordered
//! list of ids; callers supply the order (lexical `BTreeSet` order for
//! relationships, KV prefix order for entities).

use crate::error::{ErrorOrigin, InternalError, Result};

///
/// PageArgs
/// The four pagination knobs a caller may supply. `first`/`last` bound the
/// page size from the front/back; `before`/`after` are cursor tokens —
/// entity or neighbor ids already present in the ordered sequence.
///

#[derive(Clone, Debug, Default)]
pub struct PageArgs {
    pub first: Option<usize>,
    pub last: Option<usize>,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl PageArgs {
    #[must_use]
    pub const fn is_paginated(&self) -> bool {
        self.first.is_some() || self.last.is_some() || self.before.is_some() || self.after.is_some()
    }

    fn validate(&self) -> Result<()> {
        if self.first.is_some() && self.before.is_some() {
            return Err(InternalError::bad_request(
                ErrorOrigin::Relation,
                "cannot combine `first` with `before`",
            ));
        }
        if self.last.is_some() && self.after.is_some() {
            return Err(InternalError::bad_request(
                ErrorOrigin::Relation,
                "cannot combine `last` with `after`",
            ));
        }
        if self.first.is_some() && self.last.is_some() {
            return Err(InternalError::bad_request(
                ErrorOrigin::Relation,
                "cannot combine `first` with `last`",
            ));
        }
        Ok(())
    }
}

///
/// Page
/// One page of ids plus the `hasBefore`/`hasAfter` continuation flags.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page {
    pub items: Vec<String>,
    pub has_before: bool,
    pub has_after: bool,
}

/// Apply `args` to an ordered list of ids, per spec §4.4's algorithm.
///
/// `after` resolves to an inclusive start at `idxOf(after) + 1`; `before`
/// resolves to an inclusive end at `idxOf(before) - 1`. A cursor token not
/// present in `ordered` is `NotFound`. Forbidden combinations
/// (`first`+`before`, `last`+`after`, `first`+`last`) are `BadRequest`.
pub fn paginate(ordered: &[String], args: &PageArgs) -> Result<Page> {
    args.validate()?;

    if ordered.is_empty() {
        return Ok(Page {
            items: Vec::new(),
            has_before: false,
            has_after: false,
        });
    }

    let last_index = ordered.len() - 1;

    let mut start = match &args.after {
        Some(cursor) => index_of(ordered, cursor)? + 1,
        None => 0,
    };
    let mut end = match &args.before {
        Some(cursor) => {
            let idx = index_of(ordered, cursor)?;
            if idx == 0 {
                // Nothing precedes the first element.
                return Ok(Page {
                    items: Vec::new(),
                    has_before: false,
                    has_after: ordered.len() > 1,
                });
            }
            idx - 1
        }
        None => last_index,
    };

    if let Some(first) = args.first {
        end = end.min(start.saturating_add(first).saturating_sub(1));
    }
    if let Some(last) = args.last {
        start = start.max((end + 1).saturating_sub(last));
    }

    if start > end || start > last_index {
        return Ok(Page {
            items: Vec::new(),
            has_before: start > 0,
            has_after: end < last_index,
        });
    }

    let has_before = start > 0;
    let has_after = end < last_index;
    let items = ordered[start..=end].to_vec();

    Ok(Page {
        items,
        has_before,
        has_after,
    })
}

fn index_of(ordered: &[String], cursor: &str) -> Result<usize> {
    ordered
        .iter()
        .position(|item| item == cursor)
        .ok_or_else(|| {
            InternalError::not_found(ErrorOrigin::Relation, format!("unknown cursor: {cursor}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn literal_scenario_2_first_2_after_b() {
        // a -> {b, c, d, e}; first:2, after:"b" => ["c", "d"], hasBefore, hasAfter.
        let ordered = ids(&["b", "c", "d", "e"]);
        let page = paginate(
            &ordered,
            &PageArgs {
                first: Some(2),
                after: Some("b".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(page.items, ids(&["c", "d"]));
        assert!(page.has_before);
        assert!(page.has_after);
    }

    #[test]
    fn forbidden_combinations_are_bad_request() {
        let ordered = ids(&["a", "b"]);

        let first_before = paginate(
            &ordered,
            &PageArgs {
                first: Some(1),
                before: Some("b".into()),
                ..Default::default()
            },
        );
        assert!(first_before.is_err());

        let last_after = paginate(
            &ordered,
            &PageArgs {
                last: Some(1),
                after: Some("a".into()),
                ..Default::default()
            },
        );
        assert!(last_after.is_err());

        let first_last = paginate(
            &ordered,
            &PageArgs {
                first: Some(1),
                last: Some(1),
                ..Default::default()
            },
        );
        assert!(first_last.is_err());
    }

    #[test]
    fn unknown_cursor_is_not_found() {
        let ordered = ids(&["a", "b"]);
        let result = paginate(
            &ordered,
            &PageArgs {
                after: Some("missing".into()),
                ..Default::default()
            },
        );
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn no_args_returns_the_full_sequence() {
        let ordered = ids(&["a", "b", "c"]);
        let page = paginate(&ordered, &PageArgs::default()).unwrap();
        assert_eq!(page.items, ordered);
        assert!(!page.has_before);
        assert!(!page.has_after);
    }

    #[test]
    fn last_trims_from_the_end() {
        let ordered = ids(&["a", "b", "c", "d"]);
        let page = paginate(
            &ordered,
            &PageArgs {
                last: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.items, ids(&["c", "d"]));
        assert!(page.has_before);
        assert!(!page.has_after);
    }
}
