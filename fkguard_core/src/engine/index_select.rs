use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::Result;
use crate::storage::engine::{ForeignKeyTable, Index};

struct Candidate {
    index: Rc<dyn Index>,
    col_len: usize,
}

/// Finds the best index on `table` whose leading columns are exactly the set
/// `prefix_cols` (in any order).
///
/// Ranking, highest first: an index with exactly as many columns as requested,
/// then unique indexes, then wider indexes, then the lowest index id. With
/// `use_extended_indexes`, indexes that carry an implicit primary-key suffix
/// are matched on that extended column list.
pub fn find_fk_index_with_prefix(
    table: &dyn ForeignKeyTable,
    prefix_cols: &[String],
    use_extended_indexes: bool,
    ignored_indexes: &[&str],
) -> Result<Option<Rc<dyn Index>>> {
    let ignored: HashSet<String> = ignored_indexes.iter().map(|i| i.to_lowercase()).collect();
    let wanted: Vec<String> = prefix_cols.iter().map(|c| c.to_lowercase()).collect();
    let col_len = wanted.len();

    let mut candidates: Vec<Candidate> = Vec::new();
    for index in table.indexes()? {
        if !index.prefix_lengths().is_empty() || index.is_spatial() || index.is_full_text() {
            continue;
        }
        if ignored.contains(&index.id().to_lowercase()) {
            continue;
        }
        let exprs = match (use_extended_indexes, index.as_extended()) {
            (true, Some(ext)) => ext.extended_expressions(),
            _ => index.expressions(),
        };
        let exprs: Vec<String> = exprs.iter().map(|e| e.to_lowercase()).collect();
        if exprs_are_index_prefix(&wanted, &exprs) {
            candidates.push(Candidate {
                col_len: exprs.len(),
                index,
            });
        }
    }

    candidates.sort_by(|a, b| rank(a, b, col_len));
    Ok(candidates.into_iter().next().map(|c| c.index))
}

fn rank(a: &Candidate, b: &Candidate, col_len: usize) -> Ordering {
    let a_exact = a.col_len == col_len;
    let b_exact = b.col_len == col_len;
    b_exact
        .cmp(&a_exact)
        .then_with(|| b.index.is_unique().cmp(&a.index.is_unique()))
        .then_with(|| b.col_len.cmp(&a.col_len))
        .then_with(|| a.index.id().cmp(b.index.id()))
}

/// True when `exprs`, as a set, equals the first `exprs.len()` entries of
/// `index_exprs`. Both sides must already be lowercased.
pub(crate) fn exprs_are_index_prefix(exprs: &[String], index_exprs: &[String]) -> bool {
    if exprs.is_empty() || exprs.len() > index_exprs.len() {
        return false;
    }
    let mut visited = vec![false; index_exprs.len()];
    for expr in exprs {
        let hit = index_exprs
            .iter()
            .enumerate()
            .find(|(j, ie)| !visited[*j] && *ie == expr)
            .map(|(j, _)| j);
        match hit {
            Some(j) => visited[j] = true,
            None => return false,
        }
    }
    let prefix = visited.iter().take_while(|v| **v).count();
    prefix == exprs.len()
}
