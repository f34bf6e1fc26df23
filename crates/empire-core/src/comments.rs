//! Comment threads: flat rows in, a forest of nested replies out.
//!
//! Rows are linked with an explicit two-pass map-then-link build: first an
//! id-keyed index over every row, then each reply is attached to its parent
//! found through the index. Assembly walks an explicit stack rather than
//! recursing per reply level.
//!
//! Serializing and dropping a [`Threaded`] tree still recurse once per level,
//! so threads are capped at [`MAX_REPLY_DEPTH`] when replies are written.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};

/// Deepest allowed reply. Roots are depth 0.
///
/// Also keeps subtree deletion well inside SQLite's limit on cascading
/// foreign-key actions.
pub const MAX_REPLY_DEPTH: i64 = 32;

/// Depth of a new reply under a parent at `parent_depth`.
pub fn reply_depth(parent_depth: i64) -> Result<i64> {
    let depth = parent_depth.saturating_add(1);
    if depth > MAX_REPLY_DEPTH {
        return Err(Error::validation(format!(
            "Replies cannot be nested more than {MAX_REPLY_DEPTH} levels deep"
        )));
    }
    Ok(depth)
}

/// A row that can take part in a reply tree.
pub trait Threadable {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
}

/// A node with its replies nested beneath it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threaded<T> {
    #[serde(flatten)]
    pub node: T,
    pub replies: Vec<Threaded<T>>,
}

impl<T> Threaded<T> {
    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(Self::size).sum::<usize>()
    }
}

/// Root comments of a subject, plus the count of every row loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forest<T> {
    pub comments: Vec<Threaded<T>>,
    pub total: usize,
}

/// Build the forest from rows in creation order.
///
/// Roots and siblings keep the input order. A reply whose parent is not in
/// `rows` is dropped, together with its own replies; so are rows caught in
/// a parent cycle. `total` is always `rows.len()`.
pub fn build_forest<T: Threadable>(rows: Vec<T>) -> Forest<T> {
    let total = rows.len();

    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.id().to_string(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); total];
    let mut roots = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match row.parent_id() {
            None => roots.push(i),
            Some(parent) => {
                if let Some(&p) = index.get(parent) {
                    if p != i {
                        children[p].push(i);
                    }
                }
            }
        }
    }

    let order = post_order(&roots, &children);

    let mut slots: Vec<Option<T>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<Threaded<T>>> = (0..total).map(|_| None).collect();
    for i in order {
        let Some(node) = slots[i].take() else {
            continue;
        };
        let replies = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(Threaded { node, replies });
    }

    let comments = roots.iter().filter_map(|&r| built[r].take()).collect();
    Forest { comments, total }
}

/// Children before parents, reachable from `roots` only.
fn post_order(roots: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(children.len());
    let mut visited = vec![false; children.len()];
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if visited[node] {
            continue;
        }
        visited[node] = true;
        stack.push((node, true));
        for &child in children[node].iter().rev() {
            if !visited[child] {
                stack.push((child, false));
            }
        }
    }
    order
}
