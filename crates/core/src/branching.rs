//! Branch navigation and active-path selection logic.
//!
//! Messages in a conversation form a forest linked by `parent_id`. Siblings
//! sharing a parent are alternative branches of the same turn; at most one
//! sibling per parent is active, and following active children down from a
//! root yields the displayed transcript.
//!
//! Everything here is pure and synchronous. The repository layer loads the
//! relevant rows, maps them into [`BranchCandidate`] views, and applies the
//! results inside its own transaction.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Projection of a message row carrying only what branch computations need.
#[derive(Debug, Clone)]
pub struct BranchCandidate {
    pub id: DbId,
    pub branch_index: i32,
    pub created_at: Timestamp,
    /// Soft-deleted rows are excluded from every sibling computation.
    pub deleted: bool,
    pub model: Option<String>,
}

/// Sibling projection returned to branch-switcher UIs.
#[derive(Debug, Clone, Serialize)]
pub struct BranchSibling {
    pub id: DbId,
    pub branch_index: i32,
    pub created_at: Timestamp,
    pub model: Option<String>,
}

/// Position of a message among its sibling branches.
///
/// `current_branch` is 1-based for display ("2 / 3").
#[derive(Debug, Clone, Serialize)]
pub struct BranchInfo {
    pub total_branches: i64,
    pub current_branch: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_id: Option<DbId>,
    pub next_id: Option<DbId>,
    pub siblings: Vec<BranchSibling>,
}

// ---------------------------------------------------------------------------
// Branch index assignment
// ---------------------------------------------------------------------------

/// Branch index for a new sibling: the count of live siblings at creation
/// time (0-based). Soft-deleted siblings leave gaps in the sequence; only
/// the relative order matters for display.
pub fn next_branch_index(siblings: &[BranchCandidate]) -> i32 {
    siblings.iter().filter(|s| !s.deleted).count() as i32
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Live siblings sorted ascending by `branch_index`.
fn live_sorted(siblings: &[BranchCandidate]) -> Vec<&BranchCandidate> {
    let mut live: Vec<&BranchCandidate> = siblings.iter().filter(|s| !s.deleted).collect();
    live.sort_by_key(|s| s.branch_index);
    live
}

/// Compute [`BranchInfo`] for `message_id` within its sibling set.
///
/// Returns `None` when `message_id` is not among the live siblings.
pub fn branch_info(siblings: &[BranchCandidate], message_id: DbId) -> Option<BranchInfo> {
    let live = live_sorted(siblings);
    let current = live.iter().position(|s| s.id == message_id)?;
    let total = live.len();

    Some(BranchInfo {
        total_branches: total as i64,
        current_branch: (current + 1) as i64,
        has_previous: current > 0,
        has_next: current + 1 < total,
        previous_id: current.checked_sub(1).map(|i| live[i].id),
        next_id: live.get(current + 1).map(|s| s.id),
        siblings: live
            .iter()
            .map(|s| BranchSibling {
                id: s.id,
                branch_index: s.branch_index,
                created_at: s.created_at,
                model: s.model.clone(),
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Active-path selection
// ---------------------------------------------------------------------------

/// The child to follow when activating a path below a message: the most
/// recently created live child, so a freshly created branch is what gets
/// displayed. Ties on `created_at` go to the higher id (the later insert).
pub fn preferred_child(children: &[BranchCandidate]) -> Option<DbId> {
    children
        .iter()
        .filter(|c| !c.deleted)
        .max_by_key(|c| (c.created_at, c.id))
        .map(|c| c.id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
