use indexmap::IndexSet;

use splitbrain_core::{CellId, CompileError, OpId, Operator, Result};

/// Split the operator group of a crossing connection into a `pre` group
/// (stays with the producer side) and a `post` group (goes to the consumer
/// side).
///
/// Exactly one operator in the group must update `cell`; it anchors the pre
/// group. Every other operator that writes (sets or incs) a cell read by the
/// pre group so far is pulled in transitively, since the update cannot run
/// until those writes have happened on the same side. Whatever remains is
/// the post group. Relative order within each group is preserved.
pub fn split_group(
    ops: &[Operator],
    group: &[OpId],
    cell: CellId,
    location: &str,
) -> Result<(Vec<OpId>, Vec<OpId>)> {
    let updaters: Vec<OpId> = group
        .iter()
        .filter(|id| ops[id.index()].updates().iter().any(|r| r.key == cell))
        .copied()
        .collect();

    if updaters.len() != 1 {
        return Err(CompileError::SplitUpdateCount {
            location: location.to_string(),
            cell: cell.key(),
            found: updaters.len(),
        });
    }

    let updater = updaters[0];
    let mut pre = vec![updater];
    let mut reads: IndexSet<CellId> = ops[updater.index()]
        .reads()
        .iter()
        .map(|r| r.key)
        .collect();
    let mut post: Vec<OpId> = group.iter().filter(|&&id| id != updater).copied().collect();

    loop {
        let mut pulled = Vec::new();
        for &id in &post {
            let op = &ops[id.index()];
            let writes_read_cell = op
                .sets()
                .iter()
                .chain(op.incs().iter())
                .any(|r| reads.contains(&r.key));

            if writes_read_cell {
                pre.push(id);
                reads.extend(op.reads().iter().map(|r| r.key));
                pulled.push(id);
            }
        }
        if pulled.is_empty() {
            break;
        }
        post.retain(|id| !pulled.contains(id));
    }

    Ok((pre, post))
}
