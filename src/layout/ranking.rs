use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Longest-path layering of a DAG over nodes `0..n`. Ready nodes are taken
/// in index order so ties follow insertion order.
pub(super) fn compute_ranks(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indeg = vec![0usize; n];
    for &(from, to) in edges {
        adj[from].push(to);
        indeg[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|v| indeg[*v] == 0)
        .map(Reverse)
        .collect();
    let mut ranks = vec![0usize; n];
    let mut processed = 0usize;
    while let Some(Reverse(node)) = ready.pop() {
        processed += 1;
        for &next in &adj[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
            indeg[next] -= 1;
            if indeg[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }
    debug_assert_eq!(processed, n, "ranking input must be acyclic");
    ranks
}

/// Pulls sources down next to their closest successor so that their outgoing
/// edges span as few layers as possible.
pub(super) fn tighten_sources(ranks: &mut [usize], edges: &[(usize, usize)]) {
    let mut has_incoming = vec![false; ranks.len()];
    let mut closest: Vec<Option<usize>> = vec![None; ranks.len()];
    for &(from, to) in edges {
        has_incoming[to] = true;
        closest[from] = Some(closest[from].map_or(ranks[to], |r| r.min(ranks[to])));
    }
    for (node, rank) in ranks.iter_mut().enumerate() {
        if has_incoming[node] {
            continue;
        }
        if let Some(succ) = closest[node] {
            *rank = (*rank).max(succ.saturating_sub(1));
        }
    }
}

/// Median-heuristic ordering. Each pass sweeps down using predecessors and
/// back up using successors; the ordering with the fewest crossings wins.
pub(super) fn order_rank_nodes(
    rank_nodes: &mut [Vec<usize>],
    edges: &[(usize, usize)],
    node_count: usize,
    passes: usize,
    mut keep_going: impl FnMut() -> bool,
) -> usize {
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        outgoing[from].push(to);
        incoming[to].push(from);
    }

    let mut positions = vec![0usize; node_count];
    update_positions(rank_nodes, &mut positions);

    let mut best = rank_nodes.to_vec();
    let mut best_crossings = count_crossings(rank_nodes, &outgoing, &positions);
    if rank_nodes.len() <= 1 || best_crossings == 0 {
        return best_crossings;
    }

    for _ in 0..passes.max(1) {
        if !keep_going() {
            break;
        }
        for rank in 1..rank_nodes.len() {
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len().saturating_sub(1)).rev() {
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        let crossings = count_crossings(rank_nodes, &outgoing, &positions);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = rank_nodes.to_vec();
            if crossings == 0 {
                break;
            }
        }
    }

    rank_nodes.clone_from_slice(&best);
    best_crossings
}

fn update_positions(rank_nodes: &[Vec<usize>], positions: &mut [usize]) {
    for bucket in rank_nodes {
        for (idx, node) in bucket.iter().enumerate() {
            positions[*node] = idx;
        }
    }
}

fn sort_bucket(bucket: &mut [usize], neighbors: &[Vec<usize>], positions: &[usize]) {
    if bucket.len() <= 1 {
        return;
    }
    let mut keyed: Vec<(f64, usize, usize)> = bucket
        .iter()
        .map(|&node| (median_position(node, neighbors, positions), positions[node], node))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    for (slot, (_, _, node)) in bucket.iter_mut().zip(keyed) {
        *slot = node;
    }
}

/// Median index of `node`'s neighbours in the adjacent layer; nodes with no
/// neighbours keep their current index.
pub(super) fn median_position(node: usize, neighbors: &[Vec<usize>], positions: &[usize]) -> f64 {
    let mut values: Vec<f64> = neighbors[node].iter().map(|n| positions[*n] as f64).collect();
    if values.is_empty() {
        return positions[node] as f64;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

/// Pairwise crossing count between consecutive layers. Every edge is
/// expected to join adjacent layers.
pub(super) fn count_crossings(
    rank_nodes: &[Vec<usize>],
    outgoing: &[Vec<usize>],
    positions: &[usize],
) -> usize {
    let mut total = 0;
    for bucket in rank_nodes {
        let mut segments: Vec<(usize, usize)> = Vec::new();
        for &node in bucket {
            for &next in &outgoing[node] {
                segments.push((positions[node], positions[next]));
            }
        }
        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (a0, a1) = segments[i];
                let (b0, b1) = segments[j];
                if (a0 < b0 && a1 > b1) || (a0 > b0 && a1 < b1) {
                    total += 1;
                }
            }
        }
    }
    total
}
