//! Cycle detection over small adjacency maps.

use std::collections::{BTreeMap, BTreeSet};

/// Cycles found by depth-first search, each reported once, starting from
/// its smallest member and closed by repeating it.
///
/// Keys are visited in order, so the result is deterministic.
pub fn find_cycles<K: Ord + Clone>(edges: &BTreeMap<K, Vec<K>>) -> Vec<Vec<K>> {
    fn dfs<K: Ord + Clone>(
        edges: &BTreeMap<K, Vec<K>>,
        node: &K,
        visited: &mut BTreeSet<K>,
        stack: &mut Vec<K>,
        found: &mut BTreeMap<BTreeSet<K>, Vec<K>>,
    ) {
        if let Some(pos) = stack.iter().position(|k| k == node) {
            let mut cycle = stack[pos..].to_vec();
            let members: BTreeSet<K> = cycle.iter().cloned().collect();
            if let Some(min) = cycle.iter().enumerate().min_by(|a, b| a.1.cmp(b.1)).map(|(i, _)| i) {
                cycle.rotate_left(min);
            }
            if let Some(first) = cycle.first().cloned() {
                cycle.push(first);
            }
            found.entry(members).or_insert(cycle);
            return;
        }
        if !visited.insert(node.clone()) {
            return;
        }
        stack.push(node.clone());
        for next in edges.get(node).into_iter().flatten() {
            dfs(edges, next, visited, stack, found);
        }
        stack.pop();
    }

    let mut visited = BTreeSet::new();
    let mut found = BTreeMap::new();
    for node in edges.keys() {
        dfs(edges, node, &mut visited, &mut Vec::new(), &mut found);
    }
    let mut cycles: Vec<Vec<K>> = found.into_values().collect();
    cycles.sort();
    cycles
}

/// Whether `node` can reach itself.
pub fn on_cycle<K: Ord + Clone>(edges: &BTreeMap<K, Vec<K>>, node: &K) -> bool {
    let mut seen = BTreeSet::new();
    let mut todo: Vec<&K> = edges.get(node).into_iter().flatten().collect();
    while let Some(next) = todo.pop() {
        if next == node {
            return true;
        }
        if seen.insert(next) {
            todo.extend(edges.get(next).into_iter().flatten());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(u32, u32)]) -> BTreeMap<u32, Vec<u32>> {
        let mut g: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for &(a, b) in pairs {
            g.entry(a).or_default().push(b);
        }
        g
    }

    #[test]
    fn acyclic() {
        assert!(find_cycles(&graph(&[(1, 2), (2, 3), (1, 3)])).is_empty());
    }

    #[test]
    fn reports_each_cycle_once() {
        let cycles = find_cycles(&graph(&[(3, 1), (1, 2), (2, 3), (4, 4)]));
        assert_eq!(cycles, vec![vec![1, 2, 3, 1], vec![4, 4]]);
    }

    #[test]
    fn membership() {
        let g = graph(&[(1, 2), (2, 1), (2, 5)]);
        assert!(on_cycle(&g, &1));
        assert!(!on_cycle(&g, &5));
    }

    #[test]
    fn two_node_cycle() {
        let cycles = find_cycles(&graph(&[(1, 2), (2, 1), (2, 5)]));
        assert_eq!(cycles, vec![vec![1, 2, 1]]);
    }
}
