//! Role hierarchy traversal
//!
//! `hierarchical_roles` lists form a directed graph keyed by role name.
//! Writes reject any edit that would close a cycle; reads walk the graph
//! with a visited set and deterministically skip anything already seen, so
//! legacy cycles in stored data cannot hang resolution.

use shared::models::Role;
use std::collections::{HashMap, HashSet, VecDeque};

/// Probe whether giving role `name` the inheritance list `hierarchy` would
/// close a cycle. Returns the offending path (`a -> b -> a`) if so.
///
/// Edges for `name` come from the candidate list; edges for every other node
/// come from the stored roles. Names without a stored role are dangling and
/// terminate the walk.
pub fn detect_cycle(
    name: &str,
    hierarchy: &[String],
    roles_by_name: &HashMap<String, Role>,
) -> Option<Vec<String>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut path: Vec<String> = Vec::new();
    let mut path_set: HashSet<String> = HashSet::new();
    // DFS with explicit exit markers so the current path is tracked exactly
    let mut stack: Vec<(String, bool)> = vec![(name.to_string(), false)];

    while let Some((current, is_exit)) = stack.pop() {
        if is_exit {
            path.pop();
            path_set.remove(&current);
            continue;
        }

        if path_set.contains(&current) {
            let start = path.iter().position(|n| n == &current).unwrap();
            let mut cycle = path[start..].to_vec();
            cycle.push(current);
            return Some(cycle);
        }

        if !visited.insert(current.clone()) {
            continue;
        }

        path.push(current.clone());
        path_set.insert(current.clone());
        stack.push((current.clone(), true));

        for next in edges_of(&current, name, hierarchy, roles_by_name) {
            stack.push((next.clone(), false));
        }
    }

    None
}

fn edges_of<'a>(
    node: &str,
    candidate: &str,
    candidate_hierarchy: &'a [String],
    roles_by_name: &'a HashMap<String, Role>,
) -> &'a [String] {
    if node == candidate {
        candidate_hierarchy
    } else {
        roles_by_name
            .get(node)
            .map(|r| r.hierarchical_roles.as_slice())
            .unwrap_or(&[])
    }
}

/// All valid roles reachable from `start` through `hierarchical_roles`,
/// including `start` itself. Invalid and unknown inherited names are
/// skipped; the visited set makes the walk terminate on any input.
pub fn reachable_roles<'a>(
    start: &'a Role,
    roles_by_name: &'a HashMap<String, Role>,
) -> Vec<&'a Role> {
    let mut visited: HashSet<&str> = HashSet::from([start.name.as_str()]);
    let mut queue: VecDeque<&Role> = VecDeque::from([start]);
    let mut out: Vec<&Role> = Vec::new();

    while let Some(role) = queue.pop_front() {
        out.push(role);
        for next in &role.hierarchical_roles {
            if visited.insert(next.as_str())
                && let Some(inherited) = roles_by_name.get(next)
                && inherited.valid
            {
                queue.push_back(inherited);
            }
        }
    }

    out
}
