//! Block comb heuristic.
//!
//! Handles are the blocks (biconnected components) of the graph of
//! fractional edges. Each handle city grows at most one tooth: either the
//! fractional component hanging off it outside the handle, or an edge at
//! one leaving the handle. An even tooth count drops the loosest tooth.

use std::collections::VecDeque;

use super::blossom::is_one;
use super::{CutTemplate, SepContext, Separator, SupportGraph, ONE_EPS};

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockCombs;

fn is_fractional(val: f64) -> bool {
    val < 1.0 - ONE_EPS
}

/// Blocks of an undirected simple graph, as city lists.
///
/// Bridges come back as two-city blocks and isolated cities are skipped.
pub(crate) fn blocks(adj: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adj.len();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut stamp = vec![usize::MAX; n];
    let mut time = 0;
    let mut edges: Vec<(usize, usize)> = Vec::new();
    let mut out: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        disc[root] = time;
        low[root] = time;
        time += 1;

        // (city, parent, next neighbor to scan)
        let mut stack = vec![(root, usize::MAX, 0usize)];
        while let Some(top) = stack.len().checked_sub(1) {
            let (v, parent, i) = stack[top];
            if i < adj[v].len() {
                stack[top].2 += 1;
                let w = adj[v][i];
                if w == parent {
                    continue;
                }
                if disc[w] == usize::MAX {
                    edges.push((v, w));
                    disc[w] = time;
                    low[w] = time;
                    time += 1;
                    stack.push((w, v, 0));
                } else if disc[w] < disc[v] {
                    edges.push((v, w));
                    low[v] = low[v].min(disc[w]);
                }
                continue;
            }

            stack.pop();
            let Some(&(p, _, _)) = stack.last() else {
                continue;
            };
            low[p] = low[p].min(low[v]);
            if low[v] < disc[p] {
                continue;
            }
            let id = out.len();
            let mut block = Vec::new();
            while let Some((a, b)) = edges.pop() {
                for c in [a, b] {
                    if stamp[c] != id {
                        stamp[c] = id;
                        block.push(c);
                    }
                }
                if (a, b) == (p, v) {
                    break;
                }
            }
            out.push(block);
        }
    }
    out
}

/// `x(delta(T))` for the city set marked in `inside`.
fn boundary_weight(support: &SupportGraph, tooth: &[usize], inside: &[bool]) -> f64 {
    tooth
        .iter()
        .flat_map(|&v| support.neighbors(v))
        .filter(|&&(w, _)| !inside[w])
        .map(|&(_, val)| val)
        .sum()
}

/// Comb on `handle` with disjoint teeth grown from its cities.
pub(crate) fn comb_from_block(support: &SupportGraph, handle: Vec<usize>) -> Option<CutTemplate> {
    let n = support.node_count();
    if handle.len() < 3 || handle.len() >= n {
        return None;
    }
    let mut in_handle = vec![false; n];
    for &v in &handle {
        in_handle[v] = true;
    }
    let mut used = vec![false; n];
    let mut teeth: Vec<Vec<usize>> = Vec::new();

    // Fractional components outside the handle.
    let mut queue = VecDeque::new();
    for &a in &handle {
        let mut tooth = vec![a];
        for &(w, val) in support.neighbors(a) {
            if is_fractional(val) && !in_handle[w] && !used[w] {
                used[w] = true;
                queue.push_back(w);
            }
        }
        while let Some(v) = queue.pop_front() {
            tooth.push(v);
            for &(w, val) in support.neighbors(v) {
                if is_fractional(val) && !in_handle[w] && !used[w] {
                    used[w] = true;
                    queue.push_back(w);
                }
            }
        }
        if tooth.len() > 1 {
            used[a] = true;
            teeth.push(tooth);
        }
    }

    // Edges at one for the handle cities still free.
    for &u in &handle {
        if used[u] {
            continue;
        }
        let partner = support
            .neighbors(u)
            .iter()
            .find(|&&(v, val)| is_one(val) && !in_handle[v] && !used[v]);
        if let Some(&(v, _)) = partner {
            used[u] = true;
            used[v] = true;
            teeth.push(vec![u, v]);
        }
    }

    if teeth.len() % 2 == 0 && teeth.len() >= 4 {
        let mut inside = vec![false; n];
        let weights: Vec<f64> = teeth
            .iter()
            .map(|t| {
                t.iter().for_each(|&v| inside[v] = true);
                let w = boundary_weight(support, t, &inside);
                t.iter().for_each(|&v| inside[v] = false);
                w
            })
            .collect();
        let loosest = weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)?;
        teeth.swap_remove(loosest);
    }
    if teeth.len() < 3 || teeth.len() % 2 == 0 {
        return None;
    }
    Some(CutTemplate::Comb { handle, teeth })
}

impl Separator for BlockCombs {
    fn name(&self) -> &'static str {
        "block_comb"
    }

    fn try_separate<'a>(
        &'a self,
        ctx: &'a SepContext<'a>,
    ) -> Box<dyn Iterator<Item = CutTemplate> + 'a> {
        let support = ctx.support();
        let adj: Vec<Vec<usize>> = (0..support.node_count())
            .map(|v| {
                support
                    .neighbors(v)
                    .iter()
                    .filter(|&&(_, val)| is_fractional(val))
                    .map(|&(w, _)| w)
                    .collect()
            })
            .collect();
        let handles = blocks(&adj);
        Box::new(
            handles
                .into_iter()
                .filter_map(move |h| comb_from_block(&support, h)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Tour};

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn test_blocks_of_bowtie_with_tail() {
        // Triangles {0,1,2} and {2,3,4} share 2; bridge 4-5.
        let mut adj = vec![Vec::new(); 7];
        for (u, v) in [(0, 1), (1, 2), (0, 2), (2, 3), (3, 4), (2, 4), (4, 5)] {
            adj[u].push(v);
            adj[v].push(u);
        }
        let mut found: Vec<Vec<usize>> = blocks(&adj).into_iter().map(sorted).collect();
        found.sort();
        assert_eq!(found, vec![vec![0, 1, 2], vec![2, 3, 4], vec![4, 5]]);
    }

    /// Fractional triangles {0,1,2} and {0,3,4} at 1/2 sharing city 0,
    /// with edges (1,5) and (2,6) at one.
    fn bowtie_point() -> (CoreGraph, Vec<f64>) {
        let mut graph = CoreGraph::new(7);
        let mut x = Vec::new();
        for (u, v) in [(0, 1), (1, 2), (0, 2), (0, 3), (3, 4), (0, 4)] {
            graph.add_edge(u, v, 1.0);
            x.push(0.5);
        }
        for (u, v) in [(1, 5), (2, 6)] {
            graph.add_edge(u, v, 1.0);
            x.push(1.0);
        }
        (graph, x)
    }

    #[test]
    fn test_comb_on_shared_city() {
        let (graph, x) = bowtie_point();
        let tour = Tour::new((0..7).collect()).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);

        let found: Vec<CutTemplate> = BlockCombs.try_separate(&ctx).collect();
        assert_eq!(found.len(), 1);
        let CutTemplate::Comb { handle, teeth } = &found[0] else {
            panic!("expected a comb");
        };
        assert_eq!(sorted(handle.clone()), vec![0, 1, 2]);
        let mut teeth: Vec<Vec<usize>> = teeth.iter().cloned().map(sorted).collect();
        teeth.sort();
        assert_eq!(teeth, vec![vec![0, 3, 4], vec![1, 5], vec![2, 6]]);

        // 3 + 1 + 1 + 1 against 10
        assert!((found[0].violation(&ctx) - 4.0).abs() < 1e-9);
        assert!(found[0].tour_slack(&tour) >= 0.0);
    }

    #[test]
    fn test_integral_point_has_no_handles() {
        let mut graph = CoreGraph::new(5);
        let mut x = Vec::new();
        for v in 0..5 {
            graph.add_edge(v, (v + 1) % 5, 1.0);
            x.push(1.0);
        }
        let tour = Tour::new((0..5).collect()).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);
        assert_eq!(BlockCombs.try_separate(&ctx).count(), 0);
    }
}
