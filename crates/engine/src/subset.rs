//! Bounded subset-sum search for multi-invoice candidates.
//!
//! This is the one place combinatorial blowup is possible, so every axis is
//! capped: subset size, visited nodes, and collected solutions. Amounts are
//! sorted descending and branches are cut when the remaining open slots
//! cannot bridge the gap to the target.

/// Most subsets returned per search. The generator scores each one as its own
/// candidate; past this point more subsets only add noise.
const MAX_SUBSETS: usize = 16;

#[derive(Debug)]
pub struct SubsetSearch {
    /// Index sets into the input slice, each summing to the target within
    /// tolerance. Indices are ascending; sets are in discovery order.
    pub subsets: Vec<Vec<usize>>,
    pub nodes_visited: u64,
    /// The node or solution cap stopped the search before it was exhaustive.
    pub cap_hit: bool,
}

/// Find subsets of `amounts` (positive, minor units) of size 2..=`max_size`
/// summing to `target` within `tolerance`.
pub fn find_subsets(
    amounts: &[i64],
    target: i64,
    tolerance: i64,
    max_size: usize,
    max_nodes: usize,
) -> SubsetSearch {
    let mut order: Vec<usize> = (0..amounts.len()).collect();
    // Descending by amount; index as the deterministic tiebreak.
    order.sort_by(|&a, &b| amounts[b].cmp(&amounts[a]).then(a.cmp(&b)));
    let sorted: Vec<i64> = order.iter().map(|&i| amounts[i]).collect();

    // prefix[i] = sum of the i largest amounts; used for the reachability bound.
    let mut prefix = Vec::with_capacity(sorted.len() + 1);
    prefix.push(0i64);
    for &a in &sorted {
        prefix.push(prefix.last().copied().unwrap_or(0) + a);
    }

    let mut search = Search {
        sorted: &sorted,
        prefix: &prefix,
        target,
        tolerance,
        max_size,
        max_nodes: max_nodes as u64,
        stack: Vec::new(),
        subsets: Vec::new(),
        nodes_visited: 0,
        cap_hit: false,
    };
    search.dfs(0, 0);

    let mut subsets: Vec<Vec<usize>> = search
        .subsets
        .iter()
        .map(|positions| {
            let mut original: Vec<usize> = positions.iter().map(|&p| order[p]).collect();
            original.sort_unstable();
            original
        })
        .collect();
    // Discovery order is already deterministic; dedupe defensively not needed
    // since positions are strictly increasing per path.
    subsets.truncate(MAX_SUBSETS);

    SubsetSearch {
        subsets,
        nodes_visited: search.nodes_visited,
        cap_hit: search.cap_hit,
    }
}

struct Search<'a> {
    sorted: &'a [i64],
    prefix: &'a [i64],
    target: i64,
    tolerance: i64,
    max_size: usize,
    max_nodes: u64,
    stack: Vec<usize>,
    subsets: Vec<Vec<usize>>,
    nodes_visited: u64,
    cap_hit: bool,
}

impl Search<'_> {
    fn dfs(&mut self, start: usize, current_sum: i64) {
        if self.cap_hit {
            return;
        }
        self.nodes_visited += 1;
        if self.nodes_visited >= self.max_nodes {
            self.cap_hit = true;
            return;
        }

        if self.stack.len() >= 2 && (current_sum - self.target).abs() <= self.tolerance {
            if self.subsets.len() >= MAX_SUBSETS {
                self.cap_hit = true;
                return;
            }
            self.subsets.push(self.stack.clone());
        }

        if self.stack.len() >= self.max_size {
            return;
        }

        let slots = self.max_size - self.stack.len();
        for i in start..self.sorted.len() {
            // Largest sum any extension from here can reach. Amounts are
            // descending, so if this fails for i it fails for every later i.
            let take = slots.min(self.sorted.len() - i);
            let max_reachable = current_sum + (self.prefix[i + take] - self.prefix[i]);
            if max_reachable < self.target - self.tolerance {
                break;
            }
            // Adding only increases the sum; an overshoot here may still
            // resolve with a later, smaller amount.
            if current_sum + self.sorted[i] > self.target + self.tolerance {
                continue;
            }
            self.stack.push(i);
            self.dfs(i + 1, current_sum + self.sorted[i]);
            self.stack.pop();
            if self.cap_hit {
                return;
            }
        }
    }
}
