//! Grouping of fingerprints into near-duplicate sets.
//!
//! The default [`GroupingStrategy::FirstMatch`] pairs each fingerprint with
//! the first later fingerprint within range and takes both out of the pool.
//! A fingerprint therefore joins at most one merge, and the result depends on
//! discovery order: a chain `A ~ B ~ C` where `A` and `C` are far apart yields
//! a single pair. [`GroupingStrategy::Transitive`] clusters the whole chain
//! and must be asked for explicitly.

use crate::config::GroupingStrategy;
use crate::fingerprint::{Fingerprint, FingerprintIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Paths judged near-duplicate. The first one is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupPaths")]
pub struct DuplicateGroup {
    paths: Vec<PathBuf>,
}

/// Unchecked wire form; deserialization goes through [`DuplicateGroup::new`].
#[derive(Deserialize)]
struct GroupPaths {
    paths: Vec<PathBuf>,
}

impl TryFrom<GroupPaths> for DuplicateGroup {
    type Error = String;

    fn try_from(raw: GroupPaths) -> Result<Self, Self::Error> {
        let len = raw.paths.len();
        DuplicateGroup::new(raw.paths)
            .ok_or_else(|| format!("a duplicate group needs at least 2 paths, got {len}"))
    }
}

impl DuplicateGroup {
    /// Returns `None` for fewer than two paths; a group always has a duplicate.
    pub fn new(paths: Vec<PathBuf>) -> Option<Self> {
        (paths.len() >= 2).then_some(Self { paths })
    }

    pub fn original(&self) -> &Path {
        &self.paths[0]
    }

    pub fn duplicates(&self) -> &[PathBuf] {
        &self.paths[1..]
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub fn group_duplicates(
    index: &FingerprintIndex,
    max_distance: u32,
    strategy: GroupingStrategy,
) -> Vec<DuplicateGroup> {
    match strategy {
        GroupingStrategy::FirstMatch => group_first_match(index, max_distance),
        GroupingStrategy::Transitive => group_transitive(index, max_distance),
    }
}

/// Number of files that would be removed: every member but the original.
pub fn duplicate_file_count(groups: &[DuplicateGroup]) -> usize {
    groups.iter().map(|g| g.duplicates().len()).sum()
}

fn group_first_match(index: &FingerprintIndex, max_distance: u32) -> Vec<DuplicateGroup> {
    let entries: Vec<(&Fingerprint, &[PathBuf])> = index.iter().collect();
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();

    for i in 0..entries.len() {
        if consumed.contains(&i) {
            continue;
        }
        let (h1, paths1) = entries[i];

        let partner = (i + 1..entries.len())
            .filter(|j| !consumed.contains(j))
            .find(|&j| h1.within(entries[j].0, max_distance));

        if let Some(j) = partner {
            consumed.insert(i);
            consumed.insert(j);
            let merged: Vec<PathBuf> = paths1.iter().chain(entries[j].1).cloned().collect();
            // Two fingerprints each with at least one path: always >= 2.
            groups.extend(DuplicateGroup::new(merged));
        }
    }

    for (i, (_, paths)) in entries.iter().enumerate() {
        if !consumed.contains(&i) {
            groups.extend(DuplicateGroup::new(paths.to_vec()));
        }
    }

    groups
}

fn group_transitive(index: &FingerprintIndex, max_distance: u32) -> Vec<DuplicateGroup> {
    let entries: Vec<(&Fingerprint, &[PathBuf])> = index.iter().collect();
    let mut sets = DisjointSet::new(entries.len());

    for i in 0..entries.len() {
        for j in i + 1..entries.len() {
            if entries[i].0.within(entries[j].0, max_distance) {
                sets.union(i, j);
            }
        }
    }

    // Clusters keyed by their earliest member so output follows discovery order.
    let mut clusters: Vec<(usize, Vec<PathBuf>)> = Vec::new();
    for (i, (_, paths)) in entries.iter().enumerate() {
        let root = sets.find(i);
        match clusters.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.extend(paths.iter().cloned()),
            None => clusters.push((root, paths.to_vec())),
        }
    }

    clusters
        .into_iter()
        .filter_map(|(_, members)| DuplicateGroup::new(members))
        .collect()
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index wins so roots stay stable across runs.
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::ImageRecord;

    fn index(entries: &[(&str, &str)]) -> FingerprintIndex {
        FingerprintIndex::from_records(entries.iter().map(|(path, hex)| ImageRecord {
            path: PathBuf::from(path),
            fingerprint: Fingerprint::from_hex(*hex),
        }))
    }

    fn as_strings(groups: &[DuplicateGroup]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.paths().iter().map(|p| p.display().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_group_requires_two_members() {
        assert!(DuplicateGroup::new(vec![]).is_none());
        assert!(DuplicateGroup::new(vec![PathBuf::from("a")]).is_none());

        let group = DuplicateGroup::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(group.original(), Path::new("a"));
        assert_eq!(group.duplicates(), &[PathBuf::from("b"), PathBuf::from("c")]);
    }

    #[test]
    fn test_example_scenario() {
        // A and B identical, C and D three positions apart, E far from everything.
        let idx = index(&[
            ("A", "0000000000000000"),
            ("B", "0000000000000000"),
            ("C", "ffffffff00000000"),
            ("D", "ffffffff00000abc"),
            ("E", "0f0f0f0ff0f0f0f0"),
        ]);
        let groups = group_duplicates(&idx, 5, GroupingStrategy::FirstMatch);

        assert_eq!(
            as_strings(&groups),
            vec![vec!["C", "D"], vec!["A", "B"]]
        );
        assert_eq!(duplicate_file_count(&groups), 2);
        let dups: Vec<_> = groups.iter().flat_map(|g| g.duplicates()).collect();
        assert_eq!(dups, vec![&PathBuf::from("D"), &PathBuf::from("B")]);
    }

    #[test]
    fn test_merge_combines_exact_lists() {
        let idx = index(&[
            ("a1", "aaaa"),
            ("b1", "aaab"),
            ("a2", "aaaa"),
            ("b2", "aaab"),
        ]);
        let groups = group_duplicates(&idx, 1, GroupingStrategy::FirstMatch);
        assert_eq!(as_strings(&groups), vec![vec!["a1", "a2", "b1", "b2"]]);
    }

    #[test]
    fn test_chain_is_not_transitive_by_default() {
        // X~Y (1), Y~Z (1), X and Z two apart; threshold 1.
        let idx = index(&[("X", "0000"), ("Y", "0001"), ("Z", "0011")]);

        let groups = group_duplicates(&idx, 1, GroupingStrategy::FirstMatch);
        assert_eq!(as_strings(&groups), vec![vec!["X", "Y"]]);

        let clustered = group_duplicates(&idx, 1, GroupingStrategy::Transitive);
        assert_eq!(as_strings(&clustered), vec![vec!["X", "Y", "Z"]]);
    }

    #[test]
    fn test_each_fingerprint_merges_at_most_once() {
        // P is within range of both Q and R; only the first partner is taken,
        // and Q, already consumed, cannot pair with R afterwards.
        let idx = index(&[("P", "0000"), ("Q", "0001"), ("R", "0002")]);
        let groups = group_duplicates(&idx, 1, GroupingStrategy::FirstMatch);
        assert_eq!(as_strings(&groups), vec![vec!["P", "Q"]]);
    }

    #[test]
    fn test_consumed_partner_is_skipped() {
        // A pairs with C; B must then look past C and find D.
        let idx = index(&[("A", "0000"), ("B", "ff00"), ("C", "0001"), ("D", "ff01")]);
        let groups = group_duplicates(&idx, 1, GroupingStrategy::FirstMatch);
        assert_eq!(as_strings(&groups), vec![vec!["A", "C"], vec!["B", "D"]]);
    }

    #[test]
    fn test_mismatched_lengths_never_group() {
        let idx = index(&[("short", "00"), ("long", "0000")]);
        let groups = group_duplicates(&idx, 10, GroupingStrategy::FirstMatch);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_ungrouped_fingerprints_are_single_files() {
        let idx = index(&[
            ("a", "1111"),
            ("b", "1111"),
            ("c", "2222"),
            ("d", "3333"),
            ("e", "3334"),
        ]);
        let groups = group_duplicates(&idx, 1, GroupingStrategy::FirstMatch);
        let grouped: HashSet<&PathBuf> = groups.iter().flat_map(|g| g.paths()).collect();

        for (_, paths) in idx.iter() {
            if paths.iter().all(|p| !grouped.contains(p)) {
                assert_eq!(paths.len(), 1);
            }
        }
        assert!(groups.iter().all(|g| g.len() >= 2));
    }

    #[test]
    fn test_grouping_is_deterministic() {
        let idx = index(&[
            ("a", "abcd"),
            ("b", "abce"),
            ("c", "0000"),
            ("d", "0000"),
            ("e", "abcf"),
        ]);
        let first = group_duplicates(&idx, 1, GroupingStrategy::FirstMatch);
        for _ in 0..5 {
            assert_eq!(group_duplicates(&idx, 1, GroupingStrategy::FirstMatch), first);
        }
    }

    #[test]
    fn test_raising_threshold_on_isolated_pairs_never_loses_duplicates() {
        let idx = index(&[
            ("a", "00000000"),
            ("a_copy", "00000000"),
            ("b", "ffffffff"),
            ("b_near", "fffffffe"),
            ("c", "55555555"),
            ("c_far", "555aaaaa"),
        ]);
        let mut previous = 0;
        for max_distance in 0..=8 {
            let count =
                duplicate_file_count(&group_duplicates(&idx, max_distance, GroupingStrategy::FirstMatch));
            assert!(count >= previous, "distance {max_distance}: {count} < {previous}");
            previous = count;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn test_first_match_can_pair_differently_at_higher_threshold() {
        // W-Z 2, X-Y 2, W-X 3, Y-Z 7. At threshold 2 both pairs form; at 3,
        // W grabs X first and leaves Y and Z unpaired.
        let idx = index(&[
            ("W", "0000000"),
            ("X", "0011100"),
            ("Y", "0011111"),
            ("Z", "1100000"),
        ]);
        let low = group_duplicates(&idx, 2, GroupingStrategy::FirstMatch);
        let high = group_duplicates(&idx, 3, GroupingStrategy::FirstMatch);

        assert_eq!(as_strings(&low), vec![vec!["W", "Z"], vec!["X", "Y"]]);
        assert_eq!(as_strings(&high), vec![vec!["W", "X"]]);

        let transitive_low = duplicate_file_count(&group_duplicates(&idx, 2, GroupingStrategy::Transitive));
        let transitive_high = duplicate_file_count(&group_duplicates(&idx, 3, GroupingStrategy::Transitive));
        assert!(transitive_high >= transitive_low);
    }

    #[test]
    fn test_transitive_orders_members_by_discovery() {
        let idx = index(&[
            ("z", "0000"),
            ("lonely", "ffff"),
            ("y", "0010"),
            ("x", "0011"),
        ]);
        let groups = group_duplicates(&idx, 1, GroupingStrategy::Transitive);
        assert_eq!(as_strings(&groups), vec![vec!["z", "y", "x"]]);
    }

    #[test]
    fn test_deserialize_rejects_groups_without_duplicates() {
        for json in [r#"{"paths":[]}"#, r#"{"paths":["only.png"]}"#] {
            let err = serde_json::from_str::<DuplicateGroup>(json).unwrap_err();
            assert!(err.to_string().contains("at least 2 paths"), "{err}");
        }

        let group: DuplicateGroup = serde_json::from_str(r#"{"paths":["a.png","b.png"]}"#).unwrap();
        assert_eq!(group.original(), Path::new("a.png"));
        assert_eq!(serde_json::to_string(&group).unwrap(), r#"{"paths":["a.png","b.png"]}"#);
    }
}
