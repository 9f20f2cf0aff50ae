//! Detection to entity association.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Single detector output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in display (reduced frame) pixels
    pub rect: Rect,
    pub class_id: i32,
    pub class_name: String,
    /// Detector confidence in `[0, 1]`
    pub confidence: f32,
}

impl Detection {
    pub fn new(rect: Rect, class_id: i32, class_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            rect,
            class_id,
            class_name: class_name.into(),
            confidence,
        }
    }

    /// Detection from LTRB corners.
    pub fn from_ltrb(x1: i32, y1: i32, x2: i32, y2: i32, class_name: impl Into<String>) -> Self {
        Self::new(Rect::from_ltrb(x1, y1, x2, y2), 0, class_name, 1.0)
    }
}

/// How matched pairs are picked from the affinity matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Highest IoU first, ties broken by entity age then detection order
    #[default]
    Greedy,
    /// Globally optimal assignment (Jonker-Volgenant)
    Optimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// `(row, col)` pairs, i.e. `(entity, detection)`
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn from_matches(matches: Vec<(usize, usize)>, num_rows: usize, num_cols: usize) -> Self {
        let mut row_used = vec![false; num_rows];
        let mut col_used = vec![false; num_cols];
        for &(r, c) in &matches {
            row_used[r] = true;
            col_used[c] = true;
        }
        let unused = |used: Vec<bool>| -> Vec<usize> {
            used.iter()
                .enumerate()
                .filter_map(|(i, &u)| (!u).then_some(i))
                .collect()
        };
        Self {
            matches,
            unmatched_tracks: unused(row_used),
            unmatched_detections: unused(col_used),
        }
    }
}

/// Cost given to non-overlapping pairs so they never pass the threshold.
const NO_OVERLAP_COST: f32 = 1e6;

/// Assign with the given strategy. Pairs below `min_iou` or without any
/// overlap are never matched.
pub fn assign(affinity: &Array2<f32>, min_iou: f32, strategy: MatchStrategy) -> AssignmentResult {
    match strategy {
        MatchStrategy::Greedy => greedy_assignment(affinity, min_iou),
        MatchStrategy::Optimal => {
            let cost = affinity.mapv(|iou| if iou > 0.0 { 1.0 - iou } else { NO_OVERLAP_COST });
            linear_assignment(&cost, 1.0 - min_iou)
        }
    }
}

/// Greedy one-to-one assignment on an IoU matrix.
///
/// Rows must be ordered by entity creation, columns by detection order.
/// Candidates are visited by descending IoU, then row, then column, so the
/// result is deterministic for a given input order.
pub fn greedy_assignment(affinity: &Array2<f32>, min_iou: f32) -> AssignmentResult {
    let (num_rows, num_cols) = affinity.dim();

    let mut candidates: Vec<(f32, usize, usize)> = affinity
        .indexed_iter()
        .filter(|&(_, &iou)| iou > 0.0 && iou >= min_iou)
        .map(|((r, c), &iou)| (iou, r, c))
        .collect();
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut row_taken = vec![false; num_rows];
    let mut col_taken = vec![false; num_cols];
    let mut matches = Vec::new();
    for (_, r, c) in candidates {
        if row_taken[r] || col_taken[c] {
            continue;
        }
        row_taken[r] = true;
        col_taken[c] = true;
        matches.push((r, c));
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

/// Minimum cost assignment on a cost matrix; pairs costing more than
/// `thresh` are rejected afterwards.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::from_matches(Vec::new(), num_rows, num_cols);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);
    for ((i, j), &c) in cost_matrix.indexed_iter() {
        padded[[i, j]] = c as f64;
    }

    let matches = match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => row_to_col
            .iter()
            .enumerate()
            .filter(|&(r, &c)| r < num_rows && c < num_cols && cost_matrix[[r, c]] <= thresh)
            .map(|(r, &c)| (r, c))
            .collect(),
        Err(_) => Vec::new(),
    };

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_greedy_takes_best_pair_first() {
        let affinity = array![[0.6, 0.5], [0.7, 0.0]];
        let res = greedy_assignment(&affinity, 0.3);
        assert_eq!(res.matches, vec![(1, 0), (0, 1)]);
        assert!(res.unmatched_tracks.is_empty());
        assert!(res.unmatched_detections.is_empty());
    }

    #[test]
    fn test_greedy_threshold() {
        let affinity = array![[0.2, 0.0], [0.0, 0.9]];
        let res = greedy_assignment(&affinity, 0.3);
        assert_eq!(res.matches, vec![(1, 1)]);
        assert_eq!(res.unmatched_tracks, vec![0]);
        assert_eq!(res.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_greedy_ties_prefer_older_entity() {
        let affinity = array![[0.5], [0.5]];
        let res = greedy_assignment(&affinity, 0.1);
        assert_eq!(res.matches, vec![(0, 0)]);
        assert_eq!(res.unmatched_tracks, vec![1]);
    }

    #[test]
    fn test_zero_threshold_never_matches_disjoint_boxes() {
        let affinity = array![[0.0]];
        let res = greedy_assignment(&affinity, 0.0);
        assert!(res.matches.is_empty());
    }

    #[test]
    fn test_optimal_zero_threshold_never_matches_disjoint_boxes() {
        let affinity = array![[0.0, 0.4], [0.0, 0.0]];
        let res = assign(&affinity, 0.0, MatchStrategy::Optimal);
        assert_eq!(res.matches, vec![(0, 1)]);
        assert_eq!(res.unmatched_tracks, vec![1]);
        assert_eq!(res.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_optimal_beats_greedy() {
        // greedy takes (0,0)=0.9 and is left with (1,1)=0.1
        let affinity = array![[0.9, 0.8], [0.8, 0.1]];
        let greedy = assign(&affinity, 0.05, MatchStrategy::Greedy);
        assert_eq!(greedy.matches, vec![(0, 0), (1, 1)]);

        let optimal = assign(&affinity, 0.05, MatchStrategy::Optimal);
        let mut matches = optimal.matches;
        matches.sort();
        assert_eq!(matches, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_empty_inputs() {
        let res = assign(&Array2::zeros((0, 3)), 0.3, MatchStrategy::Optimal);
        assert_eq!(res.unmatched_detections, vec![0, 1, 2]);
        let res = assign(&Array2::zeros((2, 0)), 0.3, MatchStrategy::Greedy);
        assert_eq!(res.unmatched_tracks, vec![0, 1]);
    }
}
