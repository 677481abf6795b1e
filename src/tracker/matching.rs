//! Cost matrices and minimum-cost assignment between tracks and detections.

use ndarray::Array2;

use crate::error::{MonitorError, Result};
use crate::tracker::appearance::Descriptor;
use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::{CHI2_INV95_4DOF, KalmanFilter};
use crate::tracker::track::Track;

/// Cost given to pairs excluded by gating.
pub const INFTY_COST: f64 = 1e5;

/// Cost of the padding cells that square up the matrix for the solver. Every
/// completion uses the same number of padding cells, so the value does not
/// move the optimum; it is kept small enough for the tie-break to resolve.
const PADDING_COST: f64 = INFTY_COST;

/// Per-row bias added to admissible costs so that exact ties go to the
/// earlier row. Far below any meaningful cost difference.
const TIE_BREAK: f64 = 1e-8;

/// Row/column indices of an assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Gating thresholds for the motion + appearance cost.
#[derive(Debug, Clone, Copy)]
pub struct GateParams {
    pub max_cosine_distance: f32,
    /// Weight of the normalised Mahalanobis term; the appearance term gets `1 - motion_weight`.
    pub motion_weight: f32,
}

impl GateParams {
    /// Largest combined cost an admissible pair can have.
    pub fn max_cost(&self) -> f64 {
        let w = f64::from(self.motion_weight);
        w + (1.0 - w) * f64::from(self.max_cosine_distance)
    }
}

/// Combined motion/appearance cost with gating.
///
/// A pair is inadmissible (cost [`INFTY_COST`]) when its squared Mahalanobis
/// distance exceeds the chi-square 95% gate or its appearance distance
/// exceeds `max_cosine_distance`. Pairs missing a descriptor are judged on
/// motion alone.
pub fn gated_cost(
    kalman_filter: &KalmanFilter,
    tracks: &[&Track],
    detections: &[Detection],
    descriptors: &[Option<Descriptor>],
    params: &GateParams,
) -> Result<Array2<f64>> {
    let w = f64::from(params.motion_weight);
    let mut cost = Array2::from_elem((tracks.len(), detections.len()), INFTY_COST);

    for (i, track) in tracks.iter().enumerate() {
        for (j, det) in detections.iter().enumerate() {
            let motion = track.gating_distance(kalman_filter, det)?;
            if motion > CHI2_INV95_4DOF {
                continue;
            }
            let appearance = track
                .appearance_distance(descriptors[j].as_ref())
                .unwrap_or(0.0);
            if appearance > params.max_cosine_distance {
                continue;
            }
            cost[[i, j]] = w * (motion / CHI2_INV95_4DOF) + (1.0 - w) * f64::from(appearance);
        }
    }
    Ok(cost)
}

/// `1 - IoU` between each track's predicted box and each detection.
pub fn iou_cost(tracks: &[&Track], detections: &[Detection]) -> Array2<f64> {
    let mut cost = Array2::zeros((tracks.len(), detections.len()));
    for (i, t) in tracks.iter().enumerate() {
        let bbox = t.bbox();
        for (j, d) in detections.iter().enumerate() {
            cost[[i, j]] = 1.0 - f64::from(bbox.iou(&d.bbox));
        }
    }
    cost
}

/// Minimum-cost bipartite assignment (LAPJV). Assigned pairs whose cost
/// exceeds `thresh` are reported as unmatched on both sides.
///
/// Rows are expected in track creation order: among equal-cost choices the
/// lower row index wins.
pub fn linear_assignment(cost_matrix: &Array2<f64>, thresh: f64) -> Result<AssignmentResult> {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return Ok(AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        });
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);
    for ((i, j), &c) in cost_matrix.indexed_iter() {
        if !c.is_finite() {
            return Err(MonitorError::Assignment(format!(
                "non-finite cost at ({i}, {j})"
            )));
        }
        padded[[i, j]] = if c < INFTY_COST {
            c + i as f64 * TIE_BREAK
        } else {
            c
        };
    }

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|e| MonitorError::Assignment(format!("{e:?}")))?;

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut detection_unmatched = vec![true; num_cols];

    for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
        if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] <= thresh {
            matches.push((row_idx, col_idx));
            detection_unmatched[col_idx] = false;
        } else {
            unmatched_tracks.push(row_idx);
        }
    }

    let unmatched_detections = detection_unmatched
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect();

    Ok(AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_empty_matrices() {
        let r = linear_assignment(&Array2::zeros((0, 3)), 1.0).unwrap();
        assert_eq!(r.unmatched_detections, vec![0, 1, 2]);
        let r = linear_assignment(&Array2::zeros((2, 0)), 1.0).unwrap();
        assert_eq!(r.unmatched_tracks, vec![0, 1]);
    }

    #[test]
    fn test_minimum_total_cost() {
        // Greedy would take (0,0) = 0.1 and force (1,1) = 0.9.
        let cost = array![[0.1, 0.2], [0.15, 0.9]];
        let r = linear_assignment(&cost, 1.0).unwrap();
        assert_eq!(r.matches, vec![(0, 1), (1, 0)]);
        assert!(r.unmatched_tracks.is_empty());
    }

    #[test]
    fn test_gated_pairs_stay_unmatched() {
        let cost = array![[0.1, INFTY_COST], [INFTY_COST, INFTY_COST]];
        let r = linear_assignment(&cost, 1.0).unwrap();
        assert_eq!(r.matches, vec![(0, 0)]);
        assert_eq!(r.unmatched_tracks, vec![1]);
        assert_eq!(r.unmatched_detections, vec![1]);
    }

    #[test]
    fn test_rectangular() {
        let cost = array![[0.5, 0.05, 0.7]];
        let r = linear_assignment(&cost, 0.6).unwrap();
        assert_eq!(r.matches, vec![(0, 1)]);
        assert_eq!(r.unmatched_detections, vec![0, 2]);
    }

    #[test]
    fn test_ties_go_to_the_earlier_row() {
        let cost = array![[0.25], [0.25], [0.25]];
        let r = linear_assignment(&cost, 1.0).unwrap();
        assert_eq!(r.matches, vec![(0, 0)]);
        assert_eq!(r.unmatched_tracks, vec![1, 2]);

        let cost = array![[0.3, 0.3], [0.3, 0.3], [0.3, 0.3]];
        let r = linear_assignment(&cost, 1.0).unwrap();
        let rows: Vec<usize> = r.matches.iter().map(|&(i, _)| i).collect();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(r.unmatched_tracks, vec![2]);
    }

    #[test]
    fn test_non_finite_cost_is_an_error() {
        let cost = array![[f64::NAN]];
        assert!(linear_assignment(&cost, 1.0).is_err());
    }

    #[test]
    fn test_max_cost() {
        let params = GateParams {
            max_cosine_distance: 0.4,
            motion_weight: 0.0,
        };
        assert!((params.max_cost() - 0.4).abs() < 1e-6);
    }
}
