//! Minimum-cost bipartite assignment.
//!
//! Hungarian algorithm with row/column potentials and shortest augmenting
//! paths, O(n^3). Rectangular matrices are padded to square internally;
//! dummy cells carry a constant cost, so they never change the optimal
//! matching among real cells.

/// Cost assigned to forbidden pairs. Callers gate infeasible matches with
/// this before solving and reject any surviving assignment at or above it.
pub const FORBIDDEN: f64 = 1e12;

/// Solve the assignment problem for a `rows x cols` cost matrix given in
/// row-major order. Returns, for each row, the matched column (every row
/// is matched when `rows <= cols`; otherwise the unmatched rows get
/// `None` via the dummy columns).
pub fn min_cost_assignment(cost: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = cost.len();
    if rows == 0 {
        return Vec::new();
    }
    let cols = cost[0].len();
    if cols == 0 {
        return vec![None; rows];
    }
    let n = rows.max(cols);

    let at = |i: usize, j: usize| -> f64 {
        if i < rows && j < cols {
            cost[i][j]
        } else {
            // Constant dummy cost: padding absorbs the surplus rows or
            // columns without biasing the real matching.
            FORBIDDEN
        }
    };

    // 1-indexed potentials; p[j] is the row matched to column j.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = at(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut result = vec![None; rows];
    for (j, &i) in p.iter().enumerate().skip(1) {
        if i >= 1 && i <= rows && j <= cols {
            result[i - 1] = Some(j - 1);
        }
    }
    result
}
