//! Cubic spline interpolation with not-a-knot end conditions.
//!
//! The spline is C² across interior knots, and the third derivative is
//! continuous at the second and second-to-last knots. With these end
//! conditions any cubic polynomial is reproduced exactly.

/// Minimum number of knots needed to fit the spline.
pub const MIN_POINTS: usize = 4;

/// Reasons a spline cannot be fitted.
#[derive(Debug, Clone, PartialEq)]
pub enum SplineError {
    TooFewPoints(usize),
    LengthMismatch { x: usize, y: usize },
    /// Knot positions are not strictly increasing (first offending index)
    NotIncreasing(usize),
    Singular,
}

impl std::fmt::Display for SplineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplineError::TooFewPoints(n) => {
                write!(f, "cubic spline needs {MIN_POINTS} points, got {n}")
            }
            SplineError::LengthMismatch { x, y } => {
                write!(f, "{x} knot positions but {y} values")
            }
            SplineError::NotIncreasing(i) => {
                write!(f, "knot positions not strictly increasing at index {i}")
            }
            SplineError::Singular => write!(f, "spline system is singular"),
        }
    }
}

impl std::error::Error for SplineError {}

/// A fitted piecewise cubic.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Per interval: cubic, quadratic and linear coefficients in `t = x - x_i`
    coeffs: Vec<[f64; 3]>,
}

impl CubicSpline {
    /// Fit a spline through `(x[i], y[i])`.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        let n = x.len();
        if n < MIN_POINTS {
            return Err(SplineError::TooFewPoints(n));
        }

        let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some(i) = dx.iter().position(|&d| d <= 0.0 || !d.is_finite()) {
            return Err(SplineError::NotIncreasing(i + 1));
        }
        let slope: Vec<f64> = y
            .windows(2)
            .zip(&dx)
            .map(|(w, d)| (w[1] - w[0]) / d)
            .collect();

        // Tridiagonal system for the first derivative at each knot.
        let mut sub = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut sup = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        let span = x[2] - x[0];
        diag[0] = dx[1];
        sup[0] = span;
        rhs[0] = ((dx[0] + 2.0 * span) * dx[1] * slope[0] + dx[0] * dx[0] * slope[1]) / span;

        for i in 1..n - 1 {
            sub[i] = dx[i];
            diag[i] = 2.0 * (dx[i - 1] + dx[i]);
            sup[i] = dx[i - 1];
            rhs[i] = 3.0 * (dx[i] * slope[i - 1] + dx[i - 1] * slope[i]);
        }

        let span = x[n - 1] - x[n - 3];
        sub[n - 1] = span;
        diag[n - 1] = dx[n - 3];
        rhs[n - 1] = (dx[n - 2] * dx[n - 2] * slope[n - 3]
            + (2.0 * span + dx[n - 2]) * dx[n - 3] * slope[n - 2])
            / span;

        let derivs = solve_tridiagonal(&sub, &diag, &sup, &rhs)?;

        let coeffs = (0..n - 1)
            .map(|i| {
                let t = (derivs[i] + derivs[i + 1] - 2.0 * slope[i]) / dx[i];
                [t / dx[i], (slope[i] - derivs[i]) / dx[i] - t, derivs[i]]
            })
            .collect();

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            coeffs,
        })
    }

    /// First and last knot positions.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Evaluate at `at`. Points outside the knots use the end polynomials.
    pub fn evaluate(&self, at: f64) -> f64 {
        let interval = self
            .x
            .partition_point(|&k| k <= at)
            .saturating_sub(1)
            .min(self.coeffs.len() - 1);
        self.evaluate_in(interval, at)
    }

    /// Evaluate at every point of an ascending sequence.
    pub fn evaluate_sorted(&self, points: &[f64]) -> Vec<f64> {
        let last = self.coeffs.len() - 1;
        let mut interval = 0;
        points
            .iter()
            .map(|&at| {
                while interval < last && self.x[interval + 1] <= at {
                    interval += 1;
                }
                self.evaluate_in(interval, at)
            })
            .collect()
    }

    fn evaluate_in(&self, interval: usize, at: f64) -> f64 {
        let [c3, c2, c1] = self.coeffs[interval];
        let t = at - self.x[interval];
        ((c3 * t + c2) * t + c1) * t + self.y[interval]
    }
}

/// Thomas algorithm. `sub[0]` and `sup[n - 1]` are ignored.
fn solve_tridiagonal(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, SplineError> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    if diag[0] == 0.0 {
        return Err(SplineError::Singular);
    }
    c[0] = sup[0] / diag[0];
    d[0] = rhs[0] / diag[0];

    for i in 1..n {
        let m = diag[i] - sub[i] * c[i - 1];
        if m == 0.0 || !m.is_finite() {
            return Err(SplineError::Singular);
        }
        c[i] = sup[i] / m;
        d[i] = (rhs[i] - sub[i] * d[i - 1]) / m;
    }

    let mut out = vec![0.0; n];
    out[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        out[i] = d[i] - c[i] * out[i + 1];
    }
    Ok(out)
}
