//! Interpolation helpers:
//! - lerp (scalar blend)
//! - bezier_ease (cubic-bezier timing, x inverted by bisection)
//! - step_start / step_end

/// CSS `ease`
pub const EASE: [f64; 4] = [0.25, 0.1, 0.25, 1.0];
/// CSS `ease-in`
pub const EASE_IN: [f64; 4] = [0.42, 0.0, 1.0, 1.0];
/// CSS `ease-out`
pub const EASE_OUT: [f64; 4] = [0.0, 0.0, 0.58, 1.0];
/// CSS `ease-in-out`
pub const EASE_IN_OUT: [f64; 4] = [0.42, 0.0, 0.58, 1.0];

const BISECT_ITERATIONS: usize = 24;
const BISECT_EPSILON: f64 = 1e-7;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Given control points (x1, y1, x2, y2) and an input progress in [0,1],
/// compute the eased y by inverting the x bezier via binary search.
#[inline]
pub fn bezier_ease(t: f64, ctrl: [f64; 4]) -> f64 {
    let [x1, y1, x2, y2] = ctrl;
    let t = t.clamp(0.0, 1.0);
    // Bezier(0,0,1,1) is exactly linear
    if x1 == 0.0 && y1 == 0.0 && x2 == 1.0 && y2 == 1.0 {
        return t;
    }
    // Monotonic X in [0,1] assumed for x1/x2 ∈ [0,1]
    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    let mut mid = t;
    for _ in 0..BISECT_ITERATIONS {
        let x = cubic_bezier(0.0, x1, x2, 1.0, mid);
        if (x - t).abs() < BISECT_EPSILON {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(0.0, y1, y2, 1.0, mid).clamp(0.0, 1.0)
}

/// `step-start`: jumps to the end value as soon as the segment begins.
#[inline]
pub fn step_start(raw: f64) -> f64 {
    if raw > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// `step-end`: holds the start value until the segment completes.
#[inline]
pub fn step_end(raw: f64) -> f64 {
    if raw >= 1.0 {
        1.0
    } else {
        0.0
    }
}
