// Feature extraction over the rolling gaze point buffer. All functions are
// pure over an ordered slice (oldest -> newest); the caller owns the buffer.
use crate::types::{Fixation, GazePoint};

/// Blink shows up in the gaze stream as a sample dropout of this shape:
/// a consecutive-sample gap strictly between these bounds.
const BLINK_GAP_MIN_MS: i64 = 100;
const BLINK_GAP_MAX_MS: i64 = 400;

/// Displacement/time cutoffs for a saccade between consecutive samples.
const SACCADE_MIN_DISTANCE_PX: f64 = 100.0;
const SACCADE_MAX_INTERVAL_MS: i64 = 50;

/// Spatial std-dev (px) at which engagement saturates at 1.
const ENGAGEMENT_SPREAD_FULL_PX: f64 = 300.0;

fn distance(a: &GazePoint, b: &GazePoint) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Walk backward from the most recent point, growing a cluster while each
/// earlier point stays within `threshold_px` of the latest point. A fixation
/// exists only if the cluster spans at least 2 points and `min_duration_ms`.
pub fn detect_fixation(
    points: &[GazePoint],
    threshold_px: f64,
    min_duration_ms: i64,
) -> Option<Fixation> {
    if points.len() < 2 {
        return None;
    }

    let latest = points[points.len() - 1];
    let mut cluster_start = points.len() - 1;
    for i in (0..points.len() - 1).rev() {
        if distance(&points[i], &latest) > threshold_px {
            break;
        }
        cluster_start = i;
    }

    let cluster = &points[cluster_start..];
    if cluster.len() < 2 {
        return None;
    }

    let duration_ms = latest.timestamp_ms - cluster[0].timestamp_ms;
    if duration_ms < min_duration_ms {
        return None;
    }

    let n = cluster.len() as f64;
    let cx = cluster.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = cluster.iter().map(|p| p.y).sum::<f64>() / n;

    Some(Fixation {
        x: cx,
        y: cy,
        duration_ms,
    })
}

/// Blinks per minute, extrapolated from dropout-shaped gaps over the buffer's
/// total time span. Degenerates to 0 for spans <= 0 or fewer than 2 points.
pub fn compute_blink_rate(points: &[GazePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let span_ms = points[points.len() - 1].timestamp_ms - points[0].timestamp_ms;
    if span_ms <= 0 {
        return 0.0;
    }

    let blinks = points
        .windows(2)
        .filter(|w| {
            let gap = w[1].timestamp_ms - w[0].timestamp_ms;
            gap > BLINK_GAP_MIN_MS && gap < BLINK_GAP_MAX_MS
        })
        .count();

    blinks as f64 / (span_ms as f64 / 60_000.0)
}

/// Saccades per second: consecutive pairs displaced more than 100px within
/// an inter-sample interval under 50ms.
pub fn detect_saccades(points: &[GazePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let span_ms = points[points.len() - 1].timestamp_ms - points[0].timestamp_ms;
    if span_ms <= 0 {
        return 0.0;
    }

    let saccades = points
        .windows(2)
        .filter(|w| {
            let interval = w[1].timestamp_ms - w[0].timestamp_ms;
            interval < SACCADE_MAX_INTERVAL_MS && distance(&w[0], &w[1]) > SACCADE_MIN_DISTANCE_PX
        })
        .count();

    saccades as f64 / (span_ms as f64 / 1000.0)
}

/// Normalized spatial spread of the buffer in [0,1]: Euclidean standard
/// deviation around the mean position, saturating at ~300px.
pub fn estimate_engagement(points: &[GazePoint]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }

    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;

    let variance = points
        .iter()
        .map(|p| {
            let dx = p.x - mx;
            let dy = p.y - my;
            dx * dx + dy * dy
        })
        .sum::<f64>()
        / n;

    ((variance.sqrt() / ENGAGEMENT_SPREAD_FULL_PX).clamp(0.0, 1.0)) as f32
}
