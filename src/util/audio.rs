use std::sync::atomic::{AtomicU64, Ordering};

// Fallback sample rate (Hz) when a source does not report one.
pub const DEFAULT_SAMPLE_RATE: f32 = 250.0;

// Floor (dB) applied to relative magnitudes.
pub const DB_FLOOR: f32 = -200.0;

// Smallest magnitude fed into a log conversion.
const MAGNITUDE_EPSILON: f32 = 1.0e-10;

/// Process-unique, monotonically increasing key.
pub fn next_key() -> u64 {
    static KEY: AtomicU64 = AtomicU64::new(1);
    KEY.fetch_add(1, Ordering::Relaxed)
}

#[inline(always)]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline(always)]
pub fn lerp_rgba(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        lerp(a[0], b[0], t),
        lerp(a[1], b[1], t),
        lerp(a[2], b[2], t),
        lerp(a[3], b[3], t),
    ]
}

// Power relative to `reference`, in decibels.
#[inline(always)]
pub fn power_to_db(power: f32, reference: f32) -> f32 {
    let reference = reference.max(MAGNITUDE_EPSILON);
    (10.0 * (power.max(MAGNITUDE_EPSILON) / reference).log10()).max(DB_FLOOR)
}

// Magnitude relative to `reference`, in decibels.
#[inline(always)]
pub fn magnitude_to_db(magnitude: f32, reference: f32) -> f32 {
    let reference = reference.max(MAGNITUDE_EPSILON);
    (20.0 * (magnitude.max(MAGNITUDE_EPSILON) / reference).log10()).max(DB_FLOOR)
}

// Splits an interleaved block into one vector per channel.
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let channels = channels.max(1);
    let frames = samples.len() / channels;
    let mut out: Vec<Vec<f32>> = (0..channels).map(|_| Vec::with_capacity(frames)).collect();
    for frame in samples.chunks_exact(channels) {
        for (dst, &s) in out.iter_mut().zip(frame) {
            dst.push(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deinterleave_drops_partial_frames() {
        let split = deinterleave(&[1.0, -1.0, 2.0, -2.0, 3.0], 2);
        assert_eq!(split, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
    }

    #[test]
    fn db_is_relative_to_reference() {
        assert!(magnitude_to_db(1.0, 1.0).abs() < 1e-6);
        assert!((magnitude_to_db(0.1, 1.0) + 20.0).abs() < 1e-4);
        assert!((magnitude_to_db(0.0, 1.0) - DB_FLOOR).abs() < 0.01);
        assert!((power_to_db(0.01, 1.0) + 20.0).abs() < 1e-4);
        assert!((power_to_db(0.0, 1.0) + 100.0).abs() < 0.01);
    }

    #[test]
    fn keys_are_unique() {
        let (a, b) = (next_key(), next_key());
        assert!(b > a);
    }
}
