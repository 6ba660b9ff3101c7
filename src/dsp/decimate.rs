//! Fixed-stride decimation. No anti-alias filter: aliasing is left visible.

use crate::error::SignalError;
use crate::source::ChannelBuffer;

/// Keep-every-nth step for reaching `target_rate` from `source_rate`.
pub fn stride(source_rate: f32, target_rate: f32) -> Result<usize, SignalError> {
    if !target_rate.is_finite() || target_rate <= 0.0 || target_rate > source_rate {
        return Err(SignalError::InvalidRate {
            target_rate,
            source_rate,
        });
    }
    Ok(((source_rate / target_rate).floor() as usize).max(1))
}

/// Takes every `stride`-th sample; output rate is `source_rate / stride`.
pub fn decimate(buffer: &ChannelBuffer, target_rate: f32) -> Result<ChannelBuffer, SignalError> {
    let step = stride(buffer.sample_rate(), target_rate)?;
    let kept = buffer.len() / step;
    let samples = buffer.samples().iter().step_by(step).take(kept).copied();
    Ok(ChannelBuffer::new(
        buffer.name(),
        buffer.sample_rate() / step as f32,
        samples,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, rate: f32) -> ChannelBuffer {
        ChannelBuffer::new("ramp", rate, (0..len).map(|i| i as f32))
    }

    #[test]
    fn output_length_is_floor_of_len_over_stride() {
        for &(len, source, target) in &[
            (750, 250.0, 50.0),
            (751, 250.0, 50.0),
            (10, 100.0, 30.0),
            (99, 8_000.0, 8_000.0),
            (3, 1_000.0, 1.0),
        ] {
            let buf = ramp(len, source);
            let step = stride(source, target).expect("valid rate");
            let out = decimate(&buf, target).expect("valid rate");
            assert_eq!(out.len(), len / step, "len={len} {source}->{target}");
        }
    }

    #[test]
    fn keeps_every_stride_th_sample() {
        let out = decimate(&ramp(10, 100.0), 30.0).expect("valid rate");
        assert_eq!(out.samples(), &[0.0, 3.0, 6.0]);
        assert!((out.sample_rate() - 100.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_rates_out_of_bounds() {
        let buf = ramp(10, 100.0);
        for target in [0.0, -5.0, 101.0, f32::NAN] {
            assert!(matches!(
                decimate(&buf, target),
                Err(SignalError::InvalidRate { .. })
            ));
        }
    }
}
