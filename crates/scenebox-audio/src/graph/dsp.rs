//! Signal processing for the built-in node types.

use std::f32::consts::PI;

/// Shape of a biquad filter node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Normalized biquad coefficients (a0 = 1).
#[derive(Debug, Clone, Copy)]
struct Coeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coeffs {
    const PASSTHROUGH: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// RBJ cookbook coefficients. Shelves use a slope of 1 and ignore Q.
    fn compute(kind: BiquadKind, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let nyquist = sample_rate / 2.0;
        let frequency = frequency.clamp(1.0, nyquist * 0.999);
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();

        let (b0, b1, b2, a0, a1, a2) = match kind {
            BiquadKind::Peaking => {
                let alpha = sin_w0 / (2.0 * q.max(1e-4));
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            BiquadKind::LowShelf => {
                let alpha = sin_w0 / 2.0 * 2.0_f32.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            BiquadKind::HighShelf => {
                let alpha = sin_w0 / 2.0 * 2.0_f32.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        if !a0.is_finite() || a0.abs() < f32::EPSILON {
            return Self::PASSTHROUGH;
        }
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Direct form I history for both channels.
#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: [f32; 2],
    x2: [f32; 2],
    y1: [f32; 2],
    y2: [f32; 2],
}

/// Biquad filter node state.
pub(crate) struct Biquad {
    kind: BiquadKind,
    frequency: f32,
    q: f32,
    gain: f32,
    coeffs: Coeffs,
    /// Sample rate the cached coefficients were computed for; 0 forces a recompute.
    coeffs_rate: u32,
    history: History,
}

impl Biquad {
    pub(crate) fn new(kind: BiquadKind) -> Self {
        Self {
            kind,
            frequency: 350.0,
            q: 1.0,
            gain: 0.0,
            coeffs: Coeffs::PASSTHROUGH,
            coeffs_rate: 0,
            history: History::default(),
        }
    }

    pub(crate) fn gain(&self) -> f32 {
        self.gain
    }

    pub(crate) fn frequency(&self) -> f32 {
        self.frequency
    }

    pub(crate) fn q(&self) -> f32 {
        self.q
    }

    pub(crate) fn set_gain(&mut self, gain_db: f32) {
        self.gain = gain_db;
        self.coeffs_rate = 0;
    }

    pub(crate) fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.coeffs_rate = 0;
    }

    pub(crate) fn set_q(&mut self, q: f32) {
        self.q = q;
        self.coeffs_rate = 0;
    }

    /// Filter an interleaved stereo buffer in place.
    pub(crate) fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if self.coeffs_rate != sample_rate {
            self.coeffs = Coeffs::compute(
                self.kind,
                self.frequency,
                self.q,
                self.gain,
                sample_rate as f32,
            );
            self.coeffs_rate = sample_rate;
        }
        let c = self.coeffs;
        let h = &mut self.history;
        for frame in buffer.chunks_exact_mut(2) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let x = *sample;
                let y = c.b0 * x + c.b1 * h.x1[ch] + c.b2 * h.x2[ch]
                    - c.a1 * h.y1[ch]
                    - c.a2 * h.y2[ch];
                h.x2[ch] = h.x1[ch];
                h.x1[ch] = x;
                h.y2[ch] = h.y1[ch];
                h.y1[ch] = y;
                *sample = y;
            }
        }
    }
}

/// Equal-power panner for stereo input.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StereoPanner {
    pub(crate) pan: f32,
}

impl StereoPanner {
    /// Left/right channel gains for the current position.
    ///
    /// A negative pan folds the right channel into the left, a positive pan
    /// the left into the right; the centre leaves both untouched.
    pub(crate) fn gains(&self) -> (f32, f32) {
        let pan = self.pan.clamp(-1.0, 1.0);
        let x = if pan <= 0.0 { pan + 1.0 } else { pan };
        let angle = x * PI / 2.0;
        (angle.cos(), angle.sin())
    }

    pub(crate) fn process(&self, buffer: &mut [f32]) {
        let pan = self.pan.clamp(-1.0, 1.0);
        let (gain_l, gain_r) = self.gains();
        for frame in buffer.chunks_exact_mut(2) {
            let (l, r) = (frame[0], frame[1]);
            if pan <= 0.0 {
                frame[0] = l + r * gain_l;
                frame[1] = r * gain_r;
            } else {
                frame[0] = l * gain_l;
                frame[1] = r + l * gain_r;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(frames: usize, value: f32) -> Vec<f32> {
        vec![value; frames * 2]
    }

    #[test]
    fn test_flat_filters_pass_signal() {
        for kind in [BiquadKind::LowShelf, BiquadKind::Peaking, BiquadKind::HighShelf] {
            let mut filter = Biquad::new(kind);
            let mut buf = dc(512, 0.5);
            filter.process(&mut buf, 48000);
            for s in &buf {
                assert!((s - 0.5).abs() < 1e-4, "{kind:?} altered a flat signal: {s}");
            }
        }
    }

    #[test]
    fn test_low_shelf_cut_attenuates_dc() {
        let mut filter = Biquad::new(BiquadKind::LowShelf);
        filter.set_gain(-40.0);
        let mut buf = dc(4096, 1.0);
        filter.process(&mut buf, 48000);
        // DC sits well below the shelf; it settles at the shelf gain.
        let settled = buf[buf.len() - 1];
        assert!(settled.abs() < 0.05, "settled at {settled}");
    }

    #[test]
    fn test_high_shelf_leaves_dc_alone() {
        let mut filter = Biquad::new(BiquadKind::HighShelf);
        filter.set_frequency(3200.0);
        filter.set_gain(-40.0);
        let mut buf = dc(4096, 1.0);
        filter.process(&mut buf, 48000);
        let settled = buf[buf.len() - 1];
        assert!((settled - 1.0).abs() < 0.01, "settled at {settled}");
    }

    #[test]
    fn test_coefficients_refresh_after_param_change() {
        let mut filter = Biquad::new(BiquadKind::Peaking);
        let mut buf = dc(8, 1.0);
        filter.process(&mut buf, 48000);
        assert_eq!(filter.coeffs_rate, 48000);
        filter.set_gain(6.0);
        assert_eq!(filter.coeffs_rate, 0);
    }

    #[test]
    fn test_panner_center_is_identity() {
        let panner = StereoPanner::default();
        let mut buf = vec![0.3, 0.7, 0.3, 0.7];
        panner.process(&mut buf);
        assert!((buf[0] - 0.3).abs() < 1e-6);
        assert!((buf[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_panner_hard_left() {
        let panner = StereoPanner { pan: -1.0 };
        let mut buf = vec![0.5, 0.5];
        panner.process(&mut buf);
        assert!((buf[0] - 1.0).abs() < 1e-6);
        assert!(buf[1].abs() < 1e-6);
    }

    #[test]
    fn test_panner_hard_right() {
        let panner = StereoPanner { pan: 1.0 };
        let mut buf = vec![0.5, 0.5];
        panner.process(&mut buf);
        assert!(buf[0].abs() < 1e-6);
        assert!((buf[1] - 1.0).abs() < 1e-6);
    }
}
