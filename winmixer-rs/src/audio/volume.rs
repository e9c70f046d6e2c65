//! Uniform volume and mute control.
//!
//! Windows exposes two unrelated surfaces for loudness: the endpoint volume
//! of a whole device and the simple volume of a single audio session. Both
//! hold a float scalar in 0.0..=1.0 plus a mute flag. [`VolumeControl`] binds
//! to exactly one of them and presents volume as a whole percentage.

use super::device::AudioResult;

/// A native volume/mute surface backed by a float scalar.
pub trait VolumeSurface {
    /// Get the current volume scalar (nominally 0.0 to 1.0).
    fn level(&self) -> AudioResult<f32>;

    /// Set the volume scalar (0.0 to 1.0).
    fn set_level(&self, level: f32) -> AudioResult<()>;

    /// Get the current mute state.
    fn muted(&self) -> AudioResult<bool>;

    /// Set the mute state.
    fn set_muted(&self, muted: bool) -> AudioResult<()>;
}

/// Lowest volume percentage.
pub const MIN_VOLUME: i32 = 0;

/// Highest volume percentage.
pub const MAX_VOLUME: i32 = 100;

/// Volume controller bound to one stream or one device.
///
/// The binding never changes after construction. Reads and writes go straight
/// to the audio stack; if the stream has ended in the meantime the backend
/// error is returned as-is.
#[derive(Debug, Clone)]
pub enum VolumeControl<S, E> {
    /// Per-session simple volume.
    Stream(S),

    /// Whole-device endpoint volume.
    Endpoint(E),
}

impl<S: VolumeSurface, E: VolumeSurface> VolumeControl<S, E> {
    fn surface(&self) -> &dyn VolumeSurface {
        match self {
            VolumeControl::Stream(stream) => stream,
            VolumeControl::Endpoint(endpoint) => endpoint,
        }
    }

    /// True if this controls a single session rather than the device.
    pub fn is_stream(&self) -> bool {
        matches!(self, VolumeControl::Stream(_))
    }

    /// Get the current volume as a percentage (0-100).
    pub fn volume(&self) -> AudioResult<u8> {
        Ok(scalar_to_percent(self.surface().level()?))
    }

    /// Set the volume from a percentage. Out-of-range values are clamped.
    pub fn set_volume(&self, percent: i32) -> AudioResult<()> {
        self.surface().set_level(percent_to_scalar(percent))
    }

    /// Get the current mute state.
    pub fn is_muted(&self) -> AudioResult<bool> {
        self.surface().muted()
    }

    /// Set the mute state.
    pub fn set_muted(&self, muted: bool) -> AudioResult<()> {
        self.surface().set_muted(muted)
    }
}

/// Scalar to percentage, rounding half to even.
pub fn scalar_to_percent(level: f32) -> u8 {
    let percent = (level * 100.0).round_ties_even();
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(MIN_VOLUME as f32, MAX_VOLUME as f32) as u8
}

/// Percentage to scalar, clamping to 0-100 first.
pub fn percent_to_scalar(percent: i32) -> f32 {
    percent.clamp(MIN_VOLUME, MAX_VOLUME) as f32 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sim::SimVolume;

    type Control = VolumeControl<SimVolume, SimVolume>;

    #[test]
    fn test_set_then_get_clamps() {
        let control = Control::Endpoint(SimVolume::new(1.0, false));
        for (requested, expected) in [(-20, 0), (0, 0), (1, 1), (37, 37), (99, 99), (100, 100), (150, 100)] {
            control.set_volume(requested).unwrap();
            assert_eq!(control.volume().unwrap(), expected, "requested {requested}");
        }
    }

    #[test]
    fn test_every_percent_survives_the_scalar() {
        let control = Control::Stream(SimVolume::new(0.0, false));
        for percent in MIN_VOLUME..=MAX_VOLUME {
            control.set_volume(percent).unwrap();
            assert_eq!(control.volume().unwrap() as i32, percent);
        }
    }

    #[test]
    fn test_read_rounds_half_to_even() {
        assert_eq!(scalar_to_percent(0.125), 12);
        assert_eq!(scalar_to_percent(0.375), 38);
        assert_eq!(scalar_to_percent(0.424), 42);
        assert_eq!(scalar_to_percent(0.426), 43);
    }

    #[test]
    fn test_read_never_leaves_range() {
        assert_eq!(scalar_to_percent(1.7), 100);
        assert_eq!(scalar_to_percent(-0.3), 0);
        assert_eq!(scalar_to_percent(f32::NAN), 0);
    }

    #[test]
    fn test_write_scalar() {
        assert_eq!(percent_to_scalar(50), 0.5);
        assert_eq!(percent_to_scalar(i32::MAX), 1.0);
        assert_eq!(percent_to_scalar(i32::MIN), 0.0);
    }

    #[test]
    fn test_mute_passthrough() {
        let surface = SimVolume::new(0.5, false);
        let control = Control::Stream(surface.clone());
        control.set_muted(true).unwrap();
        assert!(control.is_muted().unwrap());
        assert!(surface.muted().unwrap());
        assert_eq!(control.volume().unwrap(), 50);
    }
}
