use crate::detect::infrastructure::iou_tracker::TrackerVariant;
use crate::error::StreamError;
use crate::shared::constants::DEFAULT_CONFIDENCE;

/// Settings captured once at the start of a run.
///
/// The run never observes changes made after it starts; callers who want
/// different settings start a new run.
#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    /// Minimum detection score, in `[0.0, 1.0]`.
    pub confidence: f64,
    pub tracking: bool,
    pub tracker_variant: TrackerVariant,
    /// Stop after this many frames. Mainly for live sources, which
    /// otherwise run until cancelled.
    pub max_frames: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            tracking: false,
            tracker_variant: TrackerVariant::default(),
            max_frames: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), StreamError> {
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            return Err(StreamError::Config(format!(
                "confidence must be in [0.0, 1.0], got {}",
                self.confidence
            )));
        }
        if self.max_frames == Some(0) {
            return Err(StreamError::Config(
                "max_frames must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert!(!config.tracking);
    }

    #[test]
    fn test_confidence_bounds() {
        let mut config = RunConfig::default();
        config.confidence = 0.0;
        assert!(config.validate().is_ok());
        config.confidence = 1.0;
        assert!(config.validate().is_ok());
        config.confidence = -0.1;
        assert!(config.validate().is_err());
        config.confidence = 1.1;
        assert!(config.validate().is_err());
        config.confidence = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_frames_rejected() {
        let config = RunConfig {
            max_frames: Some(0),
            ..RunConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }
}
