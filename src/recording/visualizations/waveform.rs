//! Scrolling input-level history.

/// Converts a window of samples (-1.0..=1.0) to a 0-100 level.
///
/// RMS is mapped to dBFS and scaled so that `reference_db` reads as 100% and
/// 40 dB below it as 0%. Silence still reads as a small floor so the display
/// never goes completely flat while recording.
pub fn level_percent(samples: &[f32], reference_db: f32) -> u8 {
    if samples.is_empty() {
        return 0;
    }
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = mean_square.sqrt();
    let db_fs = if rms > 0.0 { 20.0 * rms.log10() } else { -160.0 };
    let floor_db = reference_db - 40.0;
    ((db_fs - floor_db) / 40.0 * 100.0).clamp(4.0, 100.0) as u8
}

/// Fixed-width ring of level readings, oldest first.
#[derive(Debug, Clone)]
pub struct LevelHistory {
    values: Vec<u64>,
    width: usize,
}

impl LevelHistory {
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![0; width],
            width,
        }
    }

    pub fn push(&mut self, level: u8) {
        self.values.push(u64::from(level));
        if self.values.len() > self.width {
            self.values.remove(0);
        }
    }

    /// Pads with silence on the left or drops the oldest readings.
    pub fn resize(&mut self, width: usize) {
        self.width = width;
        let len = self.values.len();
        if len > width {
            self.values.drain(..len - width);
        } else if len < width {
            self.values.splice(0..0, std::iter::repeat(0).take(width - len));
        }
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    #[cfg(test)]
    pub fn latest(&self) -> u8 {
        self.values.last().map(|&v| v as u8).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_reads_one_hundred() {
        assert_eq!(level_percent(&[1.0, -1.0, 1.0], -20.0), 100);
    }

    #[test]
    fn silence_reads_floor() {
        assert_eq!(level_percent(&[0.0; 64], -20.0), 4);
        assert_eq!(level_percent(&[], -20.0), 0);
    }

    #[test]
    fn history_scrolls_at_fixed_width() {
        let mut history = LevelHistory::new(3);
        for level in [10, 20, 30, 40] {
            history.push(level);
        }
        assert_eq!(history.values(), &[20, 30, 40]);
        assert_eq!(history.latest(), 40);
    }

    #[test]
    fn resize_pads_and_trims() {
        let mut history = LevelHistory::new(2);
        history.push(50);
        history.resize(4);
        assert_eq!(history.values(), &[0, 0, 0, 50]);
        history.resize(1);
        assert_eq!(history.values(), &[50]);
    }
}
