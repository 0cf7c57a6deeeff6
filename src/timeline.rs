use anyhow::{ensure, Result};
use rand::Rng;
use std::f64::consts::TAU;

/// Seed used for the published timeline figure
pub const DEFAULT_SEED: u64 = 42;

/// Parameters of the synthetic throughput series
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineConfig {
    /// Total simulated run length in seconds
    pub duration_secs: u32,
    /// Seconds between samples
    pub interval_secs: u32,
    /// Samples before this instant belong to the warmup phase
    pub warmup_secs: u32,
    /// Steady-state throughput the series fluctuates around
    pub baseline_tps: f64,
    /// Half-width of the uniform noise band
    pub noise_tps: f64,
    /// Amplitude of the periodic component
    pub wave_tps: f64,
    pub wave_period_secs: f64,
    /// Fraction of the baseline reached at t = 0; ramps linearly to 1 over warmup
    pub warmup_start_fraction: f64,
    /// Samples are clipped to `[min_fraction, max_fraction] * baseline_tps`
    pub min_fraction: f64,
    pub max_fraction: f64,
}

impl TimelineConfig {
    pub fn for_baseline(baseline_tps: f64) -> Self {
        Self {
            duration_secs: 300,
            interval_secs: 1,
            warmup_secs: 30,
            baseline_tps,
            noise_tps: baseline_tps * 0.08,
            wave_tps: baseline_tps * 0.05,
            wave_period_secs: 60.0,
            warmup_start_fraction: 0.4,
            min_fraction: 0.5,
            max_fraction: 1.5,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.interval_secs > 0, "timeline interval must be positive");
        ensure!(
            self.warmup_secs < self.duration_secs,
            "warmup ({}s) must end before the run does ({}s)",
            self.warmup_secs,
            self.duration_secs
        );
        ensure!(
            self.baseline_tps.is_finite() && self.baseline_tps >= 0.0,
            "baseline throughput must be non-negative, got {}",
            self.baseline_tps
        );
        ensure!(
            self.noise_tps >= 0.0 && self.wave_tps >= 0.0 && self.wave_period_secs > 0.0,
            "noise, wave amplitude and wave period must be non-negative"
        );
        ensure!(
            self.min_fraction <= self.max_fraction,
            "clip range [{}, {}] is empty",
            self.min_fraction,
            self.max_fraction
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSample {
    pub secs: f64,
    pub tps: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSeries {
    pub samples: Vec<TimelineSample>,
    pub warmup_secs: f64,
    pub duration_secs: f64,
}

impl TimelineSeries {
    pub fn warmup(&self) -> &[TimelineSample] {
        &self.samples[..self.split_index()]
    }

    pub fn steady_state(&self) -> &[TimelineSample] {
        &self.samples[self.split_index()..]
    }

    /// Mean throughput after warmup
    pub fn steady_mean(&self) -> f64 {
        let steady = self.steady_state();
        if steady.is_empty() {
            return 0.0;
        }
        steady.iter().map(|s| s.tps).sum::<f64>() / steady.len() as f64
    }

    fn split_index(&self) -> usize {
        self.samples
            .iter()
            .position(|s| s.secs >= self.warmup_secs)
            .unwrap_or(self.samples.len())
    }
}

/// Generate the synthetic throughput series.
///
/// The only randomness comes from `rng`; a `StdRng` seeded with the same value
/// yields the same series bit for bit.
pub fn generate<R: Rng>(config: &TimelineConfig, rng: &mut R) -> Result<TimelineSeries> {
    config.validate()?;

    let low = config.baseline_tps * config.min_fraction;
    let high = config.baseline_tps * config.max_fraction;
    let warmup = config.warmup_secs as f64;

    let samples = (0..=config.duration_secs)
        .step_by(config.interval_secs as usize)
        .map(|t| {
            let secs = t as f64;
            let ramp = if secs < warmup {
                config.warmup_start_fraction + (1.0 - config.warmup_start_fraction) * secs / warmup
            } else {
                1.0
            };
            let wave = config.wave_tps * (TAU * secs / config.wave_period_secs).sin();
            let noise = if config.noise_tps > 0.0 {
                rng.gen_range(-config.noise_tps..=config.noise_tps)
            } else {
                0.0
            };

            TimelineSample {
                secs,
                tps: (config.baseline_tps * ramp + wave + noise).clamp(low, high),
            }
        })
        .collect();

    Ok(TimelineSeries {
        samples,
        warmup_secs: warmup,
        duration_secs: config.duration_secs as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn series(seed: u64) -> TimelineSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        generate(&TimelineConfig::for_baseline(77.2), &mut rng).unwrap()
    }

    fn bits(series: &TimelineSeries) -> Vec<(u64, u64)> {
        series
            .samples
            .iter()
            .map(|s| (s.secs.to_bits(), s.tps.to_bits()))
            .collect()
    }

    #[test]
    fn test_reproducibility() {
        assert_eq!(bits(&series(DEFAULT_SEED)), bits(&series(DEFAULT_SEED)));
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(bits(&series(1)), bits(&series(2)));
    }

    #[test]
    fn test_sample_grid() {
        let series = series(DEFAULT_SEED);
        assert_eq!(series.samples.len(), 301);
        assert_eq!(series.samples[0].secs, 0.0);
        assert_eq!(series.samples[300].secs, 300.0);
        assert_eq!(series.warmup().len(), 30);
        assert_eq!(series.steady_state().len(), 271);
    }

    #[test]
    fn test_values_are_clipped() {
        let series = series(7);
        for sample in &series.samples {
            assert!(sample.tps >= 77.2 * 0.5 && sample.tps <= 77.2 * 1.5);
        }
    }

    #[test]
    fn test_warmup_excluded_from_mean() {
        let mut config = TimelineConfig::for_baseline(100.0);
        config.noise_tps = 0.0;
        config.wave_tps = 0.0;

        let series = generate(&config, &mut StdRng::seed_from_u64(0)).unwrap();

        // Warmup samples ramp from the clip floor, the steady state is flat
        assert!(series.warmup().iter().all(|s| s.tps < 100.0));
        assert_eq!(series.steady_mean(), 100.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut rng = StdRng::seed_from_u64(0);

        let mut config = TimelineConfig::for_baseline(77.2);
        config.warmup_secs = config.duration_secs;
        assert!(generate(&config, &mut rng).is_err());

        let config = TimelineConfig::for_baseline(-1.0);
        assert!(generate(&config, &mut rng).is_err());

        let mut config = TimelineConfig::for_baseline(77.2);
        config.interval_secs = 0;
        assert!(generate(&config, &mut rng).is_err());
    }

    #[test]
    fn test_zero_baseline_is_flat() {
        let config = TimelineConfig::for_baseline(0.0);
        let series = generate(&config, &mut StdRng::seed_from_u64(DEFAULT_SEED)).unwrap();

        assert_eq!(series.samples.len(), 301);
        assert!(series.samples.iter().all(|s| s.tps == 0.0));
        assert_eq!(series.steady_mean(), 0.0);
    }
}
