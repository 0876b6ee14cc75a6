use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RainfallSample {
    pub district: String,
    pub rainfall: u32,
    pub recorded_by: String,
}

/// Source of the off-chain measurement the oracle publishes.
pub trait RainfallSampler: Send + Sync {
    fn sample(&self) -> RainfallSample;
}

/// Generates a uniform reading in `0..max_exclusive_mm` for a fixed district.
#[derive(Debug, Clone)]
pub struct RandomRainfallSampler {
    district: String,
    recorded_by: String,
    max_exclusive_mm: u32,
}

impl RandomRainfallSampler {
    pub fn new(
        district: impl Into<String>,
        recorded_by: impl Into<String>,
        max_exclusive_mm: u32,
    ) -> Self {
        Self {
            district: district.into(),
            recorded_by: recorded_by.into(),
            max_exclusive_mm: max_exclusive_mm.max(1),
        }
    }
}

impl RainfallSampler for RandomRainfallSampler {
    fn sample(&self) -> RainfallSample {
        RainfallSample {
            district: self.district.clone(),
            rainfall: rand::thread_rng().gen_range(0..self.max_exclusive_mm),
            recorded_by: self.recorded_by.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedRainfallSampler {
    sample: RainfallSample,
}

impl FixedRainfallSampler {
    pub fn new(sample: RainfallSample) -> Self {
        Self { sample }
    }
}

impl RainfallSampler for FixedRainfallSampler {
    fn sample(&self) -> RainfallSample {
        self.sample.clone()
    }
}
