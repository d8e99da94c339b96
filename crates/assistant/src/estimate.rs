use async_trait::async_trait;
use shared::domain::{AdditionalService, CostRange};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub origin: String,
    pub destination: String,
    pub move_size: String,
    pub additional_services: Vec<AdditionalService>,
    pub move_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceCosts {
    pub packing: f64,
    pub storage: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("unrecognised move size: {0}")]
    UnknownMoveSize(String),
}

#[async_trait]
pub trait CostEstimator: Send + Sync {
    async fn estimate(&self, request: &EstimateRequest) -> Result<CostRange, EstimateError>;
    fn additional_service_costs(&self, move_size: &str) -> Result<ServiceCosts, EstimateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeClass {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreeBedroom,
    FourPlus,
    Office,
}

impl SizeClass {
    /// The first run of digits is the bedroom count. Without one, whole words are
    /// matched so that "phone" or "none" do not read as "one".
    fn classify(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has_word = |stem: &str| words.iter().any(|w| w.starts_with(stem));

        if has_word("studio") {
            return Some(SizeClass::Studio);
        }
        if has_word("office") {
            return Some(SizeClass::Office);
        }

        let digits: String = lower
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        let bedrooms = if digits.is_empty() {
            [("one", 1), ("two", 2), ("three", 3), ("four", 4), ("five", 5)]
                .iter()
                .find(|(word, _)| words.contains(word))
                .map(|(_, n)| *n)
        } else {
            // Anything too long for u64 is still a very large home.
            Some(digits.parse::<u64>().unwrap_or(u64::MAX))
        };
        match bedrooms {
            Some(0) => Some(SizeClass::Studio),
            Some(1) => Some(SizeClass::OneBedroom),
            Some(2) => Some(SizeClass::TwoBedroom),
            Some(3) => Some(SizeClass::ThreeBedroom),
            Some(_) => Some(SizeClass::FourPlus),
            None if has_word("house") || has_word("home") => Some(SizeClass::FourPlus),
            None => None,
        }
    }

    /// Base price, packing surcharge, storage surcharge.
    fn rates(self) -> (f64, f64, f64) {
        match self {
            SizeClass::Studio => (400.0, 120.0, 80.0),
            SizeClass::OneBedroom => (700.0, 200.0, 140.0),
            SizeClass::TwoBedroom => (1100.0, 320.0, 220.0),
            SizeClass::ThreeBedroom => (1600.0, 480.0, 320.0),
            SizeClass::FourPlus => (2300.0, 690.0, 460.0),
            SizeClass::Office => (3000.0, 900.0, 600.0),
        }
    }
}

/// Fixed price list keyed by move size with a symmetric band around the total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCardEstimator {
    pub band: f64,
}

impl Default for RateCardEstimator {
    fn default() -> Self {
        Self { band: 0.15 }
    }
}

impl RateCardEstimator {
    fn size_class(move_size: &str) -> Result<SizeClass, EstimateError> {
        SizeClass::classify(move_size)
            .ok_or_else(|| EstimateError::UnknownMoveSize(move_size.to_string()))
    }
}

#[async_trait]
impl CostEstimator for RateCardEstimator {
    async fn estimate(&self, request: &EstimateRequest) -> Result<CostRange, EstimateError> {
        if request.origin.trim().is_empty() {
            return Err(EstimateError::MissingField("origin"));
        }
        if request.destination.trim().is_empty() {
            return Err(EstimateError::MissingField("destination"));
        }
        let (base, packing, storage) = Self::size_class(&request.move_size)?.rates();
        let extras: f64 = request
            .additional_services
            .iter()
            .map(|service| match service {
                AdditionalService::Packing => packing,
                AdditionalService::Storage => storage,
            })
            .sum();
        let total = base + extras;
        Ok(CostRange {
            min: (total * (1.0 - self.band)).round(),
            max: (total * (1.0 + self.band)).round(),
        })
    }

    fn additional_service_costs(&self, move_size: &str) -> Result<ServiceCosts, EstimateError> {
        let (_, packing, storage) = Self::size_class(move_size)?.rates();
        Ok(ServiceCosts { packing, storage })
    }
}

#[cfg(test)]
#[path = "tests/estimate_tests.rs"]
mod tests;
