#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod engine;
mod weights;

pub use engine::{
    compute_factors, rank_with_availability, recommended, RankedCandidate, RankingConfig,
    RankingEngine, RankingFactors,
};
pub use weights::{RankingWeights, DEFAULT_WEIGHTS};

#[cfg(test)]
mod tests;
