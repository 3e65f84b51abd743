pub mod compare;
pub mod dataset;
pub mod report;
pub mod similarity;
pub mod summary;

pub mod prelude {
    pub use crate::compare::{Comparison, ComparisonReport};
    pub use crate::dataset::Dataset;
    pub use crate::report::Reporter;
    pub use crate::similarity::{Scorer, SimilarityScorer, score};
    pub use crate::summary::{ModelSummary, Prediction, ScoredPrediction, rank};
}
