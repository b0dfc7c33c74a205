pub mod analysis;
pub mod profile;
pub mod report;

pub use analysis::{Analyzer, AnalyzerConfig, CandidateGroup, StreamAnalysis, TextSource};
pub use profile::StreamProfile;
pub use report::{ReportOptions, render};
