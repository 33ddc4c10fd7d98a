pub mod size_result;

pub use size_result::{AnalysisSummary, ChildSize, FolderSizeResult, RootError};
