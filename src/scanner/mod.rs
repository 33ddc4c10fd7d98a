pub mod analyzer;
pub mod ignore;
pub mod limiter;
pub mod session;
pub mod size_cache;
pub mod size_walker;

pub use analyzer::{analyze_children, analyze_folders, anchored_ignore_patterns, workspace_folders, AnalyzeOptions};
pub use ignore::IgnoreMatcher;
pub use limiter::ConcurrencyLimiter;
pub use session::{SizeRequest, SizeSession};
pub use size_cache::SizeCache;
pub use size_walker::{compute_size, SizeWalker};
