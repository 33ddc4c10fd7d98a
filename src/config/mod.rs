pub mod defaults;
pub mod ignore_file;
pub mod settings;

pub use ignore_file::{compose_ignore_file, load_ignore_file, merge_patterns, parse_ignore_file, write_ignore_file};
pub use settings::Settings;
