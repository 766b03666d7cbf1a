pub mod pattern;

pub use pattern::TestPatternSource;
