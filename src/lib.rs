pub mod classify;
pub mod cluster;
pub mod config;
pub mod error;
pub mod golden;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod similarity;
pub mod tabular;
pub mod types;

pub const TARGET_NORMALIZE: &str = "normalize";
pub const TARGET_GOLDEN: &str = "golden";
pub const TARGET_MATCH: &str = "match";
pub const TARGET_CLUSTER: &str = "cluster";
pub const TARGET_PIPELINE: &str = "pipeline";
pub const TARGET_IO: &str = "medmatch_io";
