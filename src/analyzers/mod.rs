pub mod classifier;
pub mod revert_tracker;
pub mod tables;
pub mod trend;

pub use classifier::{
    analyze_commit_message, classify_message, detect_revert_commits, extract_migration_info,
    find_related_commits,
};
pub use trend::{calculate_frequency, detect_patterns, generate_recommendations, identify_hotspots};
