pub mod json;
pub mod terminal;

use crate::analyzers::{calculate_frequency, detect_patterns, generate_recommendations, identify_hotspots};
use crate::store::HistoryStore;
use crate::types::{HistoryReport, ReportMeta};

/// Derives every report section from the current contents of `store`.
pub fn build_report(store: &HistoryStore, meta: ReportMeta) -> HistoryReport {
    HistoryReport {
        meta,
        statistics: store.calculate_statistics(),
        frequency: calculate_frequency(store),
        patterns: detect_patterns(store),
        hotspots: identify_hotspots(store),
        recommendations: generate_recommendations(store),
    }
}
