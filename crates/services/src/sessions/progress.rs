use exam_core::time::TimeBand;

/// Aggregated view of exam progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamProgress {
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub percent: u32,
    pub time_remaining: u32,
    pub time_band: TimeBand,
    pub is_submitted: bool,
}
