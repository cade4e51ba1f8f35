use std::collections::HashMap;

use crate::model::ids::QuestionId;
use crate::model::question::AnswerOption;

/// Selected option per question. A missing key means "unanswered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerMap {
    selected: HashMap<QuestionId, AnswerOption>,
}

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `option` for `question_id`, returning the previous selection.
    pub fn set(&mut self, question_id: QuestionId, option: AnswerOption) -> Option<AnswerOption> {
        self.selected.insert(question_id, option)
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<AnswerOption> {
        self.selected.get(&question_id).copied()
    }

    #[must_use]
    pub fn contains(&self, question_id: QuestionId) -> bool {
        self.selected.contains_key(&question_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, AnswerOption)> + '_ {
        self.selected.iter().map(|(id, option)| (*id, *option))
    }
}
