use crate::{
    match_log::MatchResult,
    pool::UnmatchedPool,
    rule::{RuleContext, RuleKind, RuleProcessor, ice},
};

/// S2 - calendar spread, sharing R2's scan under the SGX rule id.
#[derive(Debug, Copy, Clone, Default)]
pub struct CalendarSpread;

impl RuleProcessor for CalendarSpread {
    fn kind(&self) -> RuleKind {
        RuleKind::SgxCalendarSpread
    }

    fn apply(&self, pool: &mut UnmatchedPool, ctx: &RuleContext<'_>) -> Vec<MatchResult> {
        ice::calendar_spread::scan(self.kind(), pool, ctx)
    }
}
