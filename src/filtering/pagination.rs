use crate::{models::DrawRequest, plan::QueryPlan};

/// Offset and page size of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paging {
    pub offset: u64,
    /// `None` means no limit
    pub length: Option<u64>,
}

impl Paging {
    /// Length sentinel clients send to request every row.
    pub const NO_LIMIT: i64 = -1;

    /// Negative starts clamp to 0; a missing or negative length means no limit.
    #[must_use]
    pub fn new(start: i64, length: Option<i64>) -> Self {
        Self {
            offset: u64::try_from(start).unwrap_or(0),
            length: length.and_then(|length| u64::try_from(length).ok()),
        }
    }

    #[must_use]
    pub fn from_request(request: &DrawRequest) -> Self {
        Self::new(request.start, request.length)
    }

    /// `LIMIT length OFFSET offset`, or the plan unchanged when unlimited.
    #[must_use]
    pub fn apply(self, plan: QueryPlan) -> QueryPlan {
        match self.length {
            Some(length) => plan.limit(length, self.offset),
            None => plan,
        }
    }
}
