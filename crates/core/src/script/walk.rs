use vkrpc_domain::PageResult;

/// Cursor state of an accumulate-until-exhausted pagination.
///
/// This is the loop the paginated script runs server-side, in executable
/// form: it drives direct (one call per page) pagination and documents the
/// termination rules the compiled script must follow.
///
/// - the total starts one past the cursor, so the first page is always
///   requested
/// - a page with a positive count records it as the total and advances the
///   cursor by one page
/// - a page with a falsy count marks the walk exhausted (`count = offset`)
/// - the walk stops when the cursor reaches the total or the iteration
///   budget runs out
///
/// A walk [`tracking_progress`](Self::tracking_progress) compares the total
/// against the position the platform reports for each page (plus one page)
/// instead of the request offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWalk {
    offset: u64,
    count: u64,
    page_size: u32,
    remaining: Option<u32>,
    progress: Option<u64>,
}

impl PageWalk {
    /// Walk with at most `max_iterations` page requests.
    pub fn bounded(start_offset: u64, page_size: u32, max_iterations: u32) -> Self {
        Self { remaining: Some(max_iterations), ..Self::unbounded(start_offset, page_size) }
    }

    /// Walk that only stops at exhaustion.
    pub fn unbounded(start_offset: u64, page_size: u32) -> Self {
        Self { offset: start_offset, count: start_offset.saturating_add(1), page_size, remaining: None, progress: None }
    }

    /// Terminate on reported positions; see [`record_progress`](Self::record_progress).
    #[must_use]
    pub fn tracking_progress(mut self) -> Self {
        self.progress = Some(0);
        self
    }

    /// Cursor of the next page to request, if any.
    pub fn next_offset(&self) -> Option<u64> {
        let budget_left = self.remaining.map_or(true, |n| n > 0);
        (budget_left && self.position() < self.count).then_some(self.offset)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Record the count a page reported. `None` or zero is falsy.
    pub fn record(&mut self, reported_count: Option<u64>) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        match reported_count.filter(|count| *count > 0) {
            Some(count) => {
                self.count = count;
                self.offset = self.offset.saturating_add(u64::from(self.page_size));
            }
            None => {
                self.count = self.position();
                if self.remaining.is_some() {
                    self.remaining = Some(0);
                }
            }
        }
    }

    /// Record a page together with the position the platform reported for
    /// it. The walk's position becomes `reported + page_size`; a page without
    /// a reported position moves it one page forward.
    pub fn record_progress(&mut self, reported_count: Option<u64>, reported_position: Option<u64>) {
        let truthy = reported_count.is_some_and(|count| count > 0);
        if truthy {
            let base = reported_position.unwrap_or_else(|| self.position());
            self.progress = Some(base.saturating_add(u64::from(self.page_size)));
        }
        self.record(reported_count);
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Position compared against the total: the reported progress when
    /// tracked, the request offset otherwise.
    pub fn position(&self) -> u64 {
        self.progress.unwrap_or(self.offset)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether the whole result set has been fetched.
    pub fn is_exhausted(&self) -> bool {
        self.count <= self.position()
    }

    /// Package accumulated items with the final cursor.
    pub fn finish<T>(&self, items: Vec<T>) -> PageResult<T> {
        PageResult {
            count: self.count,
            offset: self.position(),
            items,
            next_offset: self.progress.map(|_| self.offset),
        }
    }
}
