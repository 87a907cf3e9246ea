use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{count, offset, items}` returned by a paginated execute script.
///
/// `count` is the total the platform reported, `offset` the next untried
/// position. The fetch is complete once `count <= offset`.
///
/// Anchored listings (comments paged from a start comment) measure position
/// with a field the platform reports, so `offset` is not the value to send
/// back. Their scripts also return `next_offset`, the request offset a
/// continuation starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self { count: 0, offset: 0, items: Vec::new(), next_offset: None }
    }
}

impl<T> PageResult<T> {
    pub fn is_complete(&self) -> bool {
        self.count <= self.offset
    }

    /// Request offset a continuation script starts from.
    pub fn resume_offset(&self) -> u64 {
        self.next_offset.unwrap_or(self.offset)
    }

    /// Append a continuation page, taking over its cursor and total.
    pub fn absorb(&mut self, next: PageResult<T>) {
        self.count = next.count;
        self.offset = next.offset;
        self.next_offset = next.next_offset;
        self.items.extend(next.items);
    }
}

/// `{items, rq_data}` returned by a multi-entity execute script.
///
/// `rq_data[i]` is the correlation record the caller supplied for
/// `items[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPageResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<PageResult<T>>,
    #[serde(default)]
    pub rq_data: Vec<Value>,
}

impl<T> Default for MultiPageResult<T> {
    fn default() -> Self {
        Self { items: Vec::new(), rq_data: Vec::new() }
    }
}

impl<T> MultiPageResult<T> {
    /// Pair each per-entity page with its correlation record.
    pub fn pairs(&self) -> impl Iterator<Item = (&Value, &PageResult<T>)> {
        self.rq_data.iter().zip(self.items.iter())
    }

    pub fn extend(&mut self, other: MultiPageResult<T>) {
        self.items.extend(other.items);
        self.rq_data.extend(other.rq_data);
    }
}
