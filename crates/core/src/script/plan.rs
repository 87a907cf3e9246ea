//! Batch plans
//!
//! A plan describes one server-side script: which sub-call to repeat, how
//! results accumulate, and when the loop stops. Plans are validated when
//! they are turned into a [`Script`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use vkrpc_domain::constants::{DEFAULT_PAGE_SIZE, MAX_SUBCALLS_PER_SCRIPT};
use vkrpc_domain::{CallSpec, PageResult};

use super::ast::{Expr, Script, Stmt};
use super::render::{is_identifier, is_method_name};
use super::walk::PageWalk;
use super::ScriptError;

const OFFSET_PARAM: &str = "offset";
const COUNT_PARAM: &str = "count";

/// Something the batch compiler can turn into one `execute` call.
pub trait BatchPlan {
    /// Upper bound on the sub-calls the script issues.
    fn max_subcalls(&self) -> u32;

    fn to_script(&self) -> Result<Script, ScriptError>;
}

/// Remote method plus the arguments every sub-call shares.
#[derive(Debug, Clone, PartialEq)]
pub struct SubCall {
    method: String,
    params: BTreeMap<String, Value>,
}

impl SubCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: BTreeMap::new() }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    fn validate(&self) -> Result<(), ScriptError> {
        if !is_method_name(&self.method) {
            return Err(ScriptError::InvalidMethod(self.method.clone()));
        }
        match self.params.keys().find(|key| !is_identifier(key)) {
            Some(key) => Err(ScriptError::InvalidIdentifier(key.clone())),
            None => Ok(()),
        }
    }

    /// Fixed arguments followed by per-iteration ones; later keys win.
    fn expr(&self, per_call: Vec<(String, Expr)>) -> Expr {
        let mut args: Vec<(String, Expr)> = self
            .params
            .iter()
            .filter(|(key, _)| !per_call.iter().any(|(k, _)| k == *key))
            .map(|(key, value)| (key.clone(), Expr::Literal(value.clone())))
            .collect();
        args.extend(per_call);
        Expr::api(self.method.clone(), args)
    }

    fn call_spec(&self) -> CallSpec {
        CallSpec::new(self.method.clone()).params(self.params.iter().map(|(key, value)| (key.clone(), param_text(value))))
    }
}

/// Form value of a JSON argument: strings are sent bare.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn check_budget(requested: usize) -> Result<(), ScriptError> {
    if requested == 0 {
        return Err(ScriptError::Empty);
    }
    if requested > MAX_SUBCALLS_PER_SCRIPT as usize {
        return Err(ScriptError::TooManySubcalls { requested, limit: MAX_SUBCALLS_PER_SCRIPT });
    }
    Ok(())
}

fn arg(name: &str, value: Expr) -> (String, Expr) {
    (name.to_string(), value)
}

// ============================================================================
// Single-entity pagination
// ============================================================================

/// Fetch one paginated collection, up to `max_iterations` pages per script.
///
/// The script returns `{count, offset, items}`; when `count > offset` the
/// caller resumes with [`resume_from`](Self::resume_from).
///
/// Listings that page from an anchor (`wall.getComments` with
/// `start_comment_id`) report their absolute position in a response field.
/// Name it with [`progress_field`](Self::progress_field) and the loop stops
/// once `res.<field> + limit` reaches the total; the script then also returns
/// `next_offset` for resuming.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedPlan {
    call: SubCall,
    page_size: u32,
    start_offset: u64,
    max_iterations: u32,
    progress_field: Option<String>,
}

impl PaginatedPlan {
    pub fn new(call: SubCall) -> Self {
        Self {
            call,
            page_size: DEFAULT_PAGE_SIZE,
            start_offset: 0,
            max_iterations: MAX_SUBCALLS_PER_SCRIPT,
            progress_field: None,
        }
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Response field holding the page's absolute position, e.g. `real_offset`.
    #[must_use]
    pub fn progress_field(mut self, field: impl Into<String>) -> Self {
        self.progress_field = Some(field.into());
        self
    }

    pub fn sub_call(&self) -> &SubCall {
        &self.call
    }

    pub fn offset(&self) -> u64 {
        self.start_offset
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress_field.as_deref()
    }

    /// Plan for the next script, or `None` when `page` is complete.
    pub fn resume_from<T>(&self, page: &PageResult<T>) -> Option<Self> {
        (!page.is_complete()).then(|| self.clone().start_offset(page.resume_offset()))
    }

    /// Cursor state matching one run of this plan's script.
    pub fn walk(&self) -> PageWalk {
        let walk = PageWalk::bounded(self.start_offset, self.page_size, self.max_iterations);
        match self.progress_field {
            Some(_) => walk.tracking_progress(),
            None => walk,
        }
    }

    /// Single non-batched request for the page at `offset`.
    pub fn page_call(&self, offset: u64) -> CallSpec {
        self.call.call_spec().param(OFFSET_PARAM, offset).param(COUNT_PARAM, self.page_size)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        self.call.validate()?;
        if self.page_size == 0 {
            return Err(ScriptError::InvalidPlan("page size must be positive".into()));
        }
        if let Some(field) = self.progress_field.as_ref().filter(|field| !is_identifier(field)) {
            return Err(ScriptError::InvalidIdentifier(field.clone()));
        }
        check_budget(self.max_iterations as usize)
    }
}

impl BatchPlan for PaginatedPlan {
    fn max_subcalls(&self) -> u32 {
        self.max_iterations
    }

    fn to_script(&self) -> Result<Script, ScriptError> {
        self.validate()?;

        let offset = || Expr::var("offset");
        let count = || Expr::var("count");
        let cnt = || Expr::var("cnt");
        let limit = || Expr::var("limit");
        let items = || Expr::var("items");
        let res = || Expr::var("res");
        let start = i64::try_from(self.start_offset)
            .map_err(|_| ScriptError::InvalidPlan(format!("offset {} out of range", self.start_offset)))?;

        let fetch = self.call.expr(vec![arg(OFFSET_PARAM, offset()), arg(COUNT_PARAM, limit())]);

        // offset-driven plans compare the request offset itself
        let position = || match self.progress_field {
            Some(_) => Expr::var("progress"),
            None => offset(),
        };

        let mut body = vec![
            Stmt::let_("offset", Expr::int(start)),
            Stmt::let_("limit", Expr::int(i64::from(self.page_size))),
            Stmt::let_("cnt", Expr::int(i64::from(self.max_iterations))),
        ];
        if self.progress_field.is_some() {
            body.push(Stmt::let_("progress", Expr::int(0)));
        }
        body.push(Stmt::let_("count", position().plus(Expr::int(1))));
        body.push(Stmt::let_("items", Expr::empty_array()));

        let mut on_page = vec![
            Stmt::assign(count(), res().field("count")),
            Stmt::assign(items(), items().plus(res().field("items"))),
            Stmt::assign(offset(), offset().plus(limit())),
        ];
        if let Some(field) = &self.progress_field {
            on_page.push(Stmt::assign(position(), res().field(field.clone()).plus(limit())));
        }

        body.push(Stmt::While {
            cond: cnt().greater_than(Expr::int(0)).and(position().less_than(count())),
            body: vec![
                Stmt::let_("res", fetch),
                Stmt::assign(cnt(), cnt().minus(Expr::int(1))),
                Stmt::If {
                    cond: res().field("count"),
                    then: on_page,
                    otherwise: vec![Stmt::assign(count(), position()), Stmt::assign(cnt(), Expr::int(0))],
                },
            ],
        });

        let mut result = vec![arg("count", count()), arg("offset", position()), arg("items", items())];
        if self.progress_field.is_some() {
            result.push(arg("next_offset", offset()));
        }
        body.push(Stmt::Return(Expr::Object(result)));

        Ok(Script::new(body))
    }
}

// ============================================================================
// Multi-entity first pages
// ============================================================================

/// One first page for each of up to 25 entities.
///
/// Each entity is a JSON object of request data. Sub-call arguments are
/// bound to its fields, and the object is echoed back in `rq_data` in the
/// same position as its page in `items`. An entity whose page has a falsy
/// count gets an empty page, so the two arrays always line up.
///
/// An entity with its own truthy `limit` field is fetched with that page
/// size; the others get the plan's.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiEntityPlan {
    call: SubCall,
    page_size: u32,
    bindings: Vec<(String, String)>,
    entities: Vec<Map<String, Value>>,
}

impl MultiEntityPlan {
    pub fn new(call: SubCall) -> Self {
        Self { call, page_size: DEFAULT_PAGE_SIZE, bindings: Vec::new(), entities: Vec::new() }
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Pass the entity field `field` as sub-call argument `param`.
    #[must_use]
    pub fn bind(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.bindings.push((param.into(), field.into()));
        self
    }

    #[must_use]
    pub fn entity(mut self, entity: Map<String, Value>) -> Self {
        self.entities.push(entity);
        self
    }

    #[must_use]
    pub fn entities(mut self, entities: impl IntoIterator<Item = Map<String, Value>>) -> Self {
        self.entities.extend(entities);
        self
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Split into plans of at most `MAX_SUBCALLS_PER_SCRIPT` entities,
    /// preserving order.
    pub fn split(&self) -> Vec<Self> {
        self.entities
            .chunks(MAX_SUBCALLS_PER_SCRIPT as usize)
            .map(|chunk| Self { entities: chunk.to_vec(), ..self.clone() })
            .collect()
    }

    fn validate(&self) -> Result<(), ScriptError> {
        self.call.validate()?;
        if self.page_size == 0 {
            return Err(ScriptError::InvalidPlan("page size must be positive".into()));
        }
        for (param, field) in &self.bindings {
            for name in [param, field] {
                if !is_identifier(name) {
                    return Err(ScriptError::InvalidIdentifier(name.clone()));
                }
            }
        }
        check_budget(self.entities.len())
    }
}

impl BatchPlan for MultiEntityPlan {
    fn max_subcalls(&self) -> u32 {
        u32::try_from(self.entities.len()).unwrap_or(u32::MAX)
    }

    fn to_script(&self) -> Result<Script, ScriptError> {
        self.validate()?;

        let arr = || Expr::var("arr");
        let h = || Expr::var("h");
        let res = || Expr::var("res");
        let limit = || Expr::var("limit");
        let items = || Expr::var("items");
        let rq_data = || Expr::var("rq_data");

        let entity_limit = || h().field("limit");

        let mut per_call: Vec<(String, Expr)> =
            self.bindings.iter().map(|(param, field)| arg(param, h().field(field.clone()))).collect();
        per_call.push(arg(COUNT_PARAM, entity_limit()));
        let fetch = self.call.expr(per_call);

        let entities = Value::Array(self.entities.iter().cloned().map(Value::Object).collect());
        let empty_page =
            Expr::Object(vec![arg("count", Expr::int(0)), arg("offset", Expr::int(0)), arg("items", Expr::empty_array())]);

        Ok(Script::new(vec![
            Stmt::let_("arr", Expr::Literal(entities)),
            Stmt::let_("limit", Expr::int(i64::from(self.page_size))),
            Stmt::let_("items", Expr::empty_array()),
            Stmt::let_("rq_data", Expr::empty_array()),
            Stmt::While {
                cond: arr().field("length").greater_than(Expr::int(0)),
                body: vec![
                    Stmt::let_("h", arr().shift()),
                    Stmt::If {
                        cond: entity_limit().negate(),
                        then: vec![Stmt::assign(entity_limit(), limit())],
                        otherwise: vec![],
                    },
                    Stmt::let_("res", fetch),
                    Stmt::If {
                        cond: res().field("count"),
                        then: vec![Stmt::assign(res().field("offset"), entity_limit()), Stmt::push(items(), res())],
                        otherwise: vec![Stmt::push(items(), empty_page)],
                    },
                    Stmt::push(rq_data(), h()),
                ],
            },
            Stmt::Return(Expr::Object(vec![arg("items", items()), arg("rq_data", rq_data())])),
        ]))
    }
}

// ============================================================================
// Chunked by-id lookup
// ============================================================================

/// Comma-joined chunks of at most `size` ids, in order.
pub fn chunk_ids<S: AsRef<str>>(ids: &[S], size: usize) -> Vec<String> {
    if size == 0 {
        return Vec::new();
    }
    ids.chunks(size).map(|chunk| chunk.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")).collect()
}

/// Look up many ids with one sub-call per chunk; results are concatenated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedLookupPlan {
    call: SubCall,
    id_param: String,
    chunk_size: usize,
    ids: Vec<String>,
}

impl ChunkedLookupPlan {
    pub fn new(call: SubCall, id_param: impl Into<String>, chunk_size: usize) -> Self {
        Self { call, id_param: id_param.into(), chunk_size, ids: Vec::new() }
    }

    #[must_use]
    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    fn chunks(&self) -> Vec<String> {
        chunk_ids(&self.ids, self.chunk_size)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        self.call.validate()?;
        if !is_identifier(&self.id_param) {
            return Err(ScriptError::InvalidIdentifier(self.id_param.clone()));
        }
        if self.chunk_size == 0 {
            return Err(ScriptError::InvalidPlan("chunk size must be positive".into()));
        }
        check_budget(self.chunks().len())
    }
}

impl BatchPlan for ChunkedLookupPlan {
    fn max_subcalls(&self) -> u32 {
        u32::try_from(self.chunks().len()).unwrap_or(u32::MAX)
    }

    fn to_script(&self) -> Result<Script, ScriptError> {
        self.validate()?;

        let arr = || Expr::var("arr");
        let ans = || Expr::var("ans");
        let res = || Expr::var("res");
        let fetch = self.call.expr(vec![arg(&self.id_param, Expr::var("chunk"))]);

        Ok(Script::new(vec![
            Stmt::let_("arr", Expr::literal(self.chunks())),
            Stmt::let_("ans", Expr::empty_array()),
            Stmt::While {
                cond: arr().field("length").greater_than(Expr::int(0)),
                body: vec![
                    Stmt::let_("chunk", arr().shift()),
                    Stmt::let_("res", fetch),
                    Stmt::If { cond: res(), then: vec![Stmt::assign(ans(), ans().plus(res()))], otherwise: vec![] },
                ],
            },
            Stmt::Return(ans()),
        ]))
    }
}
