use tracing::debug;
use vkrpc_domain::CallSpec;

use super::ast::Stmt;
use super::plan::BatchPlan;
use super::render::{ScriptDialect, VkScript};
use super::ScriptError;

/// Compiles batch plans into `execute` calls.
#[derive(Debug, Default, Clone)]
pub struct BatchCompiler<D = VkScript> {
    dialect: D,
}

impl BatchCompiler<VkScript> {
    pub fn new() -> Self {
        Self { dialect: VkScript }
    }
}

impl<D: ScriptDialect> BatchCompiler<D> {
    pub fn with_dialect(dialect: D) -> Self {
        Self { dialect }
    }

    /// Render `plan` and wrap it as one `execute` call.
    pub fn compile(&self, plan: &dyn BatchPlan) -> Result<CallSpec, ScriptError> {
        let script = plan.to_script()?;
        let text = self.dialect.render(&script)?;

        debug!(
            max_subcalls = plan.max_subcalls(),
            call_sites = count_subcalls(&script.body),
            bytes = text.len(),
            "compiled batch plan"
        );
        Ok(CallSpec::execute(text))
    }
}

fn count_subcalls(body: &[Stmt]) -> usize {
    body.iter()
        .map(|stmt| match stmt {
            Stmt::Let(_, value) | Stmt::Return(value) => value.subcalls(),
            Stmt::Assign(target, value) | Stmt::Push(target, value) => target.subcalls() + value.subcalls(),
            Stmt::While { cond, body } => cond.subcalls() + count_subcalls(body),
            Stmt::If { cond, then, otherwise } => cond.subcalls() + count_subcalls(then) + count_subcalls(otherwise),
        })
        .sum()
}
