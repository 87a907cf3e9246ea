//! Dialect renderers
//!
//! A renderer owns the surface syntax of one remote scripting language. The
//! plan tree carries the loop and termination logic; nothing here decides
//! when a plan stops.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::ast::{Expr, Script, Stmt};
use super::ScriptError;

static IDENTIFIER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());
static METHOD_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-z]+\.[A-Za-z]+$").ok());

/// Turns a plan tree into script text for one remote dialect.
pub trait ScriptDialect: Send + Sync {
    fn render(&self, script: &Script) -> Result<String, ScriptError>;
}

/// The platform's `execute` language (a small JavaScript subset with
/// `API.<section>.<method>({...})` sub-calls).
#[derive(Debug, Default, Clone, Copy)]
pub struct VkScript;

impl ScriptDialect for VkScript {
    fn render(&self, script: &Script) -> Result<String, ScriptError> {
        if !matches!(script.body.last(), Some(Stmt::Return(_))) {
            return Err(ScriptError::InvalidPlan("script must end with a return statement".into()));
        }

        let mut emitter = Emitter::default();
        for stmt in &script.body {
            emitter.stmt(stmt)?;
        }
        Ok(emitter.out)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    IDENTIFIER.as_ref().is_some_and(|re| re.is_match(name))
}

pub(crate) fn is_method_name(name: &str) -> bool {
    METHOD_NAME.as_ref().is_some_and(|re| re.is_match(name))
}

#[derive(Default)]
struct Emitter {
    out: String,
    indent: usize,
}

impl Emitter {
    fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn open_block(&mut self, head: &str) {
        self.line(&format!("{head} {{"));
        self.indent += 1;
    }

    fn close_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    fn block(&mut self, body: &[Stmt]) -> Result<(), ScriptError> {
        for stmt in body {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Let(name, value) => {
                let value = expr(value)?;
                self.line(&format!("var {} = {value};", ident(name)?));
            }
            Stmt::Assign(target, value) => {
                if !matches!(target, Expr::Var(_) | Expr::Field(..)) {
                    return Err(ScriptError::InvalidPlan(format!("cannot assign to {target:?}")));
                }
                self.line(&format!("{} = {};", expr(target)?, expr(value)?));
            }
            Stmt::Push(target, value) => {
                self.line(&format!("{}.push({});", expr(target)?, expr(value)?));
            }
            Stmt::While { cond, body } => {
                self.open_block(&format!("while ({})", expr(cond)?));
                self.block(body)?;
                self.close_block();
            }
            Stmt::If { cond, then, otherwise } => {
                self.open_block(&format!("if ({})", expr(cond)?));
                self.block(then)?;
                if otherwise.is_empty() {
                    self.close_block();
                } else {
                    self.indent = self.indent.saturating_sub(1);
                    self.open_block("} else");
                    self.block(otherwise)?;
                    self.close_block();
                }
            }
            Stmt::Return(value) => {
                self.line(&format!("return {};", expr(value)?));
            }
        }
        Ok(())
    }
}

fn ident(name: &str) -> Result<&str, ScriptError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(ScriptError::InvalidIdentifier(name.to_string()))
    }
}

fn literal(value: &Value) -> Result<String, ScriptError> {
    serde_json::to_string(value).map_err(|e| ScriptError::InvalidPlan(e.to_string()))
}

fn object(fields: &[(String, Expr)]) -> Result<String, ScriptError> {
    if fields.is_empty() {
        return Ok("{}".to_string());
    }
    let rendered = fields
        .iter()
        .map(|(key, value)| Ok(format!("{}: {}", ident(key)?, expr(value)?)))
        .collect::<Result<Vec<_>, ScriptError>>()?;
    Ok(format!("{{{}}}", rendered.join(", ")))
}

fn operand(e: &Expr) -> Result<String, ScriptError> {
    match e {
        Expr::Binary { .. } => Ok(format!("({})", expr(e)?)),
        _ => expr(e),
    }
}

fn expr(e: &Expr) -> Result<String, ScriptError> {
    Ok(match e {
        Expr::Literal(value) => literal(value)?,
        Expr::Var(name) => ident(name)?.to_string(),
        Expr::Field(target, name) => format!("{}.{}", operand(target)?, ident(name)?),
        Expr::Shift(target) => format!("{}.shift()", operand(target)?),
        Expr::Api { method, args } => {
            if !is_method_name(method) {
                return Err(ScriptError::InvalidMethod(method.clone()));
            }
            format!("API.{method}({})", object(args)?)
        }
        Expr::Object(fields) => object(fields)?,
        Expr::Binary { op, lhs, rhs } => format!("{} {} {}", operand(lhs)?, op.symbol(), operand(rhs)?),
        Expr::Not(inner) => format!("!{}", operand(inner)?),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(body: Vec<Stmt>) -> Result<String, ScriptError> {
        VkScript.render(&Script::new(body))
    }

    #[test]
    fn renders_loop_with_indentation() {
        let text = render(vec![
            Stmt::let_("arr", Expr::literal(json!(["1,2", "3"]))),
            Stmt::let_("ans", Expr::empty_array()),
            Stmt::While {
                cond: Expr::var("arr").field("length").greater_than(Expr::int(0)),
                body: vec![
                    Stmt::let_("str", Expr::var("arr").shift()),
                    Stmt::let_(
                        "res",
                        Expr::api("wall.getById", vec![("posts".into(), Expr::var("str"))]),
                    ),
                    Stmt::If {
                        cond: Expr::var("res"),
                        then: vec![Stmt::assign(Expr::var("ans"), Expr::var("ans").plus(Expr::var("res")))],
                        otherwise: vec![],
                    },
                ],
            },
            Stmt::Return(Expr::var("ans")),
        ])
        .unwrap();

        let expected = "\
var arr = [\"1,2\",\"3\"];
var ans = [];
while (arr.length > 0) {
  var str = arr.shift();
  var res = API.wall.getById({posts: str});
  if (res) {
    ans = ans + res;
  }
}
return ans;
";
        assert_eq!(text, expected);
    }

    #[test]
    fn else_branch_shares_closing_brace_line() {
        let text = render(vec![
            Stmt::If {
                cond: Expr::var("a").field("count"),
                then: vec![Stmt::assign(Expr::var("b"), Expr::int(1))],
                otherwise: vec![Stmt::assign(Expr::var("b"), Expr::int(0))],
            },
            Stmt::Return(Expr::var("b")),
        ])
        .unwrap();

        assert_eq!(text, "if (a.count) {\n  b = 1;\n} else {\n  b = 0;\n}\nreturn b;\n");
    }

    #[test]
    fn nested_binaries_are_parenthesised() {
        let cond = Expr::var("cnt")
            .greater_than(Expr::int(0))
            .and(Expr::var("offset").less_than(Expr::var("count")));
        let text = render(vec![Stmt::Return(cond)]).unwrap();
        assert_eq!(text, "return (cnt > 0) && (offset < count);\n");
    }

    #[test]
    fn strings_are_escaped_as_json() {
        let text = render(vec![Stmt::Return(Expr::literal("say \"hi\"\n"))]).unwrap();
        assert_eq!(text, "return \"say \\\"hi\\\"\\n\";\n");
    }

    #[test]
    fn rejects_bad_names() {
        let err = render(vec![Stmt::let_("1abc", Expr::int(1)), Stmt::Return(Expr::int(1))]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidIdentifier(_)));

        let err = render(vec![Stmt::Return(Expr::api("users.get); API.wall.post", vec![]))]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidMethod(_)));

        let err = render(vec![Stmt::Return(Expr::Object(vec![("a-b".into(), Expr::int(1))]))]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidIdentifier(_)));
    }

    #[test]
    fn requires_trailing_return() {
        let err = render(vec![Stmt::let_("a", Expr::int(1))]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidPlan(_)));
    }
}
