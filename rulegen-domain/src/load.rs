use rulegen_syntax::{Arg, Call, Expr, Stmt};
use rulegen_types::kinds::{LOADABLE_KINDS, RULES_MODULE};

/// A `load` of the Go rules module naming the kinds a file uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Load {
    pub module: String,
    /// Loadable kinds in catalog order.
    pub kinds: Vec<String>,
}

/// Computes the load statement for a file declaring rules of `kinds`.
///
/// Kinds outside the loadable catalog (built-ins such as `filegroup`, or third-party rules) are
/// ignored. Returns `None` when nothing needs loading.
pub fn compose_load<'a, I>(kinds: I) -> Option<Load>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = kinds.into_iter().collect();
    let kinds: Vec<String> = LOADABLE_KINDS
        .iter()
        .filter(|k| present.contains(*k))
        .map(|k| k.to_string())
        .collect();
    if kinds.is_empty() {
        return None;
    }
    Some(Load {
        module: RULES_MODULE.to_string(),
        kinds,
    })
}

/// Renders `load("<module>", "<kind>", ...)`.
pub fn load_stmt(load: &Load) -> Stmt {
    let mut call = Call::new("load");
    call.args.push(Arg::positional(Expr::string(&load.module)));
    call.args.extend(
        load.kinds
            .iter()
            .map(|k| Arg::positional(Expr::string(k))),
    );
    Stmt::expr(Expr::Call(call))
}
