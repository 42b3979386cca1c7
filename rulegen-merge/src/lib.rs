//! Merge engine for build files.
//!
//! A freshly generated file is authoritative for everything the generator computes; the file
//! already on disk is authoritative for hand edits. Rules pair up by `(kind, name)`:
//! - matched rules take the generated attribute values, except that list elements, attributes and
//!   whole rules marked `# keep` survive, and attributes the generator never computes are carried
//!   over;
//! - existing rules without a match stay where they are, generated rules without one are appended;
//! - rules of kinds the generator does not manage are never touched.
//!
//! The `load` of the Go rules module is recomputed from the merged rule kinds. Merging the output
//! again with the same generated file changes nothing.

use rulegen_domain::{compose_load, load_stmt};
use rulegen_syntax::{
    Arg, BinaryOp, Call, Comments, Dict, DictEntry, Expr, File, List, ListItem, Stmt, StmtKind,
};
use rulegen_types::attrs;
use rulegen_types::kinds::{self, DEFAULT_CONDITION, RULES_MODULE};
use std::collections::BTreeSet;
use tracing::{debug, warn};

type RuleKey = (String, String);

/// Merges `generated` into the previous file text, if there is one.
///
/// A previous file that does not parse is ignored with a warning and the generated file is
/// returned as is.
pub fn merge_with_existing(generated: File, existing_src: Option<&str>) -> File {
    let Some(src) = existing_src else {
        return generated;
    };
    match rulegen_syntax::parse(src) {
        Ok(existing) => merge_files(&generated, &existing),
        Err(err) => {
            warn!(error = %err, "existing build file does not parse; replacing it with generated rules");
            generated
        }
    }
}

/// Merges a generated file into an existing one.
pub fn merge_files(generated: &File, existing: &File) -> File {
    if let Some((_, guard)) = existing
        .rule_calls()
        .find(|(_, c)| kinds::is_file_guard_kind(&c.func))
    {
        debug!(kind = %guard.func, "existing file declares a guarded kind; leaving it untouched");
        return existing.clone();
    }

    // Only the first generated rule per key takes part.
    let mut fresh: Vec<(RuleKey, usize)> = Vec::new();
    for (i, call) in generated.rule_calls() {
        let key = rule_key(call);
        if !fresh.iter().any(|(k, _)| *k == key) {
            fresh.push((key, i));
        }
    }
    let unmanaged_names: BTreeSet<&str> = existing
        .rule_calls()
        .filter(|(_, c)| !kinds::is_managed_kind(&c.func))
        .filter_map(|(_, c)| c.name())
        .collect();

    let mut out = File {
        stmts: Vec::with_capacity(existing.stmts.len() + fresh.len()),
        trailing: existing.trailing.clone(),
    };
    let mut paired: BTreeSet<RuleKey> = BTreeSet::new();
    let mut dropped_load: Option<(usize, Comments)> = None;

    for stmt in &existing.stmts {
        let Some(call) = stmt.call() else {
            out.stmts.push(stmt.clone());
            continue;
        };
        if call.is_load() {
            if load_module(call) == Some(RULES_MODULE) {
                if dropped_load.is_none() {
                    dropped_load = Some((out.stmts.len(), stmt.comments.clone()));
                }
            } else {
                out.stmts.push(stmt.clone());
            }
            continue;
        }
        if !kinds::is_managed_kind(&call.func) {
            out.stmts.push(stmt.clone());
            continue;
        }

        let key = rule_key(call);
        if !paired.insert(key.clone()) {
            // Later duplicates of a key stay as written.
            out.stmts.push(stmt.clone());
            continue;
        }
        let matched = fresh
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, i)| generated.stmts[*i].call());
        match matched {
            Some(new) if !stmt.comments.has_keep() => out.stmts.push(Stmt {
                comments: stmt.comments.clone(),
                kind: StmtKind::Expr(Expr::Call(merge_call(new, call))),
            }),
            _ => out.stmts.push(stmt.clone()),
        }
    }

    for (key, i) in &fresh {
        if paired.contains(key) {
            continue;
        }
        if unmanaged_names.contains(key.1.as_str()) {
            debug!(kind = %key.0, name = %key.1, "name is taken by an unmanaged rule; not inserting");
            continue;
        }
        out.stmts.push(generated.stmts[*i].clone());
    }

    let load = compose_load(out.rule_calls().map(|(_, c)| c.func.as_str()));
    let (at, comments) = dropped_load.unwrap_or_default();
    match load {
        Some(load) => {
            let mut stmt = load_stmt(&load);
            stmt.comments = comments;
            out.stmts.insert(at, stmt);
        }
        // Comments above the dropped load move to whatever now follows it.
        None => {
            let mut before = comments.before;
            let slot = match out.stmts.get_mut(at) {
                Some(next) => &mut next.comments.before,
                None => &mut out.trailing,
            };
            before.append(slot);
            *slot = before;
        }
    }
    out
}

fn rule_key(call: &Call) -> RuleKey {
    let name = call.name().unwrap_or(&call.func);
    (call.func.clone(), name.to_string())
}

fn load_module(call: &Call) -> Option<&str> {
    call.positional().next().and_then(|a| a.value.as_str())
}

fn merge_call(new: &Call, old: &Call) -> Call {
    let mut args: Vec<Arg> = new.positional().cloned().collect();
    if args.is_empty() {
        args.extend(old.positional().cloned());
    }

    let mut names: Vec<&str> = Vec::new();
    for name in old.args.iter().chain(&new.args).filter_map(|a| a.name.as_deref()) {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut kwargs: Vec<Arg> = Vec::with_capacity(names.len());
    for name in names {
        match (old.kwarg(name), new.kwarg(name)) {
            (Some(old_arg), _) if old_arg.comments.has_keep() => kwargs.push(old_arg.clone()),
            (Some(old_arg), Some(new_arg)) => kwargs.push(Arg {
                comments: old_arg.comments.clone(),
                name: new_arg.name.clone(),
                value: merge_value(&new_arg.value, &old_arg.value),
            }),
            (None, Some(new_arg)) => kwargs.push(new_arg.clone()),
            (Some(old_arg), None) if attrs::is_generated(name) => {
                let kept = kept_items(&old_arg.value);
                if !kept.is_empty() {
                    kwargs.push(Arg {
                        comments: old_arg.comments.clone(),
                        name: old_arg.name.clone(),
                        value: with_kept(Expr::List(List::default()), kept),
                    });
                }
            }
            (Some(old_arg), None) => kwargs.push(old_arg.clone()),
            (None, None) => {}
        }
    }
    kwargs.sort_by(|a, b| {
        attrs::compare(
            a.name.as_deref().unwrap_or_default(),
            b.name.as_deref().unwrap_or_default(),
        )
    });
    args.extend(kwargs);

    Call {
        receiver: old.receiver.clone(),
        func: old.func.clone(),
        args,
        trailing: old.trailing.clone(),
    }
}

/// The new value, plus the `# keep` elements of the old one.
fn merge_value(new: &Expr, old: &Expr) -> Expr {
    let kept = kept_items(old);
    if kept.is_empty() {
        return new.clone();
    }
    with_kept(new.clone(), kept)
}

/// Keep-marked elements of a list-valued attribute.
#[derive(Debug, Default)]
struct Kept {
    /// Elements of plain lists.
    plain: Vec<ListItem>,
    /// Elements of `select` branches, by branch key.
    branches: Vec<(Expr, Vec<ListItem>)>,
}

impl Kept {
    fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.branches.is_empty()
    }

    fn branch(&mut self, key: &Expr) -> &mut Vec<ListItem> {
        let at = match self.branches.iter().position(|(k, _)| k == key) {
            Some(at) => at,
            None => {
                self.branches.push((key.clone(), Vec::new()));
                self.branches.len() - 1
            }
        };
        &mut self.branches[at].1
    }
}

/// Keep-marked elements of the lists and `select` branches in `expr`, in order.
fn kept_items(expr: &Expr) -> Kept {
    let mut kept = Kept::default();
    collect_kept(expr, &mut kept);
    kept
}

fn collect_kept(expr: &Expr, kept: &mut Kept) {
    if let Some(select) = expr.as_select() {
        for entry in &select.entries {
            let items = marked(&entry.value);
            if !items.is_empty() {
                kept.branch(&entry.key).extend(items);
            }
        }
        return;
    }
    match expr {
        Expr::List(_) => kept.plain.extend(marked(expr)),
        Expr::Binary(lhs, BinaryOp::Add, rhs) => {
            collect_kept(lhs, kept);
            collect_kept(rhs, kept);
        }
        _ => {}
    }
}

fn marked(expr: &Expr) -> Vec<ListItem> {
    match expr {
        Expr::List(list) => list
            .items
            .iter()
            .filter(|item| item.comments.has_keep())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Puts `kept` back into `expr`: plain elements into its leading list and branch elements into
/// the matching branch of its `select`, adding the list, the branch or the select as needed.
fn with_kept(expr: Expr, kept: Kept) -> Expr {
    let Kept { plain, branches } = kept;
    let mut expr = if plain.is_empty() {
        expr
    } else {
        with_plain(expr, plain)
    };
    for (key, items) in branches {
        expr = with_branch(expr, key, items);
    }
    expr
}

/// Replaces elements equal to a kept one, then appends the kept elements.
fn extend_list(list: &mut List, kept: Vec<ListItem>) {
    list.items
        .retain(|item| !kept.iter().any(|k| k.value == item.value));
    list.items.extend(kept);
}

fn with_plain(expr: Expr, kept: Vec<ListItem>) -> Expr {
    match expr {
        Expr::List(mut list) => {
            extend_list(&mut list, kept);
            Expr::List(list)
        }
        Expr::Binary(lhs, BinaryOp::Add, rhs) => Expr::add(with_plain(*lhs, kept), *rhs),
        other => Expr::add(
            Expr::List(List {
                items: kept,
                trailing: Vec::new(),
            }),
            other,
        ),
    }
}

fn with_branch(mut expr: Expr, key: Expr, kept: Vec<ListItem>) -> Expr {
    if let Some(select) = find_select(&mut expr) {
        match select.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => match &mut entry.value {
                Expr::List(list) => extend_list(list, kept),
                value => {
                    let current = std::mem::replace(value, Expr::List(List::default()));
                    *value = with_plain(current, kept);
                }
            },
            None => {
                let at = select
                    .entries
                    .iter()
                    .position(|e| e.key.as_str() == Some(DEFAULT_CONDITION))
                    .unwrap_or(select.entries.len());
                select.entries.insert(at, branch(key, kept));
            }
        }
        return expr;
    }

    let mut dict = Dict::default();
    dict.entries.push(branch(key, kept));
    if !dict.entries.iter().any(|e| e.key.as_str() == Some(DEFAULT_CONDITION)) {
        dict.entries
            .push(branch(Expr::string(DEFAULT_CONDITION), Vec::new()));
    }
    let mut call = Call::new("select");
    call.args.push(Arg::positional(Expr::Dict(dict)));
    match expr {
        Expr::List(list) if list.items.is_empty() && list.trailing.is_empty() => Expr::Call(call),
        other => Expr::add(other, Expr::Call(call)),
    }
}

fn branch(key: Expr, items: Vec<ListItem>) -> DictEntry {
    DictEntry {
        comments: Comments::default(),
        key,
        value: Expr::List(List {
            items,
            trailing: Vec::new(),
        }),
    }
}

/// The `select` dict of `expr`, alone or inside a `+` chain.
fn find_select(expr: &mut Expr) -> Option<&mut Dict> {
    if expr.as_select().is_some() {
        return expr.as_select_mut();
    }
    match expr {
        Expr::Binary(lhs, BinaryOp::Add, rhs) => {
            if contains_select(lhs) {
                find_select(lhs)
            } else {
                find_select(rhs)
            }
        }
        _ => None,
    }
}

fn contains_select(expr: &Expr) -> bool {
    match expr {
        Expr::Binary(lhs, BinaryOp::Add, rhs) => contains_select(lhs) || contains_select(rhs),
        other => other.as_select().is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rulegen_syntax::{parse, print};

    fn merge(existing: &str, generated: &str) -> String {
        let merged = merge_files(&parse(generated).unwrap(), &parse(existing).unwrap());
        print(&merged)
    }

    #[test]
    fn keep_survives_select() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    deps = [
        "//extra:go_default_library",  # keep
        "//old:go_default_library",
    ],
)
"#,
            r#"go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["//x:go_default_library"],
        "//conditions:default": [],
    }),
)
"#,
        );
        assert_eq!(
            out,
            r#"load("@io_bazel_rules_go//go:def.bzl", "go_library")

go_library(
    name = "go_default_library",
    deps = [
        "//extra:go_default_library",  # keep
    ] + select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["//x:go_default_library"],
        "//conditions:default": [],
    }),
)
"#
        );
    }

    #[test]
    fn keep_in_select_branch_returns_to_its_branch() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": [
            "//hand:go_default_library",  # keep
            "//old:go_default_library",
        ],
        "//conditions:default": [],
    }),
)
"#,
            r#"go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["//x:go_default_library"],
        "//conditions:default": [],
    }),
)
"#,
        );
        assert_eq!(
            out,
            r#"load("@io_bazel_rules_go//go:def.bzl", "go_library")

go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": [
            "//x:go_default_library",
            "//hand:go_default_library",  # keep
        ],
        "//conditions:default": [],
    }),
)
"#
        );
    }

    #[test]
    fn keep_in_missing_branch_adds_the_branch() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:darwin_amd64": [
            "//mac:go_default_library",  # keep
        ],
        "//conditions:default": [],
    }),
)
"#,
            r#"go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["//x:go_default_library"],
        "//conditions:default": [],
    }),
)
"#,
        );
        assert_eq!(
            out,
            r#"load("@io_bazel_rules_go//go:def.bzl", "go_library")

go_library(
    name = "go_default_library",
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["//x:go_default_library"],
        "@io_bazel_rules_go//go/platform:darwin_amd64": [
            "//mac:go_default_library",  # keep
        ],
        "//conditions:default": [],
    }),
)
"#
        );
    }

    #[test]
    fn keep_in_select_survives_attribute_removal() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    srcs = ["a.go"],
    deps = ["//old:go_default_library"] + select({
        "@io_bazel_rules_go//go/platform:linux_amd64": [
            "//hand:go_default_library",  # keep
        ],
        "//conditions:default": [],
    }),
)
"#,
            r#"go_library(
    name = "go_default_library",
    srcs = ["a.go"],
)
"#,
        );
        assert!(out.contains(
            "    deps = select({\n        \"@io_bazel_rules_go//go/platform:linux_amd64\": [\n            \"//hand:go_default_library\",  # keep\n        ],\n        \"//conditions:default\": [],\n    }),\n"
        ));
        assert!(!out.contains("//old:go_default_library"));
    }

    #[test]
    fn keep_survives_absent_generated_attribute() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    srcs = ["a.go"],
    deps = [
        "//extra:go_default_library",  # keep
        "//old:go_default_library",
    ],
)
"#,
            r#"go_library(
    name = "go_default_library",
    srcs = ["a.go"],
)
"#,
        );
        assert!(out.contains("\"//extra:go_default_library\",  # keep"));
        assert!(!out.contains("//old:go_default_library"));
    }

    #[test]
    fn stale_generated_attributes_are_dropped() {
        let out = merge(
            r#"go_test(
    name = "go_default_test",
    srcs = ["a_test.go"],
    library = ":go_default_library",
    tags = ["manual"],
)
"#,
            r#"go_test(
    name = "go_default_test",
    srcs = ["a_test.go"],
)
"#,
        );
        assert!(!out.contains("library"));
        assert!(out.contains("tags = [\"manual\"]"));
    }

    #[test]
    fn keep_on_attribute_and_rule() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    srcs = ["hand.go"],  # keep
    visibility = ["//visibility:public"],
)

go_test(
    name = "go_default_test",
    srcs = ["old_test.go"],
)  # keep
"#,
            r#"go_library(
    name = "go_default_library",
    srcs = ["gen.go"],
    visibility = ["//foo:__subpackages__"],
)

go_test(
    name = "go_default_test",
    srcs = ["new_test.go"],
)
"#,
        );
        assert_eq!(
            out,
            r#"load("@io_bazel_rules_go//go:def.bzl", "go_library", "go_test")

go_library(
    name = "go_default_library",
    srcs = ["hand.go"],  # keep
    visibility = ["//foo:__subpackages__"],
)

go_test(
    name = "go_default_test",
    srcs = ["old_test.go"],
)  # keep
"#
        );
    }

    #[test]
    fn unmanaged_rules_block_same_name() {
        let out = merge(
            r#"load("//tools:gen.bzl", "custom_gen")

custom_gen(
    name = "go_default_library",
    out = "gen.go",
)
"#,
            r#"load("@io_bazel_rules_go//go:def.bzl", "go_library")

go_library(
    name = "go_default_library",
    srcs = ["a.go"],
)
"#,
        );
        assert_eq!(
            out,
            r#"load("//tools:gen.bzl", "custom_gen")

custom_gen(
    name = "go_default_library",
    out = "gen.go",
)
"#
        );
    }

    #[test]
    fn header_comment_moves_with_the_load() {
        let out = merge(
            "# Generated by hand, then by tools.\nload(\"@io_bazel_rules_go//go:def.bzl\", \"go_binary\")\n\ngo_binary(name = \"old\")\n",
            "go_library(name = \"go_default_library\")\n",
        );
        assert_eq!(
            out,
            r#"# Generated by hand, then by tools.
load("@io_bazel_rules_go//go:def.bzl", "go_binary", "go_library")

go_binary(
    name = "old",
)

go_library(
    name = "go_default_library",
)
"#
        );
    }

    #[test]
    fn header_comment_survives_when_no_load_is_needed() {
        let out = merge(
            "# header\nload(\"@io_bazel_rules_go//go:def.bzl\", \"go_library\")\n\nfilegroup(name = \"x\")\n",
            "filegroup(name = \"x\", srcs = [\"a.proto\"])\n",
        );
        assert_eq!(
            out,
            "# header\nfilegroup(\n    name = \"x\",\n    srcs = [\"a.proto\"],\n)\n"
        );
    }

    #[test]
    fn first_duplicate_wins() {
        let out = merge(
            r#"go_library(
    name = "go_default_library",
    srcs = ["one.go"],
)

go_library(
    name = "go_default_library",
    srcs = ["two.go"],
)
"#,
            r#"go_library(
    name = "go_default_library",
    srcs = ["new.go"],
)
"#,
        );
        assert!(out.contains("\"new.go\""));
        assert!(!out.contains("\"one.go\""));
        assert!(out.contains("\"two.go\""));
    }

    #[test]
    fn unparsable_existing_file_falls_back_to_generation() {
        let generated = parse("go_library(name = \"go_default_library\")\n").unwrap();
        let merged = merge_with_existing(generated.clone(), Some("go_library(name = "));
        assert_eq!(merged, generated);
        assert_eq!(merge_with_existing(generated.clone(), None), generated);
    }

    #[test]
    fn go_prefix_positional_is_refreshed() {
        let out = merge(
            "go_prefix(\"old.example/repo\")\n",
            "go_prefix(\"example.com/repo\")\n",
        );
        assert_eq!(
            out,
            "load(\"@io_bazel_rules_go//go:def.bzl\", \"go_prefix\")\n\ngo_prefix(\"example.com/repo\")\n"
        );
    }
}
