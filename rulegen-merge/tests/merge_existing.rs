//! End-to-end merge fixtures and the idempotence / preservation properties.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rulegen_merge::{merge_files, merge_with_existing};
use rulegen_syntax::{
    Arg, Call, Comments, Dict, DictEntry, Expr, File, List, ListItem, Stmt, parse, print,
};

const OLD_DATA: &str = r#"
load("@io_bazel_rules_go//go:def.bzl", "go_library", "go_test", "go_binary")

go_library(
    name = "go_default_library",
    srcs = glob(["*.go"]),
)

go_test(
    name = "go_default_test",
    size = "small",
    srcs = [
        "gen_test.go",  # keep
        "parse_test.go",
    ],
    data = glob(["testdata/*"]),
    library = ":go_default_library",
)
"#;

const NEW_DATA: &str = r#"
load("@io_bazel_rules_go//go:def.bzl", "go_test", "go_library")

go_library(
    name = "go_default_library",
    srcs = [
        "lex.go",
        "print.go",
    ],
)

go_test(
    name = "go_default_test",
    srcs = [
        "parse_test.go",
        "print_test.go",
    ],
    library = ":go_default_library",
)
"#;

const EXPECTED: &str = r#"load("@io_bazel_rules_go//go:def.bzl", "go_library", "go_test")

go_library(
    name = "go_default_library",
    srcs = [
        "lex.go",
        "print.go",
    ],
)

go_test(
    name = "go_default_test",
    size = "small",
    srcs = [
        "parse_test.go",
        "print_test.go",
        "gen_test.go",  # keep
    ],
    data = glob(["testdata/*"]),
    library = ":go_default_library",
)
"#;

const IGNORE_PROTO: &str = r#"
load("@io_bazel_rules_go//proto:go_proto_library.bzl", "go_proto_library")

go_proto_library(
    name = "go_default_library",
    srcs = ["foo.proto"],
    deps = ["@com_github_golang_protobuf//ptypes/any:go_default_library"],
)
"#;

const PB_GO_GEN: &str = r#"
load("@io_bazel_rules_go//go:def.bzl", "go_library")

go_library(
    name = "go_default_library",
    srcs = ["foo.pb.go"],
)

filegroup(
    name = "go_default_library_protos",
    srcs = ["foo.proto"],
)
"#;

fn merge_text(previous: &str, generated: &str) -> String {
    let generated = parse(generated).expect("generated file parses");
    print(&merge_with_existing(generated, Some(previous)))
}

#[test]
fn updates_srcs_and_keeps_hand_edits() {
    assert_eq!(merge_text(OLD_DATA, NEW_DATA), EXPECTED);
}

#[test]
fn proto_library_file_is_left_alone() {
    assert_eq!(merge_text(IGNORE_PROTO, PB_GO_GEN), &IGNORE_PROTO[1..]);
}

#[test]
fn merging_twice_is_stable_on_fixture() {
    let once = merge_text(OLD_DATA, NEW_DATA);
    assert_eq!(merge_text(&once, NEW_DATA), once);
}

#[test]
fn missing_previous_file_is_pure_generation() {
    let generated = parse(NEW_DATA).unwrap();
    assert_eq!(merge_with_existing(generated.clone(), None), generated);
}

#[test]
fn stale_load_entries_do_not_survive() {
    let out = merge_text(OLD_DATA, NEW_DATA);
    assert!(!out.contains("go_binary"));
}

const SELECT_KEEP_OLD: &str = r#"
go_library(
    name = "go_default_library",
    srcs = ["a.go"],
    deps = select({
        "@io_bazel_rules_go//go/platform:linux_amd64": [
            "//hand:go_default_library",  # keep
            "//old:go_default_library",
        ],
        "//conditions:default": [],
    }),
)
"#;

const SELECT_KEEP_NEW: &str = r#"
go_library(
    name = "go_default_library",
    srcs = ["a.go"],
    deps = ["//new:go_default_library"],
)
"#;

const SELECT_KEEP_EXPECTED: &str = r#"load("@io_bazel_rules_go//go:def.bzl", "go_library")

go_library(
    name = "go_default_library",
    srcs = ["a.go"],
    deps = ["//new:go_default_library"] + select({
        "@io_bazel_rules_go//go/platform:linux_amd64": [
            "//hand:go_default_library",  # keep
        ],
        "//conditions:default": [],
    }),
)
"#;

#[test]
fn keep_inside_select_branch_survives_plain_generated_list() {
    let once = merge_text(SELECT_KEEP_OLD, SELECT_KEEP_NEW);
    assert_eq!(once, SELECT_KEEP_EXPECTED);
    assert_eq!(merge_text(&once, SELECT_KEEP_NEW), once);
}

const TEST_NEW: &str = r#"
go_test(
    name = "go_default_test",
    srcs = ["a_test.go"],
)
"#;

fn test_with_extra(extra: &str) -> String {
    format!(
        "go_test(\n    name = \"go_default_test\",\n    size = \"small\",\n    srcs = [\"old_test.go\"],\n{extra})\n"
    )
}

#[test]
fn hand_edits_survive_next_to_richer_expressions() {
    for extra in [
        "    tags = (\"manual\",),\n",
        "    shard_count = -1,\n",
        "    args = [\"--n=%d\" % 3],\n",
        "    env = dict(N = \"{}\".format(\"1\")),\n",
        "    data = [f for f in glob([\"testdata/*\"]) if not f.endswith(\".tmp\")],\n",
    ] {
        let out = merge_text(&test_with_extra(extra), TEST_NEW);
        assert!(out.contains("    size = \"small\",\n"), "lost size next to {extra}:\n{out}");
        assert!(out.contains(extra), "lost {extra}:\n{out}");
        assert!(out.contains("\"a_test.go\""), "not regenerated next to {extra}:\n{out}");
    }
}

#[test]
fn statements_outside_the_rule_model_are_kept() {
    let previous = r#"X = "{}-{}".format("a", 1)

def helper(name):
    native.filegroup(name = name)

go_test(
    name = "go_default_test",
    size = "small",
    srcs = ["old_test.go"],
)
"#;
    let out = merge_text(previous, TEST_NEW);
    assert!(out.starts_with("load(\"@io_bazel_rules_go//go:def.bzl\", \"go_test\")\n"));
    assert!(out.contains("X = \"{}-{}\".format(\"a\", 1)\n"));
    assert!(out.contains("def helper(name):\n    native.filegroup(name = name)\n"));
    assert!(out.contains("    size = \"small\",\n"));
    assert!(!out.contains("old_test.go"));
}

const KINDS: &[&str] = &["go_library", "go_test", "filegroup", "custom_gen"];
const NAMES: &[&str] = &["go_default_library", "go_default_test", "gen"];
const FILES: &[&str] = &["a.go", "b.go", "c.go", "d.go", "e.go"];

const PLATFORMS: &[&str] = &[
    "@io_bazel_rules_go//go/platform:darwin_amd64",
    "@io_bazel_rules_go//go/platform:linux_amd64",
    "//conditions:default",
];

/// A plain list, a `select` over distinct platforms, or the two joined with `+`.
fn arb_value(keep_weight: u32) -> impl Strategy<Value = Expr> {
    let select = prop::collection::vec(
        (prop::sample::select(PLATFORMS), arb_list(keep_weight)),
        1..4,
    )
    .prop_map(|branches| {
        let mut dict = Dict::default();
        for (key, value) in branches {
            let key = Expr::string(key);
            if dict.entries.iter().all(|e| e.key != key) {
                dict.entries.push(DictEntry {
                    comments: Comments::default(),
                    key,
                    value,
                });
            }
        }
        let mut call = Call::new("select");
        call.args.push(Arg::positional(Expr::Dict(dict)));
        Expr::Call(call)
    });
    prop_oneof![
        2 => arb_list(keep_weight),
        1 => select.clone(),
        1 => (arb_list(keep_weight), select).prop_map(|(list, select)| Expr::add(list, select)),
    ]
}

fn arb_list(keep_weight: u32) -> impl Strategy<Value = Expr> + Clone {
    prop::collection::vec(
        (
            prop::sample::select(FILES),
            prop::bool::weighted(f64::from(keep_weight) / 10.0),
        ),
        0..4,
    )
    .prop_map(|items| {
        Expr::List(List {
            items: items
                .into_iter()
                .map(|(f, keep)| ListItem {
                    comments: if keep {
                        Comments::keep()
                    } else {
                        Comments::default()
                    },
                    value: Expr::string(f),
                })
                .collect(),
            trailing: vec![],
        })
    })
}

fn arb_rule(keep_weight: u32) -> impl Strategy<Value = Stmt> {
    (
        prop::sample::select(KINDS),
        prop::sample::select(NAMES),
        prop::option::of(arb_value(keep_weight)),
        prop::option::of(arb_value(keep_weight)),
        prop::option::of(prop::sample::select(&["small", "large"][..])),
        prop::bool::weighted(f64::from(keep_weight) / 20.0),
        prop::bool::weighted(f64::from(keep_weight) / 20.0),
    )
        .prop_map(|(kind, name, srcs, deps, size, keep_srcs, keep_rule)| {
            let mut call = Call::new(kind);
            call.args.push(Arg::keyword("name", Expr::string(name)));
            if let Some(size) = size {
                call.args.push(Arg::keyword("size", Expr::string(size)));
            }
            if let Some(srcs) = srcs {
                let mut arg = Arg::keyword("srcs", srcs);
                if keep_srcs {
                    arg.comments = Comments::keep();
                }
                call.args.push(arg);
            }
            if let Some(deps) = deps {
                call.args.push(Arg::keyword("deps", deps));
            }
            Stmt {
                comments: if keep_rule {
                    Comments::keep()
                } else {
                    Comments::default()
                },
                kind: rulegen_syntax::StmtKind::Expr(Expr::Call(call)),
            }
        })
}

fn arb_file(keep_weight: u32) -> impl Strategy<Value = File> {
    prop::collection::vec(arb_rule(keep_weight), 0..5).prop_map(|stmts| {
        // Normalize through the printer so comparisons are on canonical text.
        let file = File {
            stmts,
            trailing: vec![],
        };
        parse(&print(&file)).expect("printer output parses")
    })
}

/// Generated files only carry managed kinds and no comments.
fn arb_generated() -> impl Strategy<Value = File> {
    arb_file(0).prop_map(|mut file| {
        file.stmts
            .retain(|s| s.call().is_some_and(|c| c.func != "custom_gen"));
        file
    })
}

fn keep_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| l.ends_with("# keep")).collect()
}

proptest! {
    #[test]
    fn merge_is_idempotent(existing in arb_file(3), generated in arb_generated()) {
        let once = merge_files(&generated, &existing);
        let once_text = print(&once);
        let reparsed = parse(&once_text).expect("merged output parses");
        let twice_text = print(&merge_files(&generated, &reparsed));
        prop_assert_eq!(twice_text, once_text);
    }

    #[test]
    fn keep_marked_elements_survive(existing in arb_file(4), generated in arb_generated()) {
        let merged = print(&merge_files(&generated, &existing));
        for line in keep_lines(&print(&existing)) {
            prop_assert!(
                merged.lines().any(|l| l == line),
                "lost `{}` in\n{}",
                line,
                merged
            );
        }
    }

    #[test]
    fn unmanaged_rules_are_untouched(existing in arb_file(2), generated in arb_generated()) {
        let merged = merge_files(&generated, &existing);
        let custom = |f: &File| -> Vec<String> {
            f.stmts
                .iter()
                .filter(|s| s.call().is_some_and(|c| c.func == "custom_gen"))
                .map(|s| print(&File { stmts: vec![s.clone()], trailing: vec![] }))
                .collect()
        };
        prop_assert_eq!(custom(&merged), custom(&existing));
    }

    #[test]
    fn load_names_exactly_the_loadable_kinds(
        existing in arb_file(2),
        generated in arb_generated(),
    ) {
        let merged = merge_files(&generated, &existing);
        let mut kinds: Vec<&str> = merged
            .rule_calls()
            .map(|(_, c)| c.func.as_str())
            .filter(|k| rulegen_types::kinds::is_loadable_kind(k))
            .collect();
        kinds.sort_unstable();
        kinds.dedup();

        let loads: Vec<&Call> = merged
            .calls()
            .filter(|(_, c)| c.is_load())
            .map(|(_, c)| c)
            .collect();
        if kinds.is_empty() {
            prop_assert!(loads.is_empty());
        } else {
            prop_assert_eq!(loads.len(), 1);
            let named: Vec<&str> = loads[0]
                .positional()
                .skip(1)
                .filter_map(|a| a.value.as_str())
                .collect();
            prop_assert_eq!(named, kinds);
        }
    }
}
