//! Golden output for generated build files, plus ordering properties of the assembler.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rulegen_domain::Generator;
use rulegen_types::{GeneratorConfig, Package, PlatformStrings, ResolverMode, Target};
use std::collections::BTreeSet;

fn generator(mode: ResolverMode) -> Generator {
    Generator::new(GeneratorConfig {
        go_prefix: "example.com/repo".to_string(),
        mode,
        project_dirs: vec![Utf8PathBuf::from("sub1"), Utf8PathBuf::from("sub1/nested")],
        ..GeneratorConfig::default()
    })
    .expect("valid config")
}

fn target(srcs: &[&str], imports: &[&str]) -> Target {
    Target {
        srcs: PlatformStrings::generic(srcs.iter().copied()),
        imports: PlatformStrings::generic(imports.iter().copied()),
        ..Target::default()
    }
}

#[test]
fn library_with_tests_and_platform_deps() {
    let pkg = Package {
        dir: Utf8PathBuf::from("repo/lex"),
        rel: "lex".to_string(),
        library: Target {
            srcs: PlatformStrings::generic(["lex.go", "print.go"])
                .with_platform("linux_amd64", ["lex_linux.go"]),
            imports: PlatformStrings::generic(["example.com/repo/token", "github.com/pkg/errors"])
                .with_platform("linux_amd64", ["golang.org/x/sys/unix"]),
            ..Target::default()
        },
        test: target(&["lex_test.go"], &["example.com/repo/token"]),
        has_testdata: true,
        ..Package::default()
    };
    let file = generator(ResolverMode::Vendored).generate_file(&pkg);
    assert_eq!(
        rulegen_syntax::print(&file),
        r#"load("@io_bazel_rules_go//go:def.bzl", "go_library", "go_test")

go_library(
    name = "go_default_library",
    srcs = [
        "lex.go",
        "print.go",
    ] + select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["lex_linux.go"],
        "//conditions:default": [],
    }),
    visibility = ["//visibility:public"],
    deps = [
        "//token:go_default_library",
        "//vendor/github.com/pkg/errors:go_default_library",
    ] + select({
        "@io_bazel_rules_go//go/platform:linux_amd64": ["//vendor/golang.org/x/sys/unix:go_default_library"],
        "//conditions:default": [],
    }),
)

go_test(
    name = "go_default_test",
    srcs = ["lex_test.go"],
    data = glob(["testdata/**"]),
    library = ":go_default_library",
    deps = ["//token:go_default_library"],
)
"#
    );
}

#[test]
fn root_command_package() {
    let pkg = Package {
        dir: Utf8PathBuf::from("/work/repo"),
        library: target(&["main.go"], &["example.com/repo/internal/cli"]),
        is_command: true,
        ..Package::default()
    };
    let file = generator(ResolverMode::External).generate_file(&pkg);
    assert_eq!(
        rulegen_syntax::print(&file),
        r#"load("@io_bazel_rules_go//go:def.bzl", "go_binary", "go_library", "go_prefix")

go_prefix("example.com/repo")

go_library(
    name = "go_default_library",
    srcs = ["main.go"],
    visibility = ["//visibility:private"],
    deps = ["//internal/cli:go_default_library"],
)

go_binary(
    name = "repo",
    library = ":go_default_library",
    visibility = ["//visibility:public"],
)
"#
    );
}

#[test]
fn internal_package_visibility_narrows() {
    let pkg = Package {
        dir: Utf8PathBuf::from("repo/a/b/internal/c"),
        rel: "a/b/internal/c".to_string(),
        library: target(&["c.go"], &[]),
        ..Package::default()
    };
    let rules = generator(ResolverMode::Vendored).generate_rules(&pkg);
    assert_eq!(
        rules[0].attr("visibility"),
        Some(&rulegen_types::AttrValue::list(["//a/b:__subpackages__"]))
    );
}

#[test]
fn proto_only_filegroup_needs_no_load() {
    let pkg = Package {
        dir: Utf8PathBuf::from("repo/api"),
        rel: "api".to_string(),
        has_pb_go: true,
        protos: vec!["api.proto".to_string()],
        ..Package::default()
    };
    let file = generator(ResolverMode::Vendored).generate_file(&pkg);
    assert_eq!(
        rulegen_syntax::print(&file),
        r#"filegroup(
    name = "go_default_library_protos",
    srcs = ["api.proto"],
    visibility = ["//visibility:public"],
)
"#
    );
}

#[test]
fn workspace_mode_roots_deps_at_nearest_project() {
    let pkg = Package {
        dir: Utf8PathBuf::from("repo/sub1/nested/pkg"),
        rel: "sub1/nested/pkg".to_string(),
        library: target(&["pkg.go"], &["golang.org/x/net", "example.com/repo/sub"]),
        ..Package::default()
    };
    let rules = generator(ResolverMode::Workspace).generate_rules(&pkg);
    assert_eq!(
        rules[0].attr("deps"),
        Some(&rulegen_types::AttrValue::Platform(PlatformStrings::generic([
            "//sub1/nested/vendor/golang.org/x/net:go_default_library",
            "//sub:go_default_library",
        ])))
    );
}

#[test]
fn vendored_packages_share_one_build_file() {
    let errors = Package {
        rel: "vendor/github.com/pkg/errors".to_string(),
        library: target(&["errors.go", "stack.go"], &["golang.org/x/sys/unix"]),
        test: target(&["errors_test.go"], &[]),
        has_testdata: true,
        ..Package::default()
    };
    let sqlite = Package {
        rel: "vendor/github.com/mattn/sqlite".to_string(),
        cgo_library: Target {
            srcs: PlatformStrings::generic(["sqlite.go", "sqlite3.c"]),
            copts: PlatformStrings::generic(["-DSQLITE"]),
            ..Target::default()
        },
        library: target(&["doc.go"], &[]),
        ..Package::default()
    };
    let any = Package {
        rel: "vendor/github.com/golang/protobuf/ptypes/any".to_string(),
        library: target(&["any.pb.go"], &[]),
        protos: vec!["any.proto".to_string()],
        has_pb_go: true,
        ..Package::default()
    };
    let file = generator(ResolverMode::Vendored).generate_vendor("vendor", &[errors, sqlite, any]);
    assert_eq!(
        rulegen_syntax::print(&file),
        r#"load("@io_bazel_rules_go//go:def.bzl", "cgo_library", "go_library")

go_library(
    name = "github.com/pkg/errors",
    srcs = [
        "github.com/pkg/errors/errors.go",
        "github.com/pkg/errors/stack.go",
    ],
    visibility = ["//visibility:public"],
    deps = ["//vendor/golang.org/x/sys/unix:go_default_library"],
)

cgo_library(
    name = "github.com/mattn/sqlite_cgo_default_library",
    srcs = [
        "github.com/mattn/sqlite/sqlite.go",
        "github.com/mattn/sqlite/sqlite3.c",
    ],
    copts = ["-DSQLITE"],
    visibility = ["//visibility:private"],
)

go_library(
    name = "github.com/mattn/sqlite",
    srcs = ["github.com/mattn/sqlite/doc.go"],
    library = ":github.com/mattn/sqlite_cgo_default_library",
    visibility = ["//visibility:public"],
)

go_library(
    name = "github.com/golang/protobuf/ptypes/any",
    srcs = ["github.com/golang/protobuf/ptypes/any/any.pb.go"],
    visibility = ["//visibility:public"],
)

filegroup(
    name = "github.com/golang/protobuf/ptypes/any_go_default_library_protos",
    srcs = ["github.com/golang/protobuf/ptypes/any/any.proto"],
    visibility = ["//visibility:public"],
)
"#
    );
}

#[test]
fn vendor_file_for_proto_only_packages_has_no_load() {
    let api = Package {
        rel: "third_party/api".to_string(),
        protos: vec!["api.proto".to_string()],
        has_pb_go: true,
        ..Package::default()
    };
    let file = generator(ResolverMode::Vendored).generate_vendor("third_party", &[api]);
    assert_eq!(
        rulegen_syntax::print(&file),
        r#"filegroup(
    name = "api_go_default_library_protos",
    srcs = ["api/api.proto"],
    visibility = ["//visibility:public"],
)
"#
    );
}

fn arb_package() -> impl Strategy<Value = Package> {
    let names = || prop::collection::vec("[a-z]{1,6}\\.go", 0..3);
    (
        names(),
        names(),
        names(),
        names(),
        any::<bool>(),
        any::<bool>(),
        prop::collection::vec("[a-z]{1,4}", 0..3),
    )
        .prop_map(|(lib, cgo, test, xtest, is_command, has_pb_go, rel)| Package {
            dir: Utf8PathBuf::from("repo").join(rel.join("/")),
            rel: rel.join("/"),
            library: Target {
                srcs: PlatformStrings::generic(lib),
                ..Target::default()
            },
            cgo_library: Target {
                srcs: PlatformStrings::generic(cgo),
                ..Target::default()
            },
            test: Target {
                srcs: PlatformStrings::generic(test),
                ..Target::default()
            },
            xtest: Target {
                srcs: PlatformStrings::generic(xtest),
                ..Target::default()
            },
            is_command,
            has_pb_go,
            protos: vec!["x.proto".to_string()],
            ..Package::default()
        })
}

proptest! {
    #[test]
    fn kind_name_pairs_are_unique(pkg in arb_package()) {
        let rules = generator(ResolverMode::Vendored).generate_rules(&pkg);
        let keys: BTreeSet<(String, String)> = rules
            .iter()
            .map(|r| (r.kind.clone(), r.name().to_string()))
            .collect();
        prop_assert_eq!(keys.len(), rules.len());
    }

    #[test]
    fn name_first_and_attrs_in_priority_order(pkg in arb_package()) {
        for rule in generator(ResolverMode::Vendored).generate_rules(&pkg) {
            if let Some((first, _)) = rule.attrs.first() {
                prop_assert_eq!(first.as_str(), "name");
            }
            for pair in rule.attrs.windows(2) {
                prop_assert!(
                    rulegen_types::attrs::compare(&pair[0].0, &pair[1].0).is_lt()
                );
            }
        }
    }

    #[test]
    fn generation_is_deterministic(pkg in arb_package()) {
        let g = generator(ResolverMode::Vendored);
        let a = rulegen_syntax::print(&g.generate_file(&pkg));
        let b = rulegen_syntax::print(&g.generate_file(&pkg));
        prop_assert_eq!(a, b);
    }
}
