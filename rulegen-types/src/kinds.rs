//! Rule kind catalogs and conventional rule names.

/// Label of the Starlark file that provides the Go rules.
pub const RULES_MODULE: &str = "@io_bazel_rules_go//go:def.bzl";

/// Kinds that need an explicit `load` of [`RULES_MODULE`], in catalog order.
///
/// Keep sorted: `load` arguments are emitted in this order.
pub const LOADABLE_KINDS: &[&str] = &[
    "cgo_library",
    "go_binary",
    "go_library",
    "go_prefix",
    "go_test",
];

pub const FILEGROUP_KIND: &str = "filegroup";

/// Existing files declaring one of these kinds are owned by hand and never merged.
pub const FILE_GUARD_KINDS: &[&str] = &["go_proto_library"];

/// Name of the default `go_library` in a package directory.
pub const DEFAULT_LIB_NAME: &str = "go_default_library";
/// Internal test of [`DEFAULT_LIB_NAME`]. Only needs to be unique in the package.
pub const DEFAULT_TEST_NAME: &str = "go_default_test";
/// External test of [`DEFAULT_LIB_NAME`].
pub const DEFAULT_XTEST_NAME: &str = "go_default_xtest";
/// Filegroup of `.proto` sources next to checked-in `.pb.go` files.
pub const DEFAULT_PROTOS_NAME: &str = "go_default_library_protos";
pub const DEFAULT_CGO_LIB_NAME: &str = "cgo_default_library";

pub const PUBLIC_VISIBILITY: &str = "//visibility:public";
pub const PRIVATE_VISIBILITY: &str = "//visibility:private";

/// Prefix of the `config_setting` labels used as `select` keys.
pub const PLATFORM_PREFIX: &str = "@io_bazel_rules_go//go/platform:";
pub const DEFAULT_CONDITION: &str = "//conditions:default";

/// Kinds whose rules the generator creates and may rewrite.
pub fn is_managed_kind(kind: &str) -> bool {
    kind == FILEGROUP_KIND || LOADABLE_KINDS.contains(&kind)
}

pub fn is_loadable_kind(kind: &str) -> bool {
    LOADABLE_KINDS.contains(&kind)
}

pub fn is_file_guard_kind(kind: &str) -> bool {
    FILE_GUARD_KINDS.contains(&kind)
}
