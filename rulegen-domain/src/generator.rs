use crate::load::{compose_load, load_stmt};
use crate::resolve::Resolver;
use camino::Utf8PathBuf;
use rulegen_syntax::{Arg, Call, Dict, DictEntry, Expr, File, Stmt};
use rulegen_types::kinds::{
    DEFAULT_CGO_LIB_NAME, DEFAULT_CONDITION, DEFAULT_LIB_NAME, DEFAULT_PROTOS_NAME,
    DEFAULT_TEST_NAME, DEFAULT_XTEST_NAME, FILEGROUP_KIND, PLATFORM_PREFIX, PRIVATE_VISIBILITY,
    PUBLIC_VISIBILITY,
};
use rulegen_types::{
    AttrValue, ConfigError, GeneratorConfig, Package, PlatformStrings, Rule, Target,
};
use tracing::{debug, warn};

/// Builds the rules for one package. Immutable once built; share it between workers by
/// reference.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    resolver: Resolver,
}

/// Per-rule inputs to [`Generator::target_rule`].
struct TargetRule<'a> {
    kind: &'a str,
    name: String,
    visibility: Option<String>,
    library: Option<&'a str>,
    testdata: bool,
    target: &'a Target,
    /// Package path below the directory of a shared build file; empty for the package's own file.
    prefix: &'a str,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        if config.build_file_name.trim().is_empty() {
            return Err(ConfigError::EmptyBuildFileName);
        }
        let resolver = Resolver::new(&config)?;
        Ok(Self { config, resolver })
    }

    /// Path of the build file generated for `pkg`: `dir` (or `rel` when `dir` is empty) joined with
    /// the configured file name. Relative results are relative to the repository root.
    pub fn build_file_path(&self, pkg: &Package) -> Utf8PathBuf {
        let dir = if pkg.dir.as_str().is_empty() {
            Utf8PathBuf::from(&pkg.rel)
        } else {
            pkg.dir.clone()
        };
        dir.join(&self.config.build_file_name)
    }

    /// Rules for `pkg` in declaration order: prefix, cgo library, library, binary, proto
    /// filegroup, internal test, external test.
    pub fn generate_rules(&self, pkg: &Package) -> Vec<Rule> {
        let mut rules = Vec::new();
        if pkg.is_root() {
            rules.push(Rule::new("go_prefix").with_arg(&self.config.go_prefix));
        }

        let library = self.library_rules(pkg, "", &mut rules);
        let library = library.as_deref();

        if pkg.is_command && (pkg.binary.has_sources() || library.is_some()) {
            rules.push(self.target_rule(
                pkg,
                TargetRule {
                    kind: "go_binary",
                    name: self.binary_name(pkg),
                    visibility: Some(visibility(&pkg.rel)),
                    library,
                    testdata: false,
                    target: &pkg.binary,
                    prefix: "",
                },
            ));
        }

        rules.extend(proto_filegroup(pkg, ""));

        if pkg.test.has_sources() {
            rules.push(self.target_rule(
                pkg,
                TargetRule {
                    kind: "go_test",
                    name: test_name(library, DEFAULT_TEST_NAME, "_test"),
                    visibility: None,
                    library,
                    testdata: pkg.has_testdata,
                    target: &pkg.test,
                    prefix: "",
                },
            ));
        }

        if pkg.xtest.has_sources() {
            rules.push(self.target_rule(
                pkg,
                TargetRule {
                    kind: "go_test",
                    name: test_name(library, DEFAULT_XTEST_NAME, "_xtest"),
                    visibility: None,
                    library: None,
                    testdata: pkg.has_testdata,
                    target: &pkg.xtest,
                    prefix: "",
                },
            ));
        }

        for rule in &mut rules {
            rule.sort_attrs();
        }
        debug!(rel = %pkg.rel, rules = rules.len(), "generated rules");
        rules
    }

    /// A build file holding the load statement (if any) followed by every rule of `pkg`.
    pub fn generate_file(&self, pkg: &Package) -> File {
        file_of(&self.generate_rules(pkg))
    }

    /// One build file, in the directory at `bf_rel`, for all the vendored packages below it.
    ///
    /// Each package contributes its cgo library, library and proto filegroup; binaries and tests
    /// are not generated. Rules are named after the package path below `bf_rel` and their
    /// sources, protos and testdata are prefixed with it, so `vendor/github.com/a/b` gets a
    /// `go_library` named `github.com/a/b` in `vendor/BUILD.bazel`. A package that is not below
    /// `bf_rel` keeps the default names and unprefixed paths.
    pub fn generate_vendor(&self, bf_rel: &str, packages: &[Package]) -> File {
        let mut rules = Vec::new();
        for pkg in packages {
            let prefix = rel_below(bf_rel, &pkg.rel);
            self.library_rules(pkg, prefix, &mut rules);
            rules.extend(proto_filegroup(pkg, prefix));
        }
        for rule in &mut rules {
            rule.sort_attrs();
        }
        debug!(bf_rel, packages = packages.len(), rules = rules.len(), "generated vendor rules");
        file_of(&rules)
    }

    /// Pushes the cgo library and library of `pkg`; returns the library name.
    fn library_rules(&self, pkg: &Package, prefix: &str, rules: &mut Vec<Rule>) -> Option<String> {
        let cgo_library = pkg
            .cgo_library
            .has_sources()
            .then(|| prefixed_name(prefix, DEFAULT_CGO_LIB_NAME));
        if let Some(name) = &cgo_library {
            rules.push(self.target_rule(
                pkg,
                TargetRule {
                    kind: "cgo_library",
                    name: name.clone(),
                    visibility: Some(PRIVATE_VISIBILITY.to_string()),
                    library: None,
                    testdata: false,
                    target: &pkg.cgo_library,
                    prefix,
                },
            ));
        }

        if !pkg.library.has_sources() && cgo_library.is_none() {
            return None;
        }
        let name = if prefix.is_empty() {
            DEFAULT_LIB_NAME.to_string()
        } else {
            prefix.to_string()
        };
        // A library that only backs a binary stays private.
        let visibility = if pkg.is_command {
            PRIVATE_VISIBILITY.to_string()
        } else {
            visibility(&pkg.rel)
        };
        rules.push(self.target_rule(
            pkg,
            TargetRule {
                kind: "go_library",
                name: name.clone(),
                visibility: Some(visibility),
                library: cgo_library.as_deref(),
                testdata: false,
                target: &pkg.library,
                prefix,
            },
        ));
        Some(name)
    }

    fn target_rule(&self, pkg: &Package, input: TargetRule<'_>) -> Rule {
        let target = input.target;
        let mut rule = Rule::new(input.kind).with("name", AttrValue::Str(input.name));
        if !target.srcs.is_empty() {
            rule.set("srcs", AttrValue::Platform(prefixed(&target.srcs, input.prefix)));
        }
        if !target.clinkopts.is_empty() {
            rule.set("clinkopts", AttrValue::Platform(target.clinkopts.clone()));
        }
        if !target.copts.is_empty() {
            rule.set("copts", AttrValue::Platform(target.copts.clone()));
        }
        if input.testdata {
            rule.set(
                "data",
                AttrValue::Glob(vec![prefixed_path(input.prefix, "testdata/**")]),
            );
        }
        if let Some(library) = input.library {
            rule.set("library", AttrValue::str(format!(":{library}")));
        }
        if let Some(visibility) = input.visibility {
            rule.set("visibility", AttrValue::list([visibility]));
        }
        if !target.imports.is_empty() {
            rule.set(
                "deps",
                AttrValue::Platform(self.dependencies(&target.imports, &pkg.rel)),
            );
        }
        rule
    }

    /// Resolves `imports`; unresolvable imports are logged and left out.
    fn dependencies(&self, imports: &PlatformStrings, rel: &str) -> PlatformStrings {
        let (mut deps, errors) = imports.map(|imp| {
            self.resolver
                .resolve(imp, rel)
                .map(|label| label.to_string())
        });
        for err in errors {
            warn!(
                importpath = %err.importpath,
                dir = %err.dir,
                reason = %err.kind,
                "dropping dependency: {err}"
            );
        }
        deps.clean();
        deps
    }

    fn binary_name(&self, pkg: &Package) -> String {
        let last = |s: &str| {
            s.rsplit('/')
                .find(|seg| !seg.is_empty())
                .map(str::to_string)
        };
        pkg.dir
            .file_name()
            .map(str::to_string)
            .or_else(|| last(&pkg.rel))
            .or_else(|| last(&self.config.go_prefix))
            .unwrap_or_else(|| "main".to_string())
    }
}

fn file_of(rules: &[Rule]) -> File {
    let mut file = File::default();
    if let Some(load) = compose_load(rules.iter().map(|r| r.kind.as_str())) {
        file.stmts.push(load_stmt(&load));
    }
    file.stmts
        .extend(rules.iter().map(|r| Stmt::expr(Expr::Call(rule_call(r)))));
    file
}

/// Filegroup of the `.proto` sources next to checked-in generated code.
fn proto_filegroup(pkg: &Package, prefix: &str) -> Option<Rule> {
    if !pkg.has_pb_go || pkg.protos.is_empty() {
        return None;
    }
    Some(
        Rule::new(FILEGROUP_KIND)
            .with("name", AttrValue::str(prefixed_name(prefix, DEFAULT_PROTOS_NAME)))
            .with(
                "srcs",
                AttrValue::list(pkg.protos.iter().map(|p| prefixed_path(prefix, p))),
            )
            .with("visibility", AttrValue::list([PUBLIC_VISIBILITY])),
    )
}

/// `rel` relative to `base`, or empty when it is not strictly below it.
fn rel_below<'a>(base: &str, rel: &'a str) -> &'a str {
    let base = base.trim_matches('/');
    let rel = rel.trim_matches('/');
    if base.is_empty() {
        return rel;
    }
    rel.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or_default()
}

fn prefixed_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

fn prefixed_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{prefix}/{path}")
    }
}

fn prefixed(ps: &PlatformStrings, prefix: &str) -> PlatformStrings {
    let (out, _) = ps.map(|s| Ok::<_, std::convert::Infallible>(prefixed_path(prefix, s)));
    out
}

fn test_name(library: Option<&str>, default: &str, suffix: &str) -> String {
    match library {
        Some(lib) if lib != DEFAULT_LIB_NAME => format!("{lib}{suffix}"),
        _ => default.to_string(),
    }
}

/// Visibility of a target in the package at `rel`.
///
/// Packages under an `internal` directory are visible to the subtree rooted at the parent of the
/// last `internal` segment.
fn visibility(rel: &str) -> String {
    let segments: Vec<&str> = rel.split('/').collect();
    match segments.iter().rposition(|s| *s == "internal") {
        Some(i) => format!("//{}:__subpackages__", segments[..i].join("/")),
        None => PUBLIC_VISIBILITY.to_string(),
    }
}

/// Syntax for one rule: `kind(positional..., attr = value, ...)`.
pub fn rule_call(rule: &Rule) -> Call {
    let mut call = Call::new(&rule.kind);
    call.args
        .extend(rule.args.iter().map(|a| Arg::positional(Expr::string(a))));
    call.args.extend(
        rule.attrs
            .iter()
            .map(|(name, value)| Arg::keyword(name, attr_expr(value))),
    );
    call
}

fn attr_expr(value: &AttrValue) -> Expr {
    match value {
        AttrValue::Str(s) => Expr::string(s),
        AttrValue::List(items) => Expr::string_list(items),
        AttrValue::Platform(ps) => platform_expr(ps),
        AttrValue::Glob(patterns) => {
            let mut glob = Call::new("glob");
            glob.args.push(Arg::positional(Expr::string_list(patterns)));
            Expr::Call(glob)
        }
    }
}

/// `[generic] + select({platform: [...], "//conditions:default": []})`; the select is omitted
/// when nothing is platform-specific and the list when nothing is generic.
fn platform_expr(ps: &PlatformStrings) -> Expr {
    let generic = Expr::string_list(&ps.generic);
    if !ps.has_platform_specific() {
        return generic;
    }

    let mut dict = Dict::default();
    for (platform, items) in ps.platform.iter().filter(|(_, v)| !v.is_empty()) {
        dict.entries.push(DictEntry {
            comments: Default::default(),
            key: Expr::string(format!("{PLATFORM_PREFIX}{platform}")),
            value: Expr::string_list(items),
        });
    }
    dict.entries.push(DictEntry {
        comments: Default::default(),
        key: Expr::string(DEFAULT_CONDITION),
        value: Expr::string_list(Vec::<String>::new()),
    });
    let mut select = Call::new("select");
    select.args.push(Arg::positional(Expr::Dict(dict)));
    let select = Expr::Call(select);

    if ps.generic.is_empty() {
        select
    } else {
        Expr::add(generic, select)
    }
}
