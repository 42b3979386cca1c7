use super::ResolveErrorKind;
use rulegen_types::Label;
use rulegen_types::kinds::DEFAULT_LIB_NAME;

/// Resolves imports that live in this repository under the module prefix.
#[derive(Debug, Clone)]
pub(crate) struct StructuredResolver {
    prefix: String,
}

impl StructuredResolver {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn handles(&self, importpath: &str) -> bool {
        is_relative(importpath) || self.strip_prefix(importpath).is_some()
    }

    pub(crate) fn resolve(&self, importpath: &str, dir: &str) -> Result<Label, ResolveErrorKind> {
        let pkg = if is_relative(importpath) {
            join_clean(dir, importpath)?
        } else {
            self.strip_prefix(importpath)
                .unwrap_or(importpath)
                .to_string()
        };
        Ok(Label::local(pkg, DEFAULT_LIB_NAME))
    }

    fn strip_prefix<'a>(&self, importpath: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return None;
        }
        if importpath == self.prefix {
            return Some("");
        }
        importpath
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

pub(crate) fn is_relative(importpath: &str) -> bool {
    importpath.starts_with("./") || importpath.starts_with("..")
}

/// `dir/rel` with `.` and `..` segments applied.
fn join_clean(dir: &str, rel: &str) -> Result<String, ResolveErrorKind> {
    let mut segments: Vec<&str> = Vec::new();
    for seg in dir.split('/').chain(rel.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or(ResolveErrorKind::EscapesRoot)?;
            }
            seg => segments.push(seg),
        }
    }
    Ok(segments.join("/"))
}
