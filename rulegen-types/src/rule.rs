use crate::attrs;
use crate::package::PlatformStrings;

/// Value of a rule attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    List(Vec<String>),
    /// Renders as `[generic] + select({platform: [...], "//conditions:default": []})`.
    Platform(PlatformStrings),
    /// Renders as `glob([patterns])`.
    Glob(Vec<String>),
}

impl AttrValue {
    pub fn str(s: impl Into<String>) -> Self {
        AttrValue::Str(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A named, typed build declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: String,
    /// Positional arguments, e.g. the prefix of `go_prefix("example.com/repo")`.
    pub args: Vec<String>,
    pub attrs: Vec<(String, AttrValue)>,
}

impl Rule {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            args: Vec::new(),
            attrs: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets `name` to `value`, replacing an earlier value of the same attribute.
    pub fn set(&mut self, name: &str, value: AttrValue) {
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn with(mut self, name: &str, value: AttrValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Value of the `name` attribute; rules without one (`go_prefix`) use their kind.
    pub fn name(&self) -> &str {
        self.attr("name")
            .and_then(AttrValue::as_str)
            .unwrap_or(&self.kind)
    }

    /// Orders attributes by the fixed priority list, independent of insertion order.
    pub fn sort_attrs(&mut self) {
        self.attrs.sort_by(|(a, _), (b, _)| attrs::compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_attrs_ignores_construction_order() {
        let mut r = Rule::new("go_test")
            .with("deps", AttrValue::list(["//a:go_default_library"]))
            .with("library", AttrValue::str(":go_default_library"))
            .with("srcs", AttrValue::list(["a_test.go"]))
            .with("name", AttrValue::str("go_default_test"));
        r.sort_attrs();
        let names: Vec<&str> = r.attrs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "srcs", "library", "deps"]);
        assert_eq!(r.name(), "go_default_test");
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut r = Rule::new("go_library").with("name", AttrValue::str("a"));
        r.set("name", AttrValue::str("b"));
        assert_eq!(r.attrs.len(), 1);
        assert_eq!(r.name(), "b");
    }

    #[test]
    fn nameless_rule_uses_kind() {
        let r = Rule::new("go_prefix").with_arg("example.com/repo");
        assert_eq!(r.name(), "go_prefix");
    }
}
