use rulegen_types::Label;
use rulegen_types::kinds::DEFAULT_LIB_NAME;

/// Maps every import to `//vendor/<importpath>`. Whether the package is really vendored is only
/// checked when the build runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VendoredResolver;

impl VendoredResolver {
    pub(crate) fn resolve(&self, importpath: &str) -> Label {
        Label::local(format!("vendor/{importpath}"), DEFAULT_LIB_NAME)
    }
}
