//! Label text forms must round-trip exactly.

use proptest::prelude::*;
use rulegen_types::Label;

fn arb_segment() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-z][a-z0-9_.-]{0,8}").unwrap()
}

fn arb_label() -> impl Strategy<Value = Label> {
    let repo = prop_oneof![Just(String::new()), arb_segment()];
    let pkg = prop::collection::vec(arb_segment(), 0..4).prop_map(|s| s.join("/"));
    (repo, pkg, arb_segment(), any::<bool>()).prop_map(|(repo, pkg, name, relative)| {
        if relative {
            Label::relative(name)
        } else {
            Label::new(repo, pkg, name)
        }
    })
}

proptest! {
    #[test]
    fn display_then_parse_is_identity(label in arb_label()) {
        let text = label.to_string();
        let parsed = Label::parse(&text).unwrap();
        prop_assert_eq!(parsed, label);
    }
}

#[test]
fn external_label_text() {
    let label: Label = "@org_golang_x_net//context:go_default_library".parse().unwrap();
    assert_eq!(label.repo, "org_golang_x_net");
    assert_eq!(label.pkg, "context");
    assert_eq!(label.name, "go_default_library");
    assert!(!label.relative);
}
