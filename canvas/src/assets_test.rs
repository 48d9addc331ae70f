use super::*;

#[test]
fn known_heads_resolve_under_base() {
    let assets = StaticAssets::new("https://cdn.example/ext/");
    assert_eq!(assets.resolve("chevron").as_deref(), Some("https://cdn.example/ext/arrowheads/chevron.png"));
}

#[test]
fn unknown_name_is_none() {
    let assets = StaticAssets::new("/static");
    assert!(assets.resolve("../../etc/passwd").is_none());
    assert!(assets.resolve("").is_none());
}

#[test]
fn every_shipped_head_resolves() {
    let assets = StaticAssets::new("");
    for name in ARROW_HEADS {
        assert!(assets.resolve(name).is_some(), "{name}");
    }
}
