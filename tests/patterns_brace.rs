use globstream::patterns::{brace, CompiledGlob};

#[test]
fn test_brace_expansion() {
    let v = brace::expand("a{b,c}d").unwrap();
    assert!(v.contains(&"abd".to_string()));
    assert!(v.contains(&"acd".to_string()));
}

#[test]
fn test_brace_expansion_numeric_range() {
    let v = brace::expand("test{1..3}").unwrap();
    assert_eq!(v, vec!["test1", "test2", "test3"]);
}

#[test]
fn test_brace_expansion_depth_limit() {
    // Pattern with 11 levels of nesting to exceed MAX_DEPTH = 10
    let result = brace::expand("{a,{b,{c,{d,{e,{f,{g,{h,{i,{j,{k,l}}}}}}}}}}}");
    assert!(result.is_err());
}

#[test]
fn test_brace_expansion_count_limit() {
    let result = brace::expand("{1..10000}");
    assert!(result.is_err());
}

#[test]
fn braces_make_a_pattern_plural() {
    let glob = CompiledGlob::compile("/src/{main,lib}.rs", true).unwrap();
    assert!(!glob.is_singular());
    assert_eq!(glob.alternatives(), ["/src/main.rs", "/src/lib.rs"]);
}

#[test]
fn literal_brace_group_stays_singular() {
    let glob = CompiledGlob::compile("/src/{main}.rs", true).unwrap();
    assert!(glob.is_singular());
}
