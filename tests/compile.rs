use std::path::Path;

use concrete_stone::ir::{Check, ResolvedField};
use concrete_stone::{Capability, CompileError, Kind, Module, compile, emit_descriptor, json_schema, parse_unit};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

/// `// expect:` header of a fixture: `None` for ok, `Some(code)` for an error.
fn expected_error(src: &str) -> Option<String> {
    let header = src
        .lines()
        .find_map(|l| l.strip_prefix("// expect:"))
        .unwrap_or_else(|| panic!("fixture without expect header"))
        .trim();
    header.strip_prefix("error").map(|code| code.trim().to_string())
}

fn bind_target(src: &str) -> Option<&str> {
    src.lines().find_map(|l| l.strip_prefix("// bind:")).map(str::trim)
}

#[test]
fn every_fixture_matches_its_header() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut seen = 0;
    for entry in std::fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|e| e.to_str()) != Some("stone") {
            continue;
        }
        seen += 1;
        let src = std::fs::read_to_string(&path).unwrap();
        let outcome = compile(&src).and_then(|graph| match bind_target(&src) {
            Some(name) => Module::bind(&graph, name)?.build().map(|_| ()),
            None => Ok(()),
        });
        match (expected_error(&src), outcome) {
            (None, Ok(())) => {}
            (Some(code), Err(err)) => assert_eq!(err.code(), code, "{}: {err}", path.display()),
            (None, Err(err)) => panic!("{}: expected ok, got {err}", path.display()),
            (Some(code), Ok(())) => panic!("{}: expected {code}, got ok", path.display()),
        }
    }
    assert!(seen >= 10, "only {seen} fixtures found");
}

#[test]
fn basic_custom_type_bounds() {
    let graph = compile(&fixture("basic.stone")).unwrap();
    let basic = graph.schema("Basic").unwrap();

    let name = basic.value("name").unwrap();
    assert_eq!(name.kind, Kind::String);
    assert_eq!((name.min_length(), name.max_length()), (Some(1), Some(255)));

    let slug = basic.value("slug").unwrap();
    assert!(slug.optional);
    assert!(slug.checks.contains(&Check::Lowercase));
    assert!(slug.checks.iter().any(|c| matches!(c, Check::Pattern(p) if p.regex.is_match("a-b-1"))));

    let tags = basic.value("tags").unwrap();
    assert_eq!(tags.kind, Kind::Any);
    assert_eq!(tags.description.as_deref(), Some("free-form labels"));
}

#[test]
fn scoped_and_top_level_fields_stay_apart() {
    let graph = compile(&fixture("scopes.stone")).unwrap();
    let basic = graph.schema("Basic").unwrap();
    assert_eq!(basic.fields.keys().collect::<Vec<_>>(), vec!["someProp"]);
    assert!(basic.scope("nested").unwrap().value("nestedProp").is_some());
}

#[test]
fn deep_scopes_and_nested_objects() {
    let graph = compile(&fixture("deep_scopes.stone")).unwrap();
    let deep = graph.schema("Deep").unwrap();

    let a = deep.scope("a").unwrap();
    assert_eq!(a.fields.keys().collect::<Vec<_>>(), vec!["x", "w"]);
    let d = a.scope("b").unwrap().scope("c").unwrap().scope("d").unwrap();
    assert_eq!(d.path, "Deep.a.b.c.d");
    assert_eq!(d.value("z").unwrap().default, Some(serde_json::Value::Bool(true)));

    let Some(ResolvedField::Object(address)) = deep.fields.get("address") else {
        panic!("address should be an object field");
    };
    assert_eq!(address.object("geo").unwrap().path, "Deep.address.geo");
}

#[test]
fn forward_references_chain() {
    let graph = compile(&fixture("forward_refs.stone")).unwrap();
    let handle = graph.schema("Person").unwrap().value("handle").unwrap();
    assert_eq!(handle.checks, vec![Check::Trim, Check::MinLength(1), Check::MaxLength(3)]);
}

#[test]
fn cycle_names_the_chain() {
    let err = compile(&fixture("cycle.stone")).unwrap_err();
    assert_eq!(err.to_string(), "unresolved type: A -> B -> A");
}

#[test]
fn unknown_format_suggests_a_name() {
    let err = compile(&fixture("unknown_format.stone")).unwrap_err();
    let CompileError::UnknownFormat { kind, suggestion, .. } = &err else { panic!("{err}") };
    assert_eq!(kind, "boolean");
    assert_eq!(suggestion.as_deref(), Some("nullable"));
    assert!(err.to_string().contains("valid formats:"));
}

#[test]
fn grammar_errors_carry_position_and_expectations() {
    let err = compile(&fixture("bad_token.stone")).unwrap_err();
    let CompileError::Grammar { line, found, expected, .. } = err else { panic!("{err}") };
    assert_eq!(line, 2);
    assert_eq!(found, concrete_stone::lexer::TokenKind::Identifier);
    assert_eq!(expected, vec![concrete_stone::lexer::TokenKind::OpenParen]);
}

#[test]
fn todo_module_and_descriptor() {
    let src = fixture("todo.stone");
    let graph = compile(&src).unwrap();
    assert!(graph.has_capability("Todo", "id", Capability::Primary));

    let module = Module::bind(&graph, "Todo").unwrap();
    assert_eq!(module.primary_key(), "id");
    assert_eq!(module.private_fields(), vec!["id", "owner"]);
    assert_eq!(module.queryable_fields(), vec!["title", "done"]);
    assert_eq!(
        module.build().unwrap(),
        "message Todo {
  string id = 1;
  string title = 2;
  bool done = 3;
  optional int64 due = 4;
  string owner = 5;
}
"
    );
    assert_eq!(module.build().unwrap(), emit_descriptor(&graph, "Todo").unwrap());
}

#[test]
fn primary_key_is_checked_at_bind_time_only() {
    let graph = compile(&fixture("no_primary.stone")).unwrap();
    assert!(graph.schema("Note").is_ok());
    assert_eq!(
        Module::bind(&graph, "Note").unwrap_err(),
        CompileError::MissingPrimaryKey { schema: "Note".into() }
    );
}

#[test]
fn json_schema_for_todo() {
    let graph = compile(&fixture("todo.stone")).unwrap();
    let schema = json_schema(&graph, "Todo").unwrap();
    assert_eq!(schema["properties"]["owner"]["format"], serde_json::json!("email"));
    assert_eq!(schema["properties"]["done"]["default"], serde_json::json!(false));
    assert_eq!(schema["required"], serde_json::json!(["id", "title", "owner"]));
}

#[test]
fn parse_keeps_encounter_order() {
    let unit = parse_unit("schema S { f: (string, b, a, min(1), max(2), trim()); }").unwrap();
    let field = unit.schemas["S"].field_in(&[], "f").unwrap();
    assert_eq!(field.descriptors, vec!["string", "b", "a"]);
    let names: Vec<_> = field.formats.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["min", "max", "trim"]);
}
