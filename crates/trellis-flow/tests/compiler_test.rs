//! Structure tests for the forest compiler
//!
//! Each test compiles a short script and checks how actions, requirements and
//! triggers were grouped.

use std::sync::Arc;

use trellis_core::{
    Action, ConfigSchema, Configurable, DirectiveKind, ExecutionContext, Outcome, Requirement,
    Trigger,
};
use trellis_flow::{CompileError, Compiler, DirectiveError, Forest, ForestNode, Registry};

#[derive(Debug, Default)]
struct Stub;

impl Configurable for Stub {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
    }
}

impl Action for Stub {
    type Target = String;

    fn execute(&self, _target: &String, _ctx: &ExecutionContext) -> Outcome {
        Outcome::success()
    }
}

impl Requirement for Stub {
    type Target = String;

    fn test(&self, _target: &String, _ctx: &ExecutionContext) -> Outcome {
        Outcome::success()
    }
}

impl Trigger for Stub {
    type Target = String;
}

fn compiler() -> Compiler {
    let registry = Registry::new();
    for name in ["a", "a1", "a2"] {
        registry.register_action::<Stub>(name);
    }
    for name in ["r", "r1", "r2"] {
        registry.register_requirement::<Stub>(name);
    }
    for name in ["t", "t1", "t2"] {
        registry.register_trigger::<Stub>(name);
    }
    Compiler::new(Arc::new(registry))
}

fn compile(lines: &[&str]) -> Forest {
    compiler().compile_lines(lines).unwrap()
}

// ============================================================================
// Actions and requirements
// ============================================================================

#[test]
fn test_consecutive_actions_nest_under_first() {
    let forest = compile(&["?r", "?r", "!a", "!a", "!a"]);

    assert_eq!(forest.len(), 1);
    let action = forest.actions().next().unwrap();
    assert_eq!(action.requirements().len(), 2);
    assert_eq!(action.children().len(), 2);
}

#[test]
fn test_requirement_guards_only_next_action() {
    let forest = compile(&["?r1", "!a1", "?r2", "!a2"]);

    let actions: Vec<_> = forest.actions().collect();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].identifier(), "a1");
    assert_eq!(actions[0].requirements().len(), 1);
    assert_eq!(actions[0].requirements()[0].identifier(), "r1");
    assert_eq!(actions[1].identifier(), "a2");
    assert_eq!(actions[1].requirements().len(), 1);
    assert_eq!(actions[1].requirements()[0].identifier(), "r2");
}

#[test]
fn test_requirement_breaks_nesting() {
    let forest = compile(&["?r", "!a1", "!a", "!a", "?r", "!a2", "!a"]);

    let actions: Vec<_> = forest.actions().collect();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].children().len(), 2);
    assert_eq!(actions[1].children().len(), 1);
    assert!(actions[1].children()[0].requirements().is_empty());
}

#[test]
fn test_run_of_actions_forms_one_chain() {
    for count in 1..6 {
        let lines = vec!["!a"; count];
        let forest = compile(&lines);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.actions().next().unwrap().children().len(), count - 1);
    }
}

#[test]
fn test_requirements_only_script_is_flat() {
    let forest = compile(&["?r1", "?r2", "?r"]);

    assert!(forest.is_filter());
    assert_eq!(forest.actions().count(), 0);
    assert_eq!(forest.triggers().count(), 0);
    let identifiers: Vec<_> = forest.requirements().map(|r| r.identifier()).collect();
    assert_eq!(identifiers, vec!["r1", "r2", "r"]);
}

#[test]
fn test_trailing_requirements_are_dropped() {
    let forest = compile(&["!a", "?r1", "?r2"]);

    assert_eq!(forest.len(), 1);
    assert_eq!(forest.requirements().count(), 0);
    let action = forest.actions().next().unwrap();
    assert!(action.requirements().is_empty());
    assert!(action.children().is_empty());
}

// ============================================================================
// Triggers
// ============================================================================

#[test]
fn test_actions_before_trigger_stay_top_level() {
    let forest = compile(&["!a", "!a", "@t"]);

    assert_eq!(forest.len(), 2);
    match &forest.nodes()[0] {
        ForestNode::Action(action) => assert_eq!(action.children().len(), 1),
        other => panic!("expected action, got {:?}", other),
    }
    match &forest.nodes()[1] {
        ForestNode::Trigger(trigger) => assert!(trigger.actions().is_empty()),
        other => panic!("expected trigger, got {:?}", other),
    }
}

#[test]
fn test_trigger_adopts_requirements_and_actions() {
    let forest = compile(&["?r", "?r", "@t", "!a", "!a", "@t2"]);

    let triggers: Vec<_> = forest.triggers().collect();
    assert_eq!(triggers.len(), 2);
    assert_eq!(triggers[0].requirements().len(), 2);
    assert_eq!(triggers[0].actions().len(), 1);
    assert_eq!(triggers[0].actions()[0].children().len(), 1);
    assert!(triggers[1].requirements().is_empty());
    assert!(triggers[1].actions().is_empty());
}

#[test]
fn test_new_trigger_closes_previous_one() {
    let forest = compile(&["@t", "!a", "!a", "@t2", "!a"]);

    let triggers: Vec<_> = forest.triggers().collect();
    assert_eq!(triggers.len(), 2);
    assert_eq!(triggers[0].actions().len(), 1);
    assert_eq!(triggers[1].actions().len(), 1);
    assert_ne!(triggers[0].actions()[0].id(), triggers[1].actions()[0].id());
}

#[test]
fn test_consecutive_triggers_share_actions() {
    let forest = compile(&["@t1", "@t2", "!a1"]);

    let triggers: Vec<_> = forest.triggers().collect();
    assert_eq!(triggers.len(), 2);
    for trigger in &triggers {
        assert!(trigger.requirements().is_empty());
        assert_eq!(trigger.actions().len(), 1);
        assert_eq!(trigger.actions()[0].identifier(), "a1");
    }
    assert_eq!(triggers[0].actions()[0].id(), triggers[1].actions()[0].id());
}

#[test]
fn test_pending_requirements_go_to_first_trigger_only() {
    let forest = compile(&["?r", "?r", "@t1", "@t2", "!a1"]);

    let triggers: Vec<_> = forest.triggers().collect();
    assert_eq!(triggers[0].requirements().len(), 2);
    assert!(triggers[1].requirements().is_empty());
    assert_eq!(triggers[1].actions().len(), 1);
}

#[test]
fn test_shared_actions_keep_following_actions() {
    let forest = compile(&["@t1", "@t2", "!a1", "?r", "!a2"]);

    for trigger in forest.triggers() {
        let identifiers: Vec<_> = trigger.actions().iter().map(|a| a.identifier()).collect();
        assert_eq!(identifiers, vec!["a1", "a2"]);
    }
}

#[test]
fn test_requirement_inside_trigger_guards_action() {
    let forest = compile(&["@t", "?r", "!a", "@t1"]);

    let triggers: Vec<_> = forest.triggers().collect();
    assert_eq!(triggers.len(), 2);
    assert!(triggers[0].requirements().is_empty());
    assert_eq!(triggers[0].actions().len(), 1);
    assert_eq!(triggers[0].actions()[0].requirements().len(), 1);
    assert!(triggers[1].actions().is_empty());
}

#[test]
fn test_roots_keep_script_order() {
    let forest = compile(&["!a1", "?r", "!a2", "@t", "!a"]);

    let identifiers: Vec<_> = forest.iter().map(|n| n.identifier()).collect();
    assert_eq!(identifiers, vec!["a1", "a2", "t"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_identifier() {
    let err = compiler().compile_lines(&["?r", "!fly"]).unwrap_err();

    assert_eq!(err.to_string(), "No action with identifier \"fly\" found on line 2/2");
    assert!(matches!(
        err,
        CompileError::Line {
            index: 2,
            source: DirectiveError::UnknownIdentifier {
                kind: DirectiveKind::Action,
                ..
            },
            ..
        }
    ));
}

#[test]
fn test_identifier_kinds_are_separate() {
    let err = compiler().compile_lines(&["@a"]).unwrap_err();
    assert_eq!(err.to_string(), "No trigger with identifier \"a\" found on line 1/1");
}

#[test]
fn test_unparsable_line() {
    let err = compiler()
        .compile_lines(&["!a", "# comment", "a"])
        .unwrap_err();
    assert!(matches!(err, CompileError::NoMatchingParser { index: 3, total: 3, .. }));
}

#[test]
fn test_bad_node_options() {
    let err = compiler()
        .compile_lines(&["!a", "!a(cooldown=later)"])
        .unwrap_err();
    assert_eq!(err.source_index(), 2);
    assert!(err.to_string().contains("cooldown"));
}

#[test]
fn test_identifiers_are_case_insensitive() {
    let forest = compile(&["@T", "!A1"]);
    let trigger = forest.triggers().next().unwrap();
    assert_eq!(trigger.identifier(), "T");
    assert!(trigger.matches("t"));
}

#[test]
fn test_aliases_compile_to_the_same_component() {
    let registry = Registry::new();
    registry.register_action::<Stub>("a");
    registry.register_trigger_with::<Stub>("join", &["login"], Some("player joined"));
    let forest = Compiler::new(Arc::new(registry))
        .compile_lines(&["@login", "!a"])
        .unwrap();

    let trigger = forest.triggers().next().unwrap();
    assert_eq!(trigger.identifier(), "login");
    assert!(trigger.matches("login"));
    assert!(trigger.matches("JOIN"));
    assert!(!trigger.matches("leave"));
    assert_eq!(forest.triggers_for("join").count(), 1);
}
