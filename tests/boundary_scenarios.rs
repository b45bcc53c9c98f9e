//! A set of literal boundary scenarios, exercised through the public
//! [`shell_syntax::parse_shell`] entry point rather than any single grammar
//! rule — these are whole-script, driver-level checks.

use shell_syntax::{ConditionKind, Severity, Token};

fn script_body(source: &str) -> Vec<Token> {
    let result = shell_syntax::parse_shell("t.sh", source);
    let (tree, _) = result.tree.unwrap_or_else(|| {
        panic!(
            "expected `{source:?}` to parse; notes: {:?}",
            result.notes
        )
    });
    let Token::Script(_, body) = tree else {
        panic!("root is always Script")
    };
    body
}

/// Scenario 1: `[ \( a = b \) -a \( c = d \) ]` parses with zero notes as
/// `Condition(SingleBracket, TcAnd(TcGroup(TcBinary "=" a b), TcGroup(TcBinary "=" c d)))`.
#[test]
fn scenario_1_single_bracket_group_and() {
    let result = shell_syntax::parse_shell("t.sh", "[ \\( a = b \\) -a \\( c = d \\) ]");
    assert_eq!(result.notes, Vec::new());
    let (tree, _) = result.tree.unwrap();
    let Token::Script(_, body) = tree else { panic!() };
    let [Token::Pipeline(_, stages)] = body.as_slice() else {
        panic!("expected one top-level pipeline")
    };
    let [Token::Redirecting(_, _, inner)] = stages.as_slice() else {
        panic!("expected one pipeline stage")
    };
    let Token::Condition(_, ConditionKind::SingleBracket, cond) = inner.as_ref() else {
        panic!("expected a Condition node")
    };
    assert!(matches!(cond.as_ref(), Token::TcAnd(..)));
}

/// Scenario 2: `[[ (a = b) || (c = d) ]]` parses with zero notes as a
/// `DoubleBracket` condition whose body is `TcOr`.
#[test]
fn scenario_2_double_bracket_group_or() {
    let result = shell_syntax::parse_shell("t.sh", "[[ (a = b) || (c = d) ]]");
    assert_eq!(result.notes, Vec::new());
    let (tree, _) = result.tree.unwrap();
    let Token::Script(_, body) = tree else { panic!() };
    let [Token::Pipeline(_, stages)] = body.as_slice() else {
        panic!("expected one top-level pipeline")
    };
    let [Token::Redirecting(_, _, inner)] = stages.as_slice() else {
        panic!("expected one pipeline stage")
    };
    let Token::Condition(_, ConditionKind::DoubleBracket, cond) = inner.as_ref() else {
        panic!("expected a Condition node")
    };
    assert!(matches!(cond.as_ref(), Token::TcOr(..)));
}

/// Scenario 3: `[[ a -a b ]]` parses with exactly one `Error` note telling
/// the user to use `&&` instead of `-a`.
#[test]
fn scenario_3_dash_a_inside_double_bracket() {
    let result = shell_syntax::parse_shell("t.sh", "[[ a -a b ]]");
    assert!(result.tree.is_some());
    assert_eq!(result.notes.len(), 1);
    assert_eq!(result.notes[0].severity, Severity::Error);
    assert!(result.notes[0].message.contains("use `&&` instead of `-a`"));
}

/// Scenario 4: inside a single-quoted string, a closing `'` immediately
/// followed by a letter earns an `Info` note about the apostrophe likely
/// having been meant as a literal character rather than a terminator.
#[test]
fn scenario_4_apostrophe_immediately_before_a_letter_warns() {
    let result = shell_syntax::parse_shell("t.sh", "echo 'foo'bar");
    assert!(result.tree.is_some());
    assert!(result
        .notes
        .iter()
        .any(|n| n.severity == Severity::Warning
            && n.message.contains("terminated the single quoted string")));
}

/// Scenario 5: `<< foo⏎lol⏎cow⏎foo` parses as an undashed, unquoted
/// here-document with body `"lol\ncow\n"`.
#[test]
fn scenario_5_here_doc_body() {
    let body = script_body("cat << foo\nlol\ncow\nfoo\n");
    let [Token::Pipeline(_, stages)] = body.as_slice() else {
        panic!("expected one top-level pipeline")
    };
    let [Token::Redirecting(_, redirs, _)] = stages.as_slice() else {
        panic!("expected one pipeline stage")
    };
    let [Token::FdRedirect(_, None, target)] = redirs.as_slice() else {
        panic!("expected exactly one redirection")
    };
    let Token::HereDoc(_, dashed, quoted, text) = target.as_ref() else {
        panic!("expected a here-document")
    };
    assert!(!dashed);
    assert!(!quoted);
    assert_eq!(text, "lol\ncow\n");
}

/// Scenario 6: `<<- EOF⏎  cow⏎  EOF` emits an error because the end token
/// is indented with spaces rather than tabs.
#[test]
fn scenario_6_dashed_here_doc_with_space_indent_is_an_error() {
    let result = shell_syntax::parse_shell("t.sh", "cat <<- EOF\n  cow\n  EOF\n");
    assert!(result.tree.is_some());
    assert!(result
        .notes
        .iter()
        .any(|n| n.message.contains("only indent with tabs")));
}

/// Scenario 7: `a &; b` still produces a tree (`Backgrounded a` then `b`)
/// but flags the stray semicolon.
#[test]
fn scenario_7_ampersand_semicolon() {
    let result = shell_syntax::parse_shell("t.sh", "a &; b");
    let (tree, _) = result.tree.unwrap();
    let Token::Script(_, body) = tree else { panic!() };
    assert_eq!(body.len(), 2);
    let Token::Backgrounded(_, inner) = &body[0] else {
        panic!("first command should be backgrounded")
    };
    assert!(matches!(inner.as_ref(), Token::Pipeline(..)));
    assert!(result
        .notes
        .iter()
        .any(|n| n.message.contains("foo &; bar")));
}

/// Scenario 8: `$(( 3 * 4 +5 ))` parses as a one-item `TaSequence` whose
/// item is `TaBinary "+" (TaBinary "*" 3 4) 5`.
#[test]
fn scenario_8_arithmetic_precedence() {
    let body = script_body("echo $(( 3 * 4 +5 ))\n");
    let [Token::Pipeline(_, stages)] = body.as_slice() else {
        panic!("expected one top-level pipeline")
    };
    let [Token::Redirecting(_, _, inner)] = stages.as_slice() else {
        panic!("expected one pipeline stage")
    };
    let Token::SimpleCommand(_, _, words) = inner.as_ref() else {
        panic!("expected a simple command")
    };
    let [_echo, arg] = words.as_slice() else {
        panic!("expected echo plus one argument")
    };
    let Token::NormalWord(_, parts) = arg else { panic!() };
    let [Token::DollarArithmetic(_, expr)] = parts.as_slice() else {
        panic!("expected a single $(( )) word part")
    };
    let Token::TaSequence(_, items) = expr.as_ref() else {
        panic!("expected a TaSequence")
    };
    assert_eq!(items.len(), 1);
    let Token::TaBinary(_, op, lhs, rhs) = &items[0] else {
        panic!("expected a TaBinary at the top")
    };
    assert_eq!(op, "+");
    assert!(matches!(lhs.as_ref(), Token::TaBinary(_, op, ..) if op == "*"));
    assert!(matches!(rhs.as_ref(), Token::TaLiteral(_, n) if n == "5"));
}

/// Scenario 9: `b += (1 2 3)` is flagged for spacing around `=`.
#[test]
fn scenario_9_spaces_around_assignment_operator() {
    let result = shell_syntax::parse_shell("t.sh", "b += (1 2 3)\n");
    assert!(result.tree.is_some());
    assert!(result
        .notes
        .iter()
        .any(|n| n.message.contains("Don't put spaces around the =")));
}

/// Scenario 10: `if false; then; echo oo; fi` is flagged for the stray
/// semicolon directly after `then`.
#[test]
fn scenario_10_semicolon_directly_after_then() {
    let result = shell_syntax::parse_shell("t.sh", "if false; then; echo oo; fi\n");
    assert!(result.tree.is_some());
    assert!(result
        .notes
        .iter()
        .any(|n| n.message.contains("No semicolons directly after 'then'")));
}

/// The set of ids appearing in the tree equals
/// the set of keys in the metadata map, for a script that exercises every
/// grammar family at once.
#[test]
fn metadata_ids_match_tree_ids_for_a_representative_script() {
    let script = r#"
        #!/bin/sh
        FOO=bar
        if [ -f "$FOO" ]; then
            for x in a b c; do
                case "$x" in
                    a|b) echo "$((x + 1))" ;;
                    *) echo done ;;
                esac
            done
        elif [[ $FOO == *.txt ]]; then
            echo "matched" | grep foo
        else
            : $(( i++ ))
        fi
    "#;
    let result = shell_syntax::parse_shell("t.sh", script);
    let (tree, metadata) = result
        .tree
        .unwrap_or_else(|| panic!("expected this script to parse; notes: {:?}", result.notes));

    let mut ids_in_tree = std::collections::HashSet::new();
    collect_ids(&tree, &mut ids_in_tree);

    let ids_in_map: std::collections::HashSet<_> = metadata.keys().copied().collect();
    assert_eq!(ids_in_tree, ids_in_map);
}

fn collect_ids(token: &Token, out: &mut std::collections::HashSet<shell_syntax::Id>) {
    out.insert(token.id());
    for child in children(token) {
        collect_ids(child, out);
    }
}

/// Returns every direct `Token` child of `token`, in source order.
fn children(token: &Token) -> Vec<&Token> {
    use Token::*;
    match token {
        Script(_, body) => body.iter().collect(),
        AndIf(_, l, r) | OrIf(_, l, r) => vec![l.as_ref(), r.as_ref()],
        Banged(_, c) | Backgrounded(_, c) => vec![c.as_ref()],
        Pipeline(_, list) => list.iter().collect(),
        Redirecting(_, redirs, cmd) => redirs.iter().chain(std::iter::once(cmd.as_ref())).collect(),
        SimpleCommand(_, assignments, words) => {
            assignments.iter().chain(words.iter()).collect()
        }
        BraceGroup(_, body) | Subshell(_, body) => body.iter().collect(),
        IfExpression(_, branches, else_body) => {
            let mut out: Vec<&Token> = Vec::new();
            for branch in branches {
                out.extend(branch.condition.iter());
                out.extend(branch.body.iter());
            }
            if let Some(body) = else_body {
                out.extend(body.iter());
            }
            out
        }
        WhileExpression(_, cond, body) | UntilExpression(_, cond, body) => {
            cond.iter().chain(body.iter()).collect()
        }
        ForIn(_, _, words, body) => words
            .iter()
            .flat_map(|w| w.iter())
            .chain(body.iter())
            .collect(),
        CaseExpression(_, word, arms) => {
            let mut out: Vec<&Token> = vec![word.as_ref()];
            for arm in arms {
                out.extend(arm.patterns.iter());
                out.extend(arm.body.iter());
            }
            out
        }
        Function(_, _, body) => vec![body.as_ref()],
        Condition(_, _, expr) => vec![expr.as_ref()],
        Arithmetic(_, expr) => vec![expr.as_ref()],
        FdRedirect(_, _, target) => vec![target.as_ref()],
        IoFile(_, _, file) => vec![file.as_ref()],
        HereDoc(..) => vec![],
        HereString(_, word) => vec![word.as_ref()],
        NormalWord(_, parts) => parts.iter().collect(),
        Literal(..) | SingleQuoted(..) | DollarBraced(..) | BraceExpansion(..) | TaLiteral(..)
        | TaVariable(..) => vec![],
        DoubleQuoted(_, parts) => parts.iter().collect(),
        DollarExpansion(_, body) => body.iter().collect(),
        DollarArithmetic(_, expr) => vec![expr.as_ref()],
        Extglob(_, _, alts) => alts.iter().collect(),
        Assignment(_, _, value) => vec![value.as_ref()],
        Array(_, words) => words.iter().collect(),
        TcAnd(_, _, l, r) | TcOr(_, _, l, r) => vec![l.as_ref(), r.as_ref()],
        TcNot(_, _, x) => vec![x.as_ref()],
        TcBinary(_, _, _, l, r) => vec![l.as_ref(), r.as_ref()],
        TcUnary(_, _, _, x) => vec![x.as_ref()],
        TcNoary(_, _, w) => vec![w.as_ref()],
        TcGroup(_, _, x) => vec![x.as_ref()],
        TaSequence(_, items) => items.iter().collect(),
        TaBinary(_, _, l, r) => vec![l.as_ref(), r.as_ref()],
        TaTrinary(_, c, t, f) => vec![c.as_ref(), t.as_ref(), f.as_ref()],
        TaUnary(_, _, x) => vec![x.as_ref()],
        TaExpansion(_, w) => vec![w.as_ref()],
    }
}
