// Integration tests for the Dart conformance checker

use std::collections::HashSet;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use dart_spec_parser::parser::lexer::Lexer;
use dart_spec_parser::parser::token::TokenKind;
use dart_spec_parser::{
    check, check_all, check_with_options, DiagnosticKind, ParseOptions, SourceLocation,
    SourceUnit, Verdict,
};

fn accept(source: &str) {
    let verdict = check(&SourceUnit::new("test.dart", source));
    assert!(
        verdict.is_accepted(),
        "expected acceptance, got {:?}\n{}",
        verdict,
        source
    );
}

fn reject(source: &str) -> (SourceLocation, String) {
    match check(&SourceUnit::new("test.dart", source)) {
        Verdict::Accepted => panic!("expected rejection:\n{}", source),
        Verdict::Rejected(diagnostic) => (diagnostic.location, diagnostic.message),
    }
}

#[test]
fn test_hello_world() {
    accept("void main() { print('Hello, world!'); }");
}

#[test]
fn test_every_token_kind_is_accepted() {
    let source = fs::read_to_string("tests/fixtures/all_tokens.dart").expect("fixture");
    accept(&source);

    let seen: HashSet<TokenKind> = Lexer::new(&source)
        .tokenize()
        .expect("fixture lexes")
        .into_iter()
        .map(|token| token.kind)
        .collect();

    use TokenKind::*;
    let expected = [
        // Literals and names
        Identifier, Number, String, StringBegin, StringMiddle, StringEnd, ScriptTag,
        // Reserved words
        Assert, Break, Case, Catch, Class, Const, Continue, Default, Do, Else, Enum, Extends,
        False, Final, Finally, For, If, In, Is, New, Null, Rethrow, Return, Super, Switch, This,
        Throw, True, Try, Var, Void, While, With,
        // Built-in identifiers
        Abstract, As, Covariant, Deferred, Dynamic, Export, External, Extension, Factory,
        Function, Get, Implements, Import, Interface, Late, Library, Mixin, Operator, Part,
        Required, Set, Static, Typedef,
        // Contextual keywords
        Async, Await, Hide, Of, On, Show, Sync, Yield,
        // Operators and punctuation
        LParen, RParen, LBracket, RBracket, LBrace, RBrace, Semicolon, Comma, Colon, At, Hash,
        Arrow, Dot, DotDot, Ellipsis, EllipsisQuestion, Question, QuestionDot, QuestionDotDot,
        QuestionQuestion, QuestionQuestionEq, Eq, EqEq, Bang, BangEq, AmpAmp, PipePipe, Lt,
        LtEq, LtLt, LtLtEq, Gt, GtEq, GtGt, GtGtEq, GtGtGt, GtGtGtEq, Plus, PlusEq, PlusPlus,
        Minus, MinusEq, MinusMinus, Star, StarEq, Slash, SlashEq, Percent, PercentEq,
        TildeSlash, TildeSlashEq, Tilde, Amp, AmpEq, Pipe, PipeEq, Caret, CaretEq, Eof,
    ];
    let missing: Vec<TokenKind> = expected
        .iter()
        .copied()
        .filter(|kind| !seen.contains(kind))
        .collect();
    assert!(missing.is_empty(), "token kinds never exercised: {:?}", missing);
}

#[test]
fn test_realistic_program() {
    accept(
        r#"
import 'dart:collection';

/// A bounded queue.
class BoundedQueue<E> extends IterableBase<E> {
  final Queue<E> _items = Queue<E>();
  final int capacity;

  BoundedQueue(this.capacity) : assert(capacity > 0);

  @override
  Iterator<E> get iterator => _items.iterator;

  bool offer(E item) {
    if (_items.length >= capacity) return false;
    _items.addLast(item);
    return true;
  }

  E? poll() => _items.isEmpty ? null : _items.removeFirst();

  Map<String, Object?> toJson() => {
        'capacity': capacity,
        'items': [for (final item in _items) '$item'],
        if (_items.isNotEmpty) 'head': _items.first,
      };
}

Future<int> sumAll(Stream<int> values) async {
  var sum = 0;
  await for (final v in values) {
    sum += v;
  }
  return sum;
}

void main() {
  final queue = BoundedQueue<int>(2)
    ..offer(1)
    ..offer(2);
  final doubled = queue.map((x) => x * 2).where((x) => x > 1).toList();
  print('${doubled.length} items: ${doubled.join(', ')}');
  final Map<String, List<int>> grouped = {};
  grouped.putIfAbsent('a', () => <int>[]).add(1);
  late final int Function(int) inc = (n) => n + 1;
  print(inc(grouped['a']![0]));
}
"#,
    );
}

#[test]
fn test_generics_close_with_shift_tokens() {
    accept("Map<String, List<Set<int>>> nested = {};");
    accept("void main() { List<List<int>> x = []; x = <List<int>>[]; }");
    accept("class A<T extends List<List<int>>> {}");
}

#[test]
fn test_generic_call_is_preferred_over_comparison() {
    accept("void main() { f(a<b, c>(d)); }");
    accept("void main() { f(a < b, c > d); }");
}

#[test]
fn test_stray_token_after_declaration() {
    let (location, message) = reject("void main() {}\n}");
    assert_eq!(location, SourceLocation::new(2, 1));
    assert_eq!(message, "Expected a top-level declaration, found '}'");
}

#[test]
fn test_only_first_error_is_reported() {
    let (location, message) = reject("void main() {\n  var a = 1\n  var b = 2\n}");
    assert_eq!(location, SourceLocation::new(3, 3));
    assert_eq!(message, "Expected ';' after variable declaration, found 'var'");
}

#[test]
fn test_illegal_character_position() {
    let verdict = check(&SourceUnit::new("lex.dart", "var a;\nvar § = 1;"));
    let diagnostic = verdict.diagnostic().expect("rejected");
    assert_eq!(diagnostic.kind, DiagnosticKind::Lexical);
    assert_eq!(diagnostic.to_string(), "lex.dart:2:5: Unexpected character '§'");
}

#[test]
fn test_unterminated_constructs() {
    let (location, message) = reject("void main() {\n  print('hi');\n");
    assert_eq!(location, SourceLocation::new(3, 1));
    assert_eq!(message, "Expected '}' to close the block, found end of file");

    let (_, message) = reject("var s = 'open;");
    assert_eq!(message, "Unterminated string literal");

    let (_, message) = reject("/* never closed");
    assert_eq!(message, "Unterminated block comment");
}

#[test]
fn test_batch_independence() {
    let good = SourceUnit::new("good.dart", "class A {}");
    let bad = SourceUnit::new("bad.dart", "class A {");
    let options = ParseOptions::default();

    let forward = check_all([&good, &bad, &good], &options);
    let backward = check_all([&bad, &good, &good], &options);

    assert_eq!(forward[0], backward[1]);
    assert_eq!(forward[1], backward[0]);
    assert!(forward[0].is_accepted() && forward[2].is_accepted());
    assert!(!forward[1].is_accepted());
}

#[test]
fn test_deep_nesting_is_a_diagnostic() {
    let depth = 10_000;
    let source = format!("var x = {}0{};", "(".repeat(depth), ")".repeat(depth));
    let (_, message) = reject(&source);
    assert_eq!(message, "Nesting depth exceeds the limit of 128");

    let blocks = format!("void main() {}{}", "{".repeat(depth), "}".repeat(depth));
    let (_, message) = reject(&blocks);
    assert_eq!(message, "Nesting depth exceeds the limit of 128");

    let parameters = format!("void f({}x{} {{}}", "a(".repeat(depth), ")".repeat(depth + 1));
    let (_, message) = reject(&parameters);
    assert_eq!(message, "Nesting depth exceeds the limit of 128");

    let operand = format!("var y = ({}x{};", "a(".repeat(depth), ")".repeat(depth + 1));
    let (_, message) = reject(&operand);
    assert_eq!(message, "Nesting depth exceeds the limit of 128");
}

fn annotated_locals(levels: usize) -> String {
    if levels == 0 {
        return "x = 1;".to_string();
    }
    format!("@A(() {{ {} }}) var x;", annotated_locals(levels - 1))
}

fn closure_defaults(levels: usize) -> String {
    if levels == 0 {
        return "g();".to_string();
    }
    format!("f([a = () {{ {} }}]);", closure_defaults(levels - 1))
}

#[test]
fn test_nested_closures_in_annotations_and_defaults_stay_fast() {
    let sources = [
        format!("void main() {{ {} }}", annotated_locals(40)),
        format!("void main() {{ {} }}", closure_defaults(40)),
    ];
    let options = ParseOptions {
        max_nesting_depth: 1024,
    };

    // Deep recursion needs more than the default test thread stack.
    let worker = thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || {
            sources
                .iter()
                .map(|source| {
                    let unit = SourceUnit::new("nested.dart", source.as_str());
                    let started = Instant::now();
                    let verdict = check_with_options(&unit, &options);
                    (verdict, started.elapsed())
                })
                .collect::<Vec<_>>()
        })
        .expect("spawn checker thread");

    for (verdict, elapsed) in worker.join().expect("checker thread") {
        assert!(verdict.is_accepted(), "{:?}", verdict);
        assert!(elapsed < Duration::from_secs(10), "took {:?}", elapsed);
    }
}

#[test]
fn test_nesting_limit_is_configurable() {
    let source = format!("var x = {}0{};", "[".repeat(50), "]".repeat(50));
    let unit = SourceUnit::new("deep.dart", source);
    assert!(check(&unit).is_accepted());

    let strict = ParseOptions {
        max_nesting_depth: 20,
    };
    assert!(!check_with_options(&unit, &strict).is_accepted());
}

#[test]
fn test_contextual_keywords_as_identifiers() {
    accept("void main() { var async = 1, on = 2, show = 3, of = 4; print(async + on + show + of); }");
    accept("class on {} var set = 1;");
    accept("int await = 0; int yield = 1;");
}

#[test]
fn test_reserved_words_are_not_identifiers() {
    let (_, message) = reject("var class = 1;");
    assert_eq!(message, "Expected an identifier, found 'class'");
}

#[test]
fn test_await_outside_async_is_an_identifier() {
    let (location, message) = reject("void f() { await g(); }");
    assert_eq!(location, SourceLocation::new(1, 18));
    assert_eq!(message, "Expected ';' after expression, found identifier 'g'");
}

#[test]
fn test_part_files() {
    accept("part of 'library.dart';\n\nclass Helper {}");
    let (_, message) = reject("part of lib;\nimport 'a.dart';");
    assert_eq!(message, "Expected a top-level declaration, found 'import'");
}

#[test]
fn test_conditional_and_null_aware_index() {
    accept("var a = list?[0];");
    accept("var b = flag ? [0] : [1];");
    accept("var c = x is int? ? 1 : 2;");
}

#[test]
fn test_script_tag_only_first_line() {
    accept("#!/usr/bin/env dart\nvoid main() {}");
    assert!(!check(&SourceUnit::new("s.dart", "\n#!/usr/bin/env dart\n")).is_accepted());
}
