// Command-line behaviour: exit status and diagnostic format
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn cli() -> Command {
    Command::cargo_bin("dart-spec-parser").unwrap()
}

#[test]
fn cli_requires_a_file() {
    cli()
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Expected a file path as argument."));
}

#[test]
fn cli_accepts_valid_file() {
    cli()
        .arg("tests/fixtures/hello.dart")
        .assert()
        .success()
        .stderr(contains("tests/fixtures/hello.dart").not());
}

#[test]
fn cli_reports_first_syntax_error() {
    cli()
        .args(["--color", "never", "tests/fixtures/missing_semicolon.dart"])
        .assert()
        .code(1)
        .stderr(contains(
            "tests/fixtures/missing_semicolon.dart:3:3: Expected ';' after variable declaration, found 'var'",
        ))
        .stderr(contains(":4:").not());
}

#[test]
fn cli_reports_lexical_error_position() {
    cli()
        .args(["--color", "never", "tests/fixtures/bad_character.dart"])
        .assert()
        .code(1)
        .stderr(contains("bad_character.dart:2:5: Unexpected character '§'"));
}

#[test]
fn cli_checks_every_file_independently() {
    cli()
        .args([
            "--color",
            "never",
            "tests/fixtures/stray_brace.dart",
            "tests/fixtures/does_not_exist.dart",
            "tests/fixtures/hello.dart",
            "tests/fixtures/missing_semicolon.dart",
        ])
        .assert()
        .code(1)
        .stderr(contains(
            "tests/fixtures/stray_brace.dart:5:1: Expected a top-level declaration, found '}'",
        ))
        .stderr(contains("tests/fixtures/does_not_exist.dart: "))
        .stderr(contains("missing_semicolon.dart:3:3"));
}

#[test]
fn cli_verbose_announces_files() {
    cli()
        .args(["--verbose", "tests/fixtures/hello.dart", "tests/fixtures/all_tokens.dart"])
        .assert()
        .success()
        .stderr(
            contains(">>> Parsing file: tests/fixtures/hello.dart")
                .and(contains(">>> Parsing file: tests/fixtures/all_tokens.dart")),
        );
}

#[test]
fn cli_max_depth_limits_nesting() {
    cli()
        .args(["--color", "never", "--max-depth", "4", "tests/fixtures/all_tokens.dart"])
        .assert()
        .code(1)
        .stderr(contains("Nesting depth exceeds the limit of 4"));
}
