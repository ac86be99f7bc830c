//! Error classification of malformed inputs
//!
//! Every case is a complete input that must fail, with the expected error kind and the line the
//! error is reported at.

use propconf_parser::{parse_str, ErrorKind};
use rstest::rstest;

#[rstest]
#[case::missing_assign("x : integer 5\n", ErrorKind::Syntax, 1)]
#[case::missing_key(" : integer = 5\n", ErrorKind::Syntax, 1)]
#[case::bad_type("x : float = 5\n", ErrorKind::Syntax, 1)]
#[case::missing_size("x : integer[ = 5\n", ErrorKind::Syntax, 1)]
#[case::bad_size("x : integer[two] = 5\n", ErrorKind::Syntax, 1)]
#[case::negative_size("x : integer[-1] = 5\n", ErrorKind::Syntax, 1)]
#[case::unclosed_size("x : integer[2 = 5 6\n", ErrorKind::Syntax, 1)]
#[case::bad_index("x[a] : integer = 5\n", ErrorKind::Syntax, 1)]
#[case::in_on_scalar("x : real in mm = 5\n", ErrorKind::Syntax, 1)]
#[case::as_on_vector("x : real[2] as length = 5 6\n", ErrorKind::Syntax, 1)]
#[case::as_other_on_string("x : string as file = \"a\"\n", ErrorKind::Syntax, 1)]
#[case::unit_on_integer("x : integer as length = 5\n", ErrorKind::Syntax, 1)]
#[case::unknown_label("x : real as flavour = 5\n", ErrorKind::Resolution, 1)]
#[case::unknown_symbol("x : real[2] in parsec2 = 5 6\n", ErrorKind::Resolution, 1)]
#[case::trailing_head("x : integer extra = 5\n", ErrorKind::Syntax, 1)]
#[case::append_scalar("#@allow_key_override\nx : integer = 1\nx : integer += 2\n", ErrorKind::Syntax, 3)]
#[case::index_on_vector("#@allow_key_override\nx : integer[2] = 1 2\nx[0] : integer[1] = 2\n", ErrorKind::Syntax, 3)]
#[case::units_disabled("#@disable_real_with_unit\nx : real as length = 5\n", ErrorKind::Syntax, 2)]
#[case::vector_units_disabled("#@disable_real_with_unit\nv : real[2] in mm = 1 2\n", ErrorKind::Syntax, 2)]
#[case::detached_append_mark("#@allow_key_override\nv : integer[1] = 1\nv : integer[1] + = 2\n", ErrorKind::Syntax, 3)]
#[case::missing_values("x : integer[3] = 1 2\n", ErrorKind::Syntax, 1)]
#[case::bad_boolean("x : boolean = yes\n", ErrorKind::Syntax, 1)]
#[case::overflow("x : integer = 3000000000\n", ErrorKind::Syntax, 1)]
#[case::quoted_number("x : integer = \"5\"\n", ErrorKind::Syntax, 1)]
#[case::unit_label_mismatch("x : real as length = 5 ns\n", ErrorKind::Semantic, 1)]
#[case::unknown_directive("#@frobnicate\n", ErrorKind::Syntax, 1)]
#[case::late_topic("x : integer = 1\n#@topic late\n", ErrorKind::Syntax, 2)]
#[case::late_include_dir("x : integer = 1\n#@include_dir /tmp\n", ErrorKind::Syntax, 2)]
#[case::end_while_pending("#@description Pending\n#@end\n", ErrorKind::Syntax, 2)]
#[case::end_while_guarded("#@variant_only a:b|true\n#@end\n", ErrorKind::Syntax, 2)]
#[case::endif_without_if("#@variant_endif\n", ErrorKind::Syntax, 1)]
#[case::unclosed_if("#@variant_if a:b|true\nx : integer = 1\n", ErrorKind::Syntax, 2)]
#[case::late_empty_description("x : integer = 1\n#@description\n", ErrorKind::Syntax, 2)]
#[case::locked_override("#@allow_key_override\nx : const integer = 1\nx : integer = 2\n", ErrorKind::Semantic, 3)]
#[case::append_missing("#@allow_key_override\nx : integer[1] += 2\n", ErrorKind::Semantic, 2)]
#[case::append_path_mismatch(
    "#@allow_key_override\nf : string[1] as path = a\nf : string[1] += b\n",
    ErrorKind::Semantic,
    3
)]
fn test_rejected_inputs(#[case] input: &str, #[case] kind: ErrorKind, #[case] line: usize) {
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind(), kind, "{}", err);
    assert_eq!(err.line(), Some(line), "{}", err);
}

#[test]
fn test_message_carries_location() {
    let err = parse_str("a : integer = 1\nb : integer = nope\n").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"at line #2: syntax error: cannot read integer value from 'nope' for key 'b'"
    );
}

#[test]
fn test_trailing_values_are_not_errors() {
    let store = parse_str("n : integer = 4 5 6\ns : string = \"a\" b\n").unwrap();
    assert_eq!(store.integer("n"), Some(4));
    assert_eq!(store.string("s"), Some("a"));
}
