//! Writer output for stores produced by the reader

use propconf_parser::{parse_str, Reader, Writer, WriterOptions};

#[test]
fn test_preferred_unit_output() {
    let store = parse_str("t : real = 2 s\n").unwrap();
    let text = Writer::new(WriterOptions::default().with_preferred_unit("ms"))
        .write_string(&store)
        .unwrap();
    insta::assert_snapshot!(text, @r"
#@enable_real_with_unit
t : real = 2000 ms
#@disable_real_with_unit
");
}

#[test]
fn test_format_document() {
    let source = "#@config \"Detector setup\"\n\
                  # plain comments are dropped\n\
                  #@description Active layers\n\
                  layers : boolean[12] = 1 1 1 0 0 0 1 1 1 0 0 0\n\
                  offsets : real[2] in cm = 1 2.5\n\
                  label = detector\n\
                  __internal : integer = 3\n";
    let store = parse_str(source).unwrap();
    let text = Writer::new(
        WriterOptions::default()
            .with_skip_private(true)
            .with_header_footer(true),
    )
    .write_string(&store)
    .unwrap();
    insta::assert_snapshot!(text, @r#"
# List of configuration properties

#@configuration Detector setup

#@description Active layers
layers : boolean[12] = \
 true true true false false false true true true false \
 false false

#@enable_real_with_unit
offsets : real[2] in cm = \
 1 \
 2.5
#@disable_real_with_unit

label : string = "detector"

# End of list of configuration properties
"#);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.conf");
    let store = parse_str("a : integer[3] = 1 2 3\nb : string as path = \"/tmp/x\"\n").unwrap();
    Writer::default().write_path(&path, &store).unwrap();
    let read = Reader::new().read_path(&path).unwrap();
    assert_eq!(read.store, store);
}
