mod common;

use enclaveml_tokenize::BatchTokenizer;

fn tokenize(tokenizer: &BatchTokenizer, input: &str) -> String {
    let mut out = Vec::new();
    tokenizer.run(input.as_bytes(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn review_and_empty_line_yield_one_output_line() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_tokenizer(tmp.path());
    let tokenizer = BatchTokenizer::from_dir(tmp.path()).unwrap();

    let out = tokenize(&tokenizer, "This movie is absolutely fantastic!\n\n");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["101,104,105,106,107,108,109,102"]);
}

#[test]
fn every_output_line_is_a_comma_separated_integer_list() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_tokenizer(tmp.path());
    let tokenizer = BatchTokenizer::from_dir(tmp.path()).unwrap();

    let out = tokenize(&tokenizer, "Terrible plot.\nunseen words here\n");
    for line in out.lines() {
        assert!(!line.is_empty());
        for id in line.split(',') {
            id.parse::<u32>().expect("token id should be an integer");
        }
    }
    assert_eq!(out.lines().count(), 2);
}

#[test]
fn blank_and_whitespace_lines_are_skipped_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_tokenizer(tmp.path());
    let tokenizer = BatchTokenizer::from_dir(tmp.path()).unwrap();

    let mut out = Vec::new();
    let written = tokenizer
        .run("  \nterrible plot\n\t\nthis movie\n".as_bytes(), &mut out)
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "101,110,111,102\n101,104,105,102\n"
    );
}

#[test]
fn surrounding_whitespace_does_not_change_ids() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_tokenizer(tmp.path());
    let tokenizer = BatchTokenizer::from_dir(tmp.path()).unwrap();

    assert_eq!(
        tokenize(&tokenizer, "   this movie   \r\n"),
        tokenize(&tokenizer, "this movie\n")
    );
}

#[test]
fn unknown_words_map_to_unk() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_tokenizer(tmp.path());
    let tokenizer = BatchTokenizer::from_dir(tmp.path()).unwrap();

    assert_eq!(tokenizer.encode_line("zebra").unwrap(), vec![101, 1, 102]);
}

#[test]
fn empty_input_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_tokenizer(tmp.path());
    let tokenizer = BatchTokenizer::from_dir(tmp.path()).unwrap();

    assert_eq!(tokenize(&tokenizer, ""), "");
}
