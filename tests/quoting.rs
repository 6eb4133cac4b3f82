use anyhow::Result;
use ironsplit::testing::*;
use ironsplit::*;
use std::fs;

const TRICKY: &str = "id,text\n1,plain\n2,\"comma, inside\"\n3,\"say \"\"hi\"\"\"\n";

fn split_with(dir: &std::path::Path, format: OutputFormat) -> Result<RunResult> {
    let input = write_csv_fixture(dir, "tricky.csv", TRICKY)?;
    let request = SplitRequest::new(&input, dir.join("out")).with_format(format);
    run_split(&request, &CancelToken::new(), &mut ())
}

#[test]
fn minimal_quoting_quotes_only_when_needed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let result = split_with(dir.path(), OutputFormat::default())?;

    let text = fs::read_to_string(&result.parts[0].path)?;
    assert_eq!(
        text,
        "id,text\r\n1,plain\r\n2,\"comma, inside\"\r\n3,\"say \"\"hi\"\"\"\r\n"
    );
    Ok(())
}

#[test]
fn all_quoting_quotes_every_field() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let result = split_with(
        dir.path(),
        OutputFormat::Delimited {
            delimiter: b',',
            quoting: Quoting::All,
        },
    )?;

    let text = fs::read_to_string(&result.parts[0].path)?;
    assert!(text.starts_with("\"id\",\"text\"\r\n\"1\",\"plain\"\r\n"));
    let records = read_delimited_part(&result.parts[0].path, b',')?;
    assert_eq!(records[2], vec!["2", "comma, inside"]);
    Ok(())
}

#[test]
fn no_quoting_fails_on_a_field_that_needs_it() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = split_with(
        dir.path(),
        OutputFormat::Delimited {
            delimiter: b',',
            quoting: Quoting::None,
        },
    )
    .unwrap_err();

    assert!(matches!(
        err.root_cause().downcast_ref::<SplitError>(),
        Some(SplitError::UnquotableField { column }) if column == "text"
    ));
    assert_eq!(categorize(&err), ErrorCategory::Write);
    Ok(())
}

#[test]
fn no_quoting_writes_clean_data_verbatim() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "clean.csv", "a,b\nx y,1\n")?;
    let request = SplitRequest::new(&input, dir.path().join("out")).with_format(
        OutputFormat::Delimited {
            delimiter: b';',
            quoting: Quoting::None,
        },
    );

    let result = run_split(&request, &CancelToken::new(), &mut ())?;

    assert_eq!(fs::read_to_string(&result.parts[0].path)?, "a;b\r\nx y;1\r\n");
    Ok(())
}

#[test]
fn tab_output_from_comma_input() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let result = split_with(
        dir.path(),
        OutputFormat::Delimited {
            delimiter: b'\t',
            quoting: Quoting::Minimal,
        },
    )?;

    let records = read_delimited_part(&result.parts[0].path, b'\t')?;
    assert_eq!(records[2], vec!["2", "comma, inside"]);
    assert_eq!(records[3], vec!["3", "say \"hi\""]);
    Ok(())
}
