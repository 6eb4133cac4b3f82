use anyhow::Result;
use ironsplit::testing::*;
use ironsplit::*;
use std::collections::BTreeMap;

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn projection_keeps_header_order_and_renames() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(3))?;
    let request = SplitRequest::new(&input, dir.path().join("out"))
        .with_columns(["amount", "id"])
        .with_rename("amount", "total")
        .with_rename("name", "ignored because excluded");

    let result = run_split(&request, &CancelToken::new(), &mut ())?;

    let records = read_delimited_part(&result.parts[0].path, b',')?;
    assert_eq!(records[0], vec!["id", "total"]);
    assert_eq!(records[1], vec!["1", "3.01"]);
    assert_eq!(result.columns.included, vec!["id", "amount"]);
    assert_eq!(result.columns.excluded, vec!["name"]);
    assert_eq!(
        result.columns.renamed,
        vec![("amount".to_string(), "total".to_string())]
    );
    Ok(())
}

#[test]
fn projection_fills_absent_values() {
    let columns = header(&["a", "b", "c"]);
    let projection = Projection::new(&columns, &header(&["c", "a"]), &BTreeMap::new());
    let row = Row::Object([("a".to_string(), "1".to_string())].into_iter().collect());

    assert_eq!(projection.output_header(), header(&["a", "c"]).as_slice());
    assert_eq!(projection.apply(&row), vec!["1", ""]);
    assert_eq!(projection.excluded(&columns), vec!["b"]);
}

#[test]
fn unknown_column_is_rejected_before_any_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(3))?;
    let out = dir.path().join("out");
    let request = SplitRequest::new(&input, &out).with_columns(["id", "missing"]);

    let err = run_split(&request, &CancelToken::new(), &mut ()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SplitError>(),
        Some(SplitError::InvalidRequest(_))
    ));
    assert_eq!(categorize(&err), ErrorCategory::Configuration);
    assert!(!out.exists());
    Ok(())
}

#[test]
fn request_validation_rules() {
    let columns = header(&["a", "b", "c"]);
    let base = SplitRequest::new("in.csv", "out");

    assert!(base.validate(&columns).is_ok());
    assert!(
        base.clone()
            .with_partition(PartitionMode::ByRowCount, 0)
            .validate(&columns)
            .is_err()
    );
    assert!(
        base.clone()
            .with_columns(Vec::<String>::new())
            .validate(&columns)
            .is_err()
    );
    assert!(
        base.clone()
            .with_rename("a", "b")
            .validate(&columns)
            .is_err(),
        "rename onto another included column"
    );
    assert!(
        base.clone()
            .with_columns(["a", "c"])
            .with_rename("a", "b")
            .validate(&columns)
            .is_ok(),
        "rename onto an excluded column name"
    );
    assert!(base.clone().with_rename("a", "").validate(&columns).is_err());
    assert!(
        base.clone()
            .with_format(OutputFormat::Delimited {
                delimiter: b'"',
                quoting: Quoting::Minimal,
            })
            .validate(&columns)
            .is_err()
    );
    assert!(base.validate(&[]).is_ok(), "empty input has nothing to check");
}

#[test]
fn empty_header_cell_is_split_unchanged() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "blank.csv", "id,,name\n1,x,a\n2,y,b\n")?;
    let request = SplitRequest::new(&input, dir.path().join("out"))
        .with_partition(PartitionMode::ByRowCount, 1);

    let result = run_split(&request, &CancelToken::new(), &mut ())?;

    assert_eq!(result.part_row_counts(), vec![1, 1]);
    let records = read_delimited_part(&result.parts[1].path, b',')?;
    assert_eq!(records, vec![vec!["id", "", "name"], vec!["2", "y", "b"]]);
    assert!(
        request
            .clone()
            .with_rename("", "")
            .validate(&header(&["id", "", "name"]))
            .is_err(),
        "an explicit empty rename is still rejected"
    );
    Ok(())
}

#[test]
fn duplicate_input_names_are_made_unique() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "dup.csv", "x,x,y\n1,2,3\n")?;
    let request = SplitRequest::new(&input, dir.path().join("out"))
        .with_columns(["x_2", "y"]);

    let result = run_split(&request, &CancelToken::new(), &mut ())?;

    let records = read_delimited_part(&result.parts[0].path, b',')?;
    assert_eq!(records, vec![vec!["x_2", "y"], vec!["2", "3"]]);
    Ok(())
}

#[test]
fn short_and_long_rows_are_tolerated() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "ragged.csv", "a,b,c\n1,2\n4,5,6,7\n")?;
    let request = SplitRequest::new(&input, dir.path().join("out"));

    let result = run_split(&request, &CancelToken::new(), &mut ())?;

    let records = read_delimited_part(&result.parts[0].path, b',')?;
    assert_eq!(records[1], vec!["1", "2", ""]);
    assert_eq!(records[2], vec!["4", "5", "6"]);
    Ok(())
}

#[test]
fn explicit_full_selection_matches_default() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(40))?;
    let implicit = SplitRequest::new(&input, dir.path().join("implicit")).with_logging(false);
    let explicit = SplitRequest::new(&input, dir.path().join("explicit"))
        .with_columns(["id", "name", "amount"])
        .with_logging(false);

    let a = run_split(&implicit, &CancelToken::new(), &mut ())?;
    let b = run_split(&explicit, &CancelToken::new(), &mut ())?;

    assert_eq!(
        std::fs::read(&a.parts[0].path)?,
        std::fs::read(&b.parts[0].path)?
    );
    Ok(())
}
