use anyhow::Result;
use ironsplit::report::{LOG_FILE_NAME, log_path, render_record};
use ironsplit::testing::*;
use ironsplit::*;
use std::fs;

#[test]
fn completed_run_logs_a_passing_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "sales.csv", &numbered_csv(250))?;
    let out = dir.path().join("out");
    let request = SplitRequest::new(&input, &out)
        .with_partition(PartitionMode::ByRowCount, 100)
        .with_columns(["id", "amount"])
        .with_rename("amount", "total");

    run_split(&request, &CancelToken::new(), &mut ())?;

    let log = fs::read_to_string(out.join(LOG_FILE_NAME))?;
    assert!(log.starts_with('\n'));
    assert!(log.contains("Status:           COMPLETED"));
    assert!(log.contains("Split by:         rows = 100"));
    assert!(log.contains("Columns excluded: 1 (name)"));
    assert!(log.contains("Columns renamed:  amount -> total"));
    assert!(log.contains("sales_1.csv: 100 rows"));
    assert!(log.contains("sales_3.csv: 50 rows"));
    assert!(log.contains("Total input rows:  250"));
    assert!(log.contains("Total output rows: 250"));
    assert!(log.contains("Validation:       PASS"));
    Ok(())
}

#[test]
fn runs_append_to_the_same_log() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(10))?;
    let request = SplitRequest::new(&input, dir.path().join("out"));

    run_split(&request, &CancelToken::new(), &mut ())?;
    let first = fs::read_to_string(log_path(&request))?;
    run_split(&request, &CancelToken::new(), &mut ())?;
    let second = fs::read_to_string(log_path(&request))?;

    assert!(second.starts_with(&first));
    assert_eq!(second.matches("Validation:       PASS").count(), 2);
    Ok(())
}

#[test]
fn logging_can_be_disabled() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(10))?;
    let request = SplitRequest::new(&input, dir.path().join("out")).with_logging(false);

    run_split(&request, &CancelToken::new(), &mut ())?;

    assert!(!log_path(&request).exists());
    Ok(())
}

#[test]
fn reduced_part_count_is_noted() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(2))?;
    let request = SplitRequest::new(&input, dir.path().join("out"))
        .with_partition(PartitionMode::ByPartCount, 5)
        .with_logging(false);

    let result = run_split(&request, &CancelToken::new(), &mut ())?;
    let record = render_record(&request, &result);

    assert!(record.contains("5 parts requested, reduced to 2"));
    assert!(record.contains("(row limit 1)"));
    Ok(())
}

#[test]
fn json_output_omits_delimited_settings() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_csv_fixture(dir.path(), "data.csv", &numbered_csv(3))?;
    let request = SplitRequest::new(&input, dir.path().join("out"))
        .with_format(OutputFormat::Json)
        .with_logging(false);

    let result = run_split(&request, &CancelToken::new(), &mut ())?;
    let record = render_record(&request, &result);

    assert!(record.contains("Output format:    json"));
    assert!(!record.contains("Quoting:"));
    assert!(!record.contains("Header retained:"));
    Ok(())
}
