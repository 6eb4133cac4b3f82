use anyhow::Result;
use ironsplit::io::compression::{CompressionCodec, register_codec};
use ironsplit::testing::*;
use ironsplit::*;
use std::io::Read;
use std::sync::Arc;

/// Frames plain text behind a 4-byte signature.
struct FramedCodec;

impl CompressionCodec for FramedCodec {
    fn name(&self) -> &str {
        "framed"
    }

    fn extensions(&self) -> &[&str] {
        &[".framed"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(b"FRM1")
    }

    fn wrap_reader_dyn(&self, mut reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        Ok(reader)
    }
}

#[test]
fn registered_codec_decodes_input() -> Result<()> {
    register_codec(Arc::new(FramedCodec));
    let dir = tempfile::tempdir()?;
    let body = format!("FRM1{}", numbered_csv(4));
    let input = write_csv_fixture(dir.path(), "wrapped.dat", &body)?;
    let request = SplitRequest::new(&input, dir.path().join("out")).with_logging(false);

    let result = run_split(&request, &CancelToken::new(), &mut ())?;

    let records = read_delimited_part(&result.parts[0].path, b',')?;
    assert_eq!(records[0], vec!["id", "name", "amount"]);
    assert_eq!(result.total_output_rows, 4);
    Ok(())
}

#[cfg(any(feature = "compression-gzip", feature = "compression-zstd"))]
mod compression_tests {
    use anyhow::Result;
    use ironsplit::testing::*;
    use ironsplit::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    #[cfg(feature = "compression-gzip")]
    fn write_gzip(path: &Path, text: &str) -> Result<PathBuf> {
        let mut enc = flate2::write::GzEncoder::new(File::create(path)?, flate2::Compression::default());
        enc.write_all(text.as_bytes())?;
        enc.finish()?;
        Ok(path.to_path_buf())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_input_is_split_like_plain_text() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = write_gzip(&dir.path().join("orders.csv.gz"), &numbered_csv(30))?;
        let out = dir.path().join("out");
        let request = SplitRequest::new(&input, &out).with_partition(PartitionMode::ByRowCount, 10);

        let result = run_split(&request, &CancelToken::new(), &mut ())?;

        assert_eq!(result.part_row_counts(), vec![10, 10, 10]);
        assert_eq!(result.parts[0].path, out.join("orders_1.csv"));
        let records = read_delimited_part(&result.parts[2].path, b',')?;
        assert_eq!(records[1][0], "21");
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_is_recognised_by_magic_bytes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = write_gzip(&dir.path().join("disguised.txt"), "a;b\n1;2\n3;4\n")?;
        let request = SplitRequest::new(&input, dir.path().join("out"));

        let result = run_split(&request, &CancelToken::new(), &mut ())?;

        let records = read_delimited_part(&result.parts[0].path, b',')?;
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]);
        Ok(())
    }

    #[cfg(feature = "compression-zstd")]
    #[test]
    fn zstd_json_input() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("events.json.zst");
        let body = br#"[{"id":1,"kind":"open"},{"id":2,"kind":"close"}]"#;
        std::fs::write(&path, zstd::encode_all(&body[..], 3)?)?;
        let request = SplitRequest::new(&path, dir.path().join("out"));

        let result = run_split(&request, &CancelToken::new(), &mut ())?;

        let records = read_delimited_part(&result.parts[0].path, b',')?;
        assert_eq!(records[0], vec!["id", "kind"]);
        assert_eq!(records[2], vec!["2", "close"]);
        assert_eq!(result.parts[0].path.file_name().and_then(|n| n.to_str()), Some("events_1.csv"));
        Ok(())
    }
}
