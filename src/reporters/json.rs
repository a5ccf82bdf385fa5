use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::types::HistoryReport;

/// Outputs the report as JSON. Writes to a file if given, otherwise stdout.
pub fn report_json(report: &HistoryReport, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let file = File::create(path)?;
        write_json(report, BufWriter::new(file))?;
        eprintln!("✓ JSON report written to {}", path.display());
    } else {
        let stdout = std::io::stdout();
        write_json(report, BufWriter::new(stdout.lock()))?;
    }
    Ok(())
}

fn write_json<W: Write>(report: &HistoryReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report).map_err(std::io::Error::from)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::build_report;
    use crate::store::tests::record_with;
    use crate::store::HistoryStore;
    use crate::types::ReportMeta;

    #[test]
    fn test_json_shape() {
        let mut store = HistoryStore::new();
        store.insert(record_with(
            "alembic/versions/0001_users.py",
            &[("2024-01-01T10:00:00+02:00", "create table users")],
        ));
        let meta = ReportMeta {
            repo_path: "/repo".to_string(),
            analyzed_at: "2024-06-01T00:00:00+00:00".to_string(),
            file_count: 1,
            filters: Vec::new(),
        };
        let report = build_report(&store, meta);

        let mut buf = Vec::new();
        write_json(&report, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        let top = &value["statistics"]["most_changed_migrations"][0];
        assert_eq!(top["file_path"], "alembic/versions/0001_users.py");
        assert_eq!(top["change_count"], 1);
        assert_eq!(top["first_seen"], "2024-01-01T10:00:00+02:00");
        assert!(top.get("changes").is_none(), "change events are not serialized");
        assert_eq!(value["frequency"]["migrations_per_week"], 1.0);
        assert_eq!(value["meta"]["file_count"], 1);
    }
}
