use crate::error::LoanResult;
use crate::loan::Schedule;
use log::info;
use std::fs::File;
use std::io;
use std::path::Path;

pub const CSV_HEADERS: [&str; 5] = ["Month", "Payment", "Interest", "Principal", "Balance"];

/// Writes the schedule as CSV, one row per month, amounts to 2 decimals.
pub fn write_csv<W: io::Write>(schedule: &Schedule, writer: W) -> LoanResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;

    for entry in schedule {
        wtr.write_record([
            entry.month.to_string(),
            format!("{:.2}", entry.payment),
            format!("{:.2}", entry.interest),
            format!("{:.2}", entry.principal_paid),
            format!("{:.2}", entry.balance),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file<P: AsRef<Path>>(schedule: &Schedule, path: P) -> LoanResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_csv(schedule, io::BufWriter::new(file))?;
    info!("wrote {} rows to {}", schedule.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_csv, write_csv_file};
    use crate::error::LoanError;
    use crate::loan::{generate, LoanParameters};
    use test_log::test;

    fn csv_text(params: &LoanParameters) -> String {
        let schedule = generate(params).unwrap();
        let mut buf = Vec::new();
        write_csv(&schedule, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_csv() {
        let text = csv_text(&LoanParameters::fixed(30000., 6.8, 10));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 121);
        assert_eq!(lines[0], "Month,Payment,Interest,Principal,Balance");
        assert_eq!(lines[1], "1,345.24,170.00,175.24,29824.76");
        assert_eq!(lines[2], "2,345.24,169.01,176.23,29648.52");
        assert_eq!(lines[120], "120,345.24,1.95,343.30,0.00");
    }

    #[test]
    fn test_write_csv_negative_principal() {
        let text = csv_text(&LoanParameters::income_driven(30000., 6.8, 10, Some(1000.)));
        assert_eq!(text.lines().nth(1), Some("1,100.00,170.00,-70.00,30070.00"));
    }

    #[test]
    fn test_write_csv_file() {
        let schedule = generate(&LoanParameters::fixed(1200., 0., 1)).unwrap();
        let path = std::env::temp_dir().join(format!(
            "loan_schedule_export_{}.csv",
            std::process::id()
        ));

        write_csv_file(&schedule, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text.lines().count(), 13);
        assert_eq!(text.lines().last(), Some("12,100.00,0.00,100.00,0.00"));
    }

    #[test]
    fn test_write_csv_file_bad_path() {
        let schedule = generate(&LoanParameters::fixed(1200., 0., 1)).unwrap();
        let path = std::env::temp_dir()
            .join("loan_schedule_missing_dir")
            .join("nested")
            .join("out.csv");

        assert!(matches!(
            write_csv_file(&schedule, &path),
            Err(LoanError::Io(_))
        ));
    }
}
