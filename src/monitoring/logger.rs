use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use crate::execution::runner::RunOutcome;

pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(
                file,
                "timestamp,source,matches,streak,threshold,mode,notified"
            )?;
        }

        Ok(Self { log_path })
    }

    /// Log one completed run
    pub fn log_run(&self, outcome: &RunOutcome) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            Utc::now().to_rfc3339(),
            outcome.source_url.replace(',', "%2C"),
            outcome.matches,
            outcome.streak,
            outcome.threshold,
            outcome.mode,
            outcome.notified
        )?;

        Ok(())
    }

    /// Log a failed run
    pub fn log_failure(&self, error: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        writeln!(
            file,
            "{},ERROR {},,,,,",
            Utc::now().to_rfc3339(),
            error.replace([',', '\n'], " ")
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::types::AlertMode;

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv").to_string_lossy().to_string();

        let outcome = RunOutcome {
            source_url: "http://www.90minut.pl/liga/1/liga14072.html".to_string(),
            matches: 90,
            streak: 8,
            threshold: 7,
            mode: AlertMode::Each,
            notified: true,
        };

        CsvLogger::new(path.clone()).unwrap().log_run(&outcome).unwrap();
        let logger = CsvLogger::new(path.clone()).unwrap();
        logger.log_failure("HTTP 403, retry").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,source,matches,streak,threshold,mode,notified");
        assert!(lines[1].ends_with(",http://www.90minut.pl/liga/1/liga14072.html,90,8,7,EACH,true"));
        assert!(lines[2].contains(",ERROR HTTP 403  retry,"));
    }
}
