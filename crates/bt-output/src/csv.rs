//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `step_metrics.csv`
//! - `yard_fill.csv`

use std::fs::File;
use std::path::Path;

use bt_core::LossCause;
use csv::Writer;

use crate::writer::OutputWriter;
use crate::{OutputResult, StepRow, YardRow};

/// Writes simulation output to two CSV files.
pub struct CsvWriter {
    steps:    Writer<File>,
    yards:    Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut steps = Writer::from_path(dir.join("step_metrics.csv"))?;
        let mut header: Vec<String> = ["elapsed_secs", "hour", "injected", "exited", "expired", "live", "queued"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        header.extend(LossCause::ALL.iter().map(|c| format!("loss_{}", c.as_str())));
        steps.write_record(&header)?;

        let mut yards = Writer::from_path(dir.join("yard_fill.csv"))?;
        yards.write_record(["second", "yard", "name", "kind", "state", "occupants", "capacity", "fill"])?;

        Ok(Self { steps, yards, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_step(&mut self, row: &StepRow) -> OutputResult<()> {
        let mut record = vec![
            row.elapsed_secs.to_string(),
            row.hour.to_string(),
            row.injected.to_string(),
            row.exited.to_string(),
            row.expired.to_string(),
            row.live.to_string(),
            row.queued.to_string(),
        ];
        record.extend(row.loss_hours.iter().map(|h| format!("{h:.6}")));
        self.steps.write_record(&record)?;
        Ok(())
    }

    fn write_yards(&mut self, rows: &[YardRow]) -> OutputResult<()> {
        for row in rows {
            self.yards.write_record(&[
                row.second.to_string(),
                row.yard.to_string(),
                row.name.clone(),
                row.kind.as_str().to_owned(),
                row.state.as_str().to_owned(),
                row.occupants.to_string(),
                row.capacity.to_string(),
                format!("{:.4}", row.fill),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.steps.flush()?;
        self.yards.flush()?;
        Ok(())
    }
}
