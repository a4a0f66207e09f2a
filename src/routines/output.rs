use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;

use crate::algorithms::Status;
use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

/// Summary of a single iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    iteration: usize,
    distance: f64,
    step_size: f64,
    weights: Option<Vec<f64>>,
}

impl IterationRecord {
    pub fn new(iteration: usize, distance: f64, step_size: f64, weights: Option<Vec<f64>>) -> Self {
        Self {
            iteration,
            distance,
            step_size,
            weights,
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }
}

/// Holds the [IterationRecord] of every completed iteration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IterationHistory {
    records: Vec<IterationRecord>,
}

impl IterationHistory {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Writes `history.csv` into the output folder.
    pub fn write(&self, settings: &Settings) -> Result<()> {
        tracing::debug!("Writing iteration history...");
        let outputfile = OutputFile::new(&settings.output.path, "history.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(&outputfile.file);

        writer.write_field("iteration")?;
        writer.write_field("distance")?;
        writer.write_field("step_size")?;
        let n = self
            .records
            .first()
            .and_then(|record| record.weights.as_ref().map(|w| w.len()))
            .unwrap_or(0);
        for i in 0..n {
            writer.write_field(format!("w.{}", i))?;
        }
        writer.write_record(None::<&[u8]>)?;

        for record in &self.records {
            writer.write_field(format!("{}", record.iteration))?;
            writer.write_field(format!("{}", record.distance))?;
            writer.write_field(format!("{}", record.step_size))?;
            if let Some(weights) = &record.weights {
                for value in weights {
                    writer.write_field(format!("{}", value))?;
                }
            }
            writer.write_record(None::<&[u8]>)?;
        }
        writer.flush()?;
        tracing::debug!("History written to {:?}", &outputfile.relative_path());
        Ok(())
    }
}

/// Result of a projection run.
///
/// A [ProjResult] contains the terminal status, the squared distance to the
/// hull, the final weights, and the per-iteration history.
#[derive(Debug, Serialize)]
pub struct ProjResult {
    status: Status,
    distance: f64,
    iterations: usize,
    weights: Weights,
    history: IterationHistory,
    settings: Settings,
}

impl ProjResult {
    pub fn new(
        status: Status,
        distance: f64,
        iterations: usize,
        weights: Weights,
        history: IterationHistory,
        settings: Settings,
    ) -> Self {
        Self {
            status,
            distance,
            iterations,
            weights,
            history,
            settings,
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn history(&self) -> &IterationHistory {
        &self.history
    }

    pub fn converged(&self) -> bool {
        self.status.converged()
    }

    pub fn write_outputs(&self) -> Result<()> {
        if self.settings.output.write {
            tracing::debug!("Writing outputs to {:?}", self.settings.output.path);
            self.settings.write()?;
            self.history
                .write(&self.settings)
                .context("Failed to write iteration history")?;
            self.write_weights().context("Failed to write weights")?;
        }
        Ok(())
    }

    /// Writes the final weights to `weights.csv`, one coordinate per row.
    pub fn write_weights(&self) -> Result<()> {
        tracing::debug!("Writing weights...");
        let outputfile = OutputFile::new(&self.settings.output.path, "weights.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(&outputfile.file);

        writer.write_record(["index", "weight"])?;
        for (i, value) in self.weights.iter().enumerate() {
            writer.write_record([i.to_string(), value.to_string()])?;
        }
        writer.flush()?;
        tracing::debug!("Weights written to {:?}", &outputfile.relative_path());
        Ok(())
    }
}

/// Contains all the necessary information of an output file
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .with_context(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn relative_path(&self) -> &PathBuf {
        &self.relative_path
    }

    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        (&self.file)
            .write_all(bytes)
            .with_context(|| format!("Failed to write to file: {:?}", self.relative_path))
    }

    pub fn into_file(self) -> File {
        self.file
    }
}
