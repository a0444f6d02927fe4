use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use msj_core::OutputRecord;

use crate::config::OutputFormat;
use crate::job::PartitionOutput;
use crate::PipelineError;

pub fn part_file_name(index: usize) -> String {
    format!("part-m-{index:05}")
}

pub fn render(record: &OutputRecord, format: OutputFormat) -> Result<String, PipelineError> {
    Ok(match format {
        OutputFormat::Text => record.to_text_line(),
        OutputFormat::JsonLines => record.to_json_line()?,
    })
}

pub fn write_records<W: Write>(
    writer: &mut W,
    target: &str,
    records: &[OutputRecord],
    format: OutputFormat,
) -> Result<(), PipelineError> {
    let io_err = |source: io::Error| PipelineError::Output {
        target: target.to_string(),
        source,
    };
    for record in records {
        writeln!(writer, "{}", render(record, format)?).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

/// Write one `part-m-NNNNN` file per partition into `dir`, or everything to
/// stdout when no directory is given. Returns the files written.
pub fn write_partitions(
    outputs: &[PartitionOutput],
    dir: Option<&Path>,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, PipelineError> {
    let Some(dir) = dir else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for out in outputs {
            write_records(&mut handle, "stdout", &out.records, format)?;
        }
        return Ok(Vec::new());
    };

    let target = dir.display().to_string();
    fs::create_dir_all(dir).map_err(|source| PipelineError::Output {
        target: target.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(outputs.len());
    for out in outputs {
        let path = dir.join(part_file_name(out.partition.index));
        let label = path.display().to_string();
        let file = File::create(&path).map_err(|source| PipelineError::Output {
            target: label.clone(),
            source,
        })?;
        write_records(&mut BufWriter::new(file), &label, &out.records, format)?;
        info!(path = %label, records = out.records.len(), "partition output written");
        written.push(path);
    }
    Ok(written)
}
