//
// ──────────────────────────────────────────────────────────────────────────────
//  OUTPUT
// ──────────────────────────────────────────────────────────────────────────────
//
// Labels leave the process twice:
//   - a human summary for whoever reads the job log
//   - a sink that hands each label to the invoking pipeline
//
// Sinks only see name/value pairs in mapping order, so a new pipeline
// convention is a new OutputSink and nothing else changes.
//

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use minijinja::{Environment, context};
use serde_json::{Map, Value};
use snafu::prelude::*;

use crate::{error::*, resolver::BuildMetadata};

pub trait OutputSink {
    fn emit(&mut self, name: &str, value: &str) -> Result<()>;

    /// Called once after the last label.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn emit_all(sink: &mut dyn OutputSink, metadata: &BuildMetadata) -> Result<()> {
    for (name, value) in metadata.labels() {
        sink.emit(name, value)?;
    }
    sink.finish()
}

/// Writes the operator-facing summary followed by a blank line.
pub fn write_summary<W: Write>(out: &mut W, metadata: &BuildMetadata) -> io::Result<()> {
    let lines = [
        ("Stable build:", metadata.is_stable_str()),
        ("Timestamp:", metadata.timestamp.as_str()),
        ("Git SHA:", metadata.git_sha.as_str()),
        ("Git branch:", metadata.git_branch.as_str()),
        ("Helm Suffix:", metadata.helm.as_str()),
        ("Docker Suffix:", metadata.docker.as_str()),
    ];

    for (label, value) in lines {
        writeln!(out, "{label:<14} {value}")?;
    }
    writeln!(out)
}

// ── set-output ───────────────────────────────────────────────────────────────

/// `::set-output name=<name>::<value>` workflow commands.
pub struct SetOutputSink<W> {
    out: W,
}

impl<W: Write> SetOutputSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> OutputSink for SetOutputSink<W> {
    fn emit(&mut self, name: &str, value: &str) -> Result<()> {
        writeln!(self.out, "::set-output name={name}::{value}")
            .context(WriteOutputSnafu { target: "stdout" })
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context(WriteOutputSnafu { target: "stdout" })
    }
}

// ── github-output ────────────────────────────────────────────────────────────

/// `<name>=<value>` lines, as read back from a GITHUB_OUTPUT file.
pub struct KeyValueSink<W> {
    out: W,
    target: String,
}

impl<W: Write> KeyValueSink<W> {
    pub fn new(out: W, target: impl Into<String>) -> Self {
        Self {
            out,
            target: target.into(),
        }
    }
}

impl KeyValueSink<AppendFile> {
    /// Checks `path` now but only opens it on the first label, so a run that
    /// fails earlier leaves no file behind.
    pub fn append(path: &Path) -> Result<Self> {
        let target = path.display().to_string();
        let file = AppendFile::new(path).context(WriteOutputSnafu {
            target: target.as_str(),
        })?;
        Ok(Self::new(file, target))
    }
}

/// Append-only file handle opened on first write. Earlier workflow steps may
/// already have written to it.
pub struct AppendFile {
    path: PathBuf,
    file: Option<File>,
}

impl AppendFile {
    pub fn new(path: &Path) -> io::Result<Self> {
        if path.exists() {
            // existing file must be writable; append never truncates
            OpenOptions::new().append(true).open(path)?;
        } else {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            if !parent.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: None,
        })
    }

    fn file(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        Ok(self.file.insert(file))
    }
}

impl Write for AppendFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> OutputSink for KeyValueSink<W> {
    fn emit(&mut self, name: &str, value: &str) -> Result<()> {
        writeln!(self.out, "{name}={value}").context(WriteOutputSnafu {
            target: self.target.as_str(),
        })
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context(WriteOutputSnafu {
            target: self.target.as_str(),
        })
    }
}

// ── json ─────────────────────────────────────────────────────────────────────

/// Collects every label, then writes a single JSON object.
pub struct JsonSink<W> {
    out: W,
    labels: Map<String, Value>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            labels: Map::new(),
        }
    }
}

impl<W: Write> OutputSink for JsonSink<W> {
    fn emit(&mut self, name: &str, value: &str) -> Result<()> {
        self.labels
            .insert(name.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let labels = std::mem::take(&mut self.labels);
        serde_json::to_writer_pretty(&mut self.out, &Value::Object(labels))
            .context(SerializeOutputsSnafu)?;
        writeln!(self.out).context(WriteOutputSnafu { target: "stdout" })?;
        self.out.flush().context(WriteOutputSnafu { target: "stdout" })
    }
}

// ── template ─────────────────────────────────────────────────────────────────

/// Renders each label through a user template with `name` and `value` in scope.
pub struct TemplateSink<W> {
    out: W,
    env: Environment<'static>,
}

const LINE_TEMPLATE: &str = "line";

impl<W: Write> TemplateSink<W> {
    /// Compiles `source` immediately so a broken template fails before git runs.
    pub fn new(out: W, source: &str) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template_owned(LINE_TEMPLATE, source.to_string())
            .context(InvalidTemplateSnafu)?;
        Ok(Self { out, env })
    }
}

impl<W: Write> OutputSink for TemplateSink<W> {
    fn emit(&mut self, name: &str, value: &str) -> Result<()> {
        let tmpl = self
            .env
            .get_template(LINE_TEMPLATE)
            .context(InvalidTemplateSnafu)?;
        let line = tmpl
            .render(context! { name => name, value => value })
            .context(RenderTemplateSnafu { name })?;
        writeln!(self.out, "{line}").context(WriteOutputSnafu { target: "stdout" })
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context(WriteOutputSnafu { target: "stdout" })
    }
}
