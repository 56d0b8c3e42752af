//! Generator yielding the lines of a text file.
//!
//! The file is opened in the start hook and closed in the end hook, so every
//! pipeline run reads it from the top. Pulling without a start opens it
//! lazily.

use crate::pipeline::nodes::source::Generator;
use crate::pipeline::value::Value;
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

pub struct LineReader {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    skip_blank: bool,
}

impl LineReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: None,
            skip_blank: false,
        }
    }

    /// Skip lines that are empty after trimming.
    pub fn skip_blank(mut self, skip: bool) -> Self {
        self.skip_blank = skip;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.lines.is_some()
    }

    fn open(&mut self) -> anyhow::Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        self.lines = Some(BufReader::new(file).lines());
        tracing::debug!("LineReader opened {:?}", self.path);
        Ok(())
    }
}

impl Generator for LineReader {
    fn next_item(&mut self) -> anyhow::Result<Option<Value>> {
        if self.lines.is_none() {
            self.open()?;
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        for line in lines.by_ref() {
            let line =
                line.with_context(|| format!("failed to read {}", self.path.display()))?;
            if self.skip_blank && line.trim().is_empty() {
                continue;
            }
            return Ok(Some(Value::Str(line)));
        }
        Ok(None)
    }

    fn on_start(&mut self) -> anyhow::Result<()> {
        self.open()
    }

    fn on_end(&mut self) -> anyhow::Result<()> {
        if self.lines.take().is_some() {
            tracing::debug!("LineReader closed {:?}", self.path);
        }
        Ok(())
    }
}
