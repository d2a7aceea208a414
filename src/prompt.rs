//! Interactive prompts and the sidecar files that remember their last answers.

use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

/// Line-oriented prompt over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks for a value, returning `fallback` when the answer is empty.
    ///
    /// Without a fallback an empty answer writes `required` and asks again.
    /// End of input is an error.
    pub fn ask(&mut self, label: &str, fallback: Option<&str>, required: &str) -> Result<String> {
        loop {
            match fallback {
                Some(fallback) => write!(self.output, "{label} [{fallback}]: ")?,
                None => write!(self.output, "{label}: ")?,
            }
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                bail!("{label}: no input");
            }

            match (answer.trim(), fallback) {
                ("", Some(fallback)) => return Ok(fallback.to_string()),
                ("", None) => writeln!(self.output, "{required}")?,
                (answer, _) => return Ok(answer.to_string()),
            }
        }
    }
}

/// Small file holding the last value entered for a prompt.
pub struct Sidecar {
    path: PathBuf,
}

impl Sidecar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The remembered value, if the file exists and is not blank.
    pub fn load(&self) -> Option<String> {
        let value = fs::read_to_string(&self.path).ok()?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn store(&self, value: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(&self.path, value)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}
