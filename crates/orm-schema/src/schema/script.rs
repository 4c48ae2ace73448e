//! Script files: reading command sources and writing generated DDL.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::settings::{self, Settings};
use crate::error::{OrmError, Result};

/// Character encoding of script files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Charset {
    /// Resolve `hibernate.hbm2ddl.charset_name`; absent means UTF-8.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::from_name(settings.get_str(settings::HBM2DDL_CHARSET_NAME).as_deref())
    }

    pub fn from_name(name: Option<&str>) -> Result<Self> {
        let Some(name) = name else {
            return Ok(Charset::Utf8);
        };
        match name.trim().to_uppercase().replace('_', "-").as_str() {
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            "ISO-8859-1" | "LATIN1" | "LATIN-1" => Ok(Charset::Latin1),
            "US-ASCII" | "ASCII" => Ok(Charset::Ascii),
            _ => Err(OrmError::Config(format!("Unsupported charset: {}", name))),
        }
    }

    pub fn decode(self, bytes: Vec<u8>) -> Result<String> {
        match self {
            Charset::Utf8 => String::from_utf8(bytes)
                .map_err(|e| invalid_data(format!("script is not valid UTF-8: {}", e))),
            Charset::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
            Charset::Ascii => {
                if let Some(b) = bytes.iter().find(|b| !b.is_ascii()) {
                    return Err(invalid_data(format!("byte 0x{:02x} is not US-ASCII", b)));
                }
                Ok(bytes.into_iter().map(char::from).collect())
            }
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let limit = match self {
            Charset::Utf8 => return Ok(text.as_bytes().to_vec()),
            Charset::Latin1 => 0xFF,
            Charset::Ascii => 0x7F,
        };
        text.chars()
            .map(|c| {
                u8::try_from(u32::from(c))
                    .ok()
                    .filter(|b| u32::from(*b) <= limit)
                    .ok_or_else(|| invalid_data(format!("'{}' cannot be encoded as {:?}", c, self)))
            })
            .collect()
    }
}

fn invalid_data(message: String) -> OrmError {
    OrmError::Io(io::Error::new(io::ErrorKind::InvalidData, message))
}

// ===== Sources =====

/// A script to read commands from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSourceInput {
    File { path: PathBuf, charset: Charset },
    Text(String),
}

impl ScriptSourceInput {
    pub fn from_file(path: impl Into<PathBuf>, charset: Charset) -> Self {
        ScriptSourceInput::File {
            path: path.into(),
            charset,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        ScriptSourceInput::Text(text.into())
    }

    pub fn exists(&self) -> bool {
        match self {
            ScriptSourceInput::File { path, .. } => path.is_file(),
            ScriptSourceInput::Text(_) => true,
        }
    }

    /// Read the script and split it into commands.
    pub fn read(&self, extractor: &SqlScriptCommandExtractorImpl) -> Result<Vec<String>> {
        let script = match self {
            ScriptSourceInput::File { path, charset } => {
                debug!("Reading script source {}", path.display());
                let bytes = std::fs::read(path).map_err(|e| {
                    OrmError::schema_management(format!(
                        "Unable to read script source file [{}]: {}",
                        path.display(),
                        e
                    ))
                })?;
                charset.decode(bytes)?
            }
            ScriptSourceInput::Text(text) => text.clone(),
        };
        extractor.extract_commands(&script)
    }
}

impl fmt::Display for ScriptSourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptSourceInput::File { path, .. } => write!(f, "file({})", path.display()),
            ScriptSourceInput::Text(_) => f.write_str("text"),
        }
    }
}

// ===== Command extraction =====

/// Splits script text into individual commands.
pub trait SqlScriptCommandExtractor {
    fn extract_commands(&self, script: &str) -> Result<Vec<String>>;
}

/// One command per line. Comment lines and blank lines are skipped and a
/// trailing `;` is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLineSqlScriptExtractor;

impl SqlScriptCommandExtractor for SingleLineSqlScriptExtractor {
    fn extract_commands(&self, script: &str) -> Result<Vec<String>> {
        Ok(script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_comment_line(line))
            .map(|line| line.strip_suffix(';').unwrap_or(line).trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with("--") || line.starts_with("//") || line.starts_with("/*")
}

/// Commands terminated by `;` that may span lines. Comments are stripped,
/// quoted text is kept verbatim and whitespace is collapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiLineSqlScriptExtractor;

impl SqlScriptCommandExtractor for MultiLineSqlScriptExtractor {
    fn extract_commands(&self, script: &str) -> Result<Vec<String>> {
        let mut commands = Vec::new();
        let mut current = String::new();
        let mut chars = script.chars().peekable();

        fn push_space(current: &mut String) {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
        }

        while let Some(c) = chars.next() {
            match c {
                '-' if chars.peek() == Some(&'-') => {
                    for skipped in chars.by_ref() {
                        if skipped == '\n' {
                            break;
                        }
                    }
                    push_space(&mut current);
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut previous = '\0';
                    for skipped in chars.by_ref() {
                        if previous == '*' && skipped == '/' {
                            break;
                        }
                        previous = skipped;
                    }
                    push_space(&mut current);
                }
                '\'' | '"' => {
                    current.push(c);
                    while let Some(q) = chars.next() {
                        current.push(q);
                        if q == c {
                            // doubled quote is an escaped quote
                            if chars.peek() == Some(&c) {
                                if let Some(escaped) = chars.next() {
                                    current.push(escaped);
                                }
                            } else {
                                break;
                            }
                        }
                    }
                }
                ';' => {
                    let command = current.trim();
                    if !command.is_empty() {
                        commands.push(command.to_string());
                    }
                    current.clear();
                }
                c if c.is_whitespace() => push_space(&mut current),
                c => current.push(c),
            }
        }

        if !current.trim().is_empty() {
            return Err(OrmError::schema_management(format!(
                "Import script SQL statements must terminate with a ';' char [{}]",
                current.trim()
            )));
        }
        Ok(commands)
    }
}

/// Extractor selection, per `hibernate.hbm2ddl.import_files_sql_extractor`.
#[derive(Debug, Clone, Copy)]
pub enum SqlScriptCommandExtractorImpl {
    SingleLine(SingleLineSqlScriptExtractor),
    MultiLine(MultiLineSqlScriptExtractor),
}

impl Default for SqlScriptCommandExtractorImpl {
    fn default() -> Self {
        SqlScriptCommandExtractorImpl::MultiLine(MultiLineSqlScriptExtractor)
    }
}

impl SqlScriptCommandExtractorImpl {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let Some(name) = settings.get_str(settings::HBM2DDL_IMPORT_FILES_SQL_EXTRACTOR) else {
            return Ok(Self::default());
        };
        match name.to_lowercase().as_str() {
            "single-line" | "singleline" | "singlelinesqlcommandextractor" => Ok(
                SqlScriptCommandExtractorImpl::SingleLine(SingleLineSqlScriptExtractor),
            ),
            "multi-line" | "multiline" | "multiplelinessqlcommandextractor" => Ok(
                SqlScriptCommandExtractorImpl::MultiLine(MultiLineSqlScriptExtractor),
            ),
            _ => Err(OrmError::Config(format!(
                "Unknown import script command extractor: '{}'. Supported: single-line, multi-line",
                name
            ))),
        }
    }

    fn inner(&self) -> &dyn SqlScriptCommandExtractor {
        match self {
            SqlScriptCommandExtractorImpl::SingleLine(e) => e,
            SqlScriptCommandExtractorImpl::MultiLine(e) => e,
        }
    }
}

impl SqlScriptCommandExtractor for SqlScriptCommandExtractorImpl {
    fn extract_commands(&self, script: &str) -> Result<Vec<String>> {
        self.inner().extract_commands(script)
    }
}

// ===== Outputs =====

enum Destination {
    File { path: PathBuf, append: bool },
    Writer,
}

/// Where script commands are written, one per line.
pub struct ScriptTargetOutput {
    destination: Destination,
    charset: Charset,
    writer: Option<Box<dyn Write + Send>>,
}

impl ScriptTargetOutput {
    /// A file opened on [`prepare`](Self::prepare).
    pub fn to_file(path: impl Into<PathBuf>, charset: Charset, append: bool) -> Self {
        Self {
            destination: Destination::File {
                path: path.into(),
                append,
            },
            charset,
            writer: None,
        }
    }

    pub fn to_writer(writer: impl Write + Send + 'static, charset: Charset) -> Self {
        Self {
            destination: Destination::Writer,
            charset,
            writer: Some(Box::new(writer)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.destination {
            Destination::File { path, .. } => Some(path),
            Destination::Writer => None,
        }
    }

    pub fn prepare(&mut self) -> Result<()> {
        if let Destination::File { path, append } = &self.destination {
            let file = open_script_file(path, *append).map_err(|e| {
                OrmError::schema_management(format!(
                    "Unable to open specified script target file [{}] for writing: {}",
                    path.display(),
                    e
                ))
            })?;
            self.writer = Some(Box::new(BufWriter::new(file)));
        }
        Ok(())
    }

    pub fn accept(&mut self, command: &str) -> Result<()> {
        let bytes = self.charset.encode(command)?;
        let writer = self.writer.as_mut().ok_or_else(|| {
            OrmError::IllegalState("script target output was not prepared".to_string())
        })?;
        writer
            .write_all(&bytes)
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| {
                OrmError::command_acceptance(
                    format!("Could not write \"{}\" to target script file", command),
                    command,
                    Some(OrmError::Io(e)),
                )
            })
    }

    pub fn release(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        if matches!(self.destination, Destination::File { .. }) {
            self.writer = None;
        }
        Ok(())
    }
}

fn open_script_file(path: &Path, append: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path)
}

impl fmt::Debug for ScriptTargetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ScriptTargetOutput");
        match &self.destination {
            Destination::File { path, append } => {
                s.field("path", path).field("append", append);
            }
            Destination::Writer => {
                s.field("writer", &"<writer>");
            }
        }
        s.field("charset", &self.charset).finish()
    }
}
