use crate::core::constants::ENV_LOG_FILTER;
use crate::core::message::{Message, Role};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the stderr diagnostics subscriber. The filter comes from
/// `POLICYCHAT_LOG` and defaults to `warn` so ordinary runs stay quiet.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_LOG_FILTER).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Plain-text transcript of a chat session, appended as messages settle.
pub struct TranscriptLog {
    file_path: PathBuf,
}

impl TranscriptLog {
    /// Opens (or creates) the log file up front so a bad path fails early.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let file_path = path.into();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;
        Ok(Self { file_path })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        if message.content.is_empty() {
            return Ok(());
        }
        let text = match message.role {
            Role::User => format!("You: {}", message.content),
            Role::Assistant => message.content.clone(),
        };
        self.write_to_log(&text)
    }

    pub fn log_exchange(&self, messages: &[Message]) -> Result<(), Box<dyn std::error::Error>> {
        for message in messages {
            self.log_message(message)?;
        }
        Ok(())
    }

    fn write_to_log(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between messages, as on screen.
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }
}
