pub mod argument;
pub mod command;

use std::{
    fmt::{self, Display, Formatter},
    future::Future,
    io::Write,
    pin::Pin,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use command::{CommandError, CommandManager};
use log::error;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::Mutex,
    time::MissedTickBehavior,
};

// Wrap an async fn into a command callback
#[macro_export]
macro_rules! async_handler {
    ($func: expr) => {
        |manager, args| Box::pin($func(manager, args))
    };
}

pub type ShareablePrompt = Arc<Prompt>;

// Builder for the prompt line, polled on a fixed interval
pub type PromptMessageBuilder =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<String, PromptError>> + Send>> + Send>;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Logger was already initialized")]
    LoggerError(#[from] log::SetLoggerError),
    #[error("End of input stream")]
    EndOfStream,
    #[error("Invalid value: {}", _0)]
    ParseError(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => return Err(format!("Invalid log level: {}", s)),
        })
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

// Per-module log level override, parsed from "module=level"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module: String,
    pub level: LogLevel,
}

impl FromStr for ModuleConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, level) = s
            .split_once('=')
            .ok_or_else(|| format!("Expected 'module=level', got '{}'", s))?;
        Ok(Self {
            module: module.to_owned(),
            level: LogLevel::from_str(level)?,
        })
    }
}

impl Display for ModuleConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.module, self.level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl Color {
    fn ansi_code(&self) -> &'static str {
        match self {
            Color::Red => "31",
            Color::Green => "32",
            Color::Yellow => "33",
            Color::Blue => "34",
            Color::Magenta => "35",
            Color::Cyan => "36",
        }
    }
}

pub struct Prompt {
    interactive: bool,
    disable_colors: bool,
    reader: Mutex<Lines<BufReader<Stdin>>>,
}

impl Prompt {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        level: LogLevel,
        dir_path: &str,
        filename_log: &str,
        disable_file_logging: bool,
        disable_file_log_date_based: bool,
        disable_log_color: bool,
        interactive: bool,
        logs_modules: Vec<ModuleConfig>,
        file_log_level: LogLevel,
    ) -> Result<ShareablePrompt, PromptError> {
        setup_logger(
            level,
            dir_path,
            filename_log,
            disable_file_logging,
            disable_file_log_date_based,
            disable_log_color,
            logs_modules,
            file_log_level,
        )?;

        Ok(Arc::new(Self {
            interactive,
            disable_colors: disable_log_color,
            reader: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }))
    }

    pub fn colorize_string(&self, color: Color, value: &str) -> String {
        if self.disable_colors {
            return value.to_owned();
        }
        format!("\x1b[{}m{}\x1b[0m", color.ansi_code(), value)
    }

    // Print a prompt message and read one trimmed line from stdin
    pub async fn read_input<D: Display>(&self, prompt_message: D) -> Result<String, PromptError> {
        {
            let mut stdout = std::io::stdout();
            write!(stdout, "{}", prompt_message)?;
            stdout.flush()?;
        }

        let mut reader = self.reader.lock().await;
        match reader.next_line().await? {
            Some(line) => Ok(line.trim().to_owned()),
            None => Err(PromptError::EndOfStream),
        }
    }

    pub async fn read<T: FromStr, D: Display>(&self, prompt_message: D) -> Result<T, PromptError>
    where
        T::Err: Display,
    {
        let value = self.read_input(prompt_message).await?;
        value
            .parse()
            .map_err(|e: T::Err| PromptError::ParseError(e.to_string()))
    }

    // Loop until the user answers with one of the accepted values
    pub async fn read_valid_str_value(
        &self,
        prompt_message: String,
        valid: Vec<&str>,
    ) -> Result<String, PromptError> {
        loop {
            let value = self.read_input(&prompt_message).await?.to_lowercase();
            if valid.contains(&value.as_str()) {
                return Ok(value);
            }
        }
    }

    pub async fn ask_confirmation(&self) -> Result<bool, PromptError> {
        let message = self.colorize_string(Color::Yellow, "Confirm? (Y/N): ");
        let value = self.read_valid_str_value(message, vec!["y", "n"]).await?;
        Ok(value == "y")
    }

    fn show_prompt(&self, message: &str) {
        if !self.interactive {
            return;
        }
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\r{}", message);
        let _ = stdout.flush();
    }

    // Interactive loop: dispatch lines to the command manager and keep the
    // prompt line up to date
    pub async fn start(
        &self,
        update_interval: Duration,
        message_builder: PromptMessageBuilder,
        command_manager: Option<&CommandManager>,
    ) -> Result<(), PromptError> {
        let mut interval = tokio::time::interval(update_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut prompt_line = message_builder().await?;
        self.show_prompt(&prompt_line);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let updated = message_builder().await?;
                    if updated != prompt_line {
                        prompt_line = updated;
                        self.show_prompt(&prompt_line);
                    }
                },
                line = async { self.reader.lock().await.next_line().await } => {
                    match line {
                        Ok(Some(line)) => {
                            let line = line.trim().to_owned();
                            if !line.is_empty() {
                                if let Some(manager) = command_manager {
                                    match manager.handle_command(line).await {
                                        Err(CommandError::Exit) => break,
                                        Err(e) => error!("Error while executing command: {:#}", e),
                                        Ok(()) => {}
                                    }
                                }
                            }
                            self.show_prompt(&prompt_line);
                        },
                        Ok(None) => break,
                        Err(e) => return Err(PromptError::Io(e)),
                    }
                }
            }
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn setup_logger(
    level: LogLevel,
    dir_path: &str,
    filename_log: &str,
    disable_file_logging: bool,
    disable_file_log_date_based: bool,
    disable_log_color: bool,
    logs_modules: Vec<ModuleConfig>,
    file_log_level: LogLevel,
) -> Result<(), PromptError> {
    use fern::colors::{Color as LogColor, ColoredLevelConfig};

    let colors = ColoredLevelConfig::new()
        .error(LogColor::Red)
        .warn(LogColor::Yellow)
        .info(LogColor::Cyan)
        .debug(LogColor::Green)
        .trace(LogColor::Magenta);

    let stdout_log = fern::Dispatch::new()
        .format(move |out, message, record| {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            if disable_log_color {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    timestamp,
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    timestamp,
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            }
        })
        .level(level.into())
        .chain(std::io::stdout());

    let mut base = fern::Dispatch::new();
    for module in logs_modules {
        base = base.level_for(module.module, module.level.into());
    }
    base = base.chain(stdout_log);

    if !disable_file_logging {
        std::fs::create_dir_all(dir_path)?;
        let file_log = fern::Dispatch::new()
            .format(|out, message, record| {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    timestamp,
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(file_log_level.into());

        let file_log = if disable_file_log_date_based {
            file_log.chain(fern::log_file(format!("{}{}", dir_path, filename_log))?)
        } else {
            file_log.chain(fern::DateBased::new(
                dir_path.to_owned(),
                format!("%Y-%m-%d.{}", filename_log),
            ))
        };
        base = base.chain(file_log);
    }

    base.apply()?;
    Ok(())
}
