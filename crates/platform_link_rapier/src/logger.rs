//! FileLogger для Bevy host'а
//!
//! stdout + append в log файл. Timestamp ставит ядро, здесь только вывод.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use platform_link::{LogLevel, LogPrinter};

pub struct FileLogger {
    path: PathBuf,
    open_error_reported: AtomicBool,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            open_error_reported: AtomicBool::new(false),
        }
    }

    /// Новая сессия: старый файл удаляется, пишется заголовок
    pub fn start_session(path: impl Into<PathBuf>) -> Self {
        let logger = Self::new(path);
        let _ = std::fs::remove_file(&logger.path);
        logger.append(&format!(
            "=== platform link session {} ===",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        logger
    }

    fn append(&self, line: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match std::fs::OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", line);
            }
            Err(e) => {
                // Только первый раз, дальше молчим
                if !self.open_error_reported.swap(true, Ordering::Relaxed) {
                    eprintln!("Failed to open log file {:?}: {}", self.path, e);
                }
            }
        }
    }
}

impl LogPrinter for FileLogger {
    fn log(&self, level: LogLevel, message: &str) {
        let line = format!("[{}] {}", level.as_str(), message);
        if level == LogLevel::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
        self.append(&line);
    }
}
