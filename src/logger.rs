//! Console Logger
//!
//! Backs the `log` facade and the `kprint!`/`kprintln!` macros with
//! whatever console the runtime registers once it is up. Before
//! registration, output is dropped.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

/// Function that puts a string on the console.
pub type ConsoleSink = fn(&str);

static SINK: Mutex<Option<ConsoleSink>> = Mutex::new(None);

static LOGGER: ConsoleLogger = ConsoleLogger;

struct ConsoleLogger;

struct SinkWriter(ConsoleSink);

impl Write for SinkWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Hold the lock for the whole line so harts don't interleave
        let sink = SINK.lock();
        if let Some(put) = *sink {
            let _ = writeln!(
                SinkWriter(put),
                "[{:<5}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Register the console and install the logger.
///
/// The sink is replaced even if installing the logger fails because
/// another logger was set first.
pub fn init(sink: ConsoleSink, level: LevelFilter) -> Result<(), SetLoggerError> {
    *SINK.lock() = Some(sink);
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments<'_>) {
    let sink = SINK.lock();
    if let Some(put) = *sink {
        let _ = SinkWriter(put).write_fmt(args);
    }
}

/// Print to the platform console
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::logger::_print(format_args!($($arg)*))
    };
}

/// Println to the platform console
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::logger::_print(format_args!("{}\n", format_args!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    fn capture(s: &str) {
        CAPTURED.lock().push_str(s);
    }

    #[test]
    fn test_logger_and_print_reach_sink() {
        init(capture, LevelFilter::Trace).unwrap();

        log::info!(target: "pc805", "PMA slot {} freed", 7);
        crate::kprintln!("raw {}", 42);

        let out = CAPTURED.lock().clone();
        assert!(out.contains("[INFO ] pc805: PMA slot 7 freed\n"));
        assert!(out.contains("raw 42\n"));
    }
}
