//! Per-component log handle.
//!
//! Components never call the global `log` macros. They receive a [`Logger`]
//! at construction, which stamps every record with the component's operation
//! target and forwards it to a [`log::Log`] sink. The default sink is whatever
//! the binary installed as the process logger (`env_logger`); tests pass their
//! own sink to observe what a component reported.

use std::{fmt, sync::Arc};

use log::{Level, Log, Metadata, Record};

#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl Logger {
    pub fn new(sink: Arc<dyn Log>, target: &'static str) -> Self {
        Self { sink, target }
    }

    /// Logger that forwards to the process-wide `log` implementation.
    pub fn global(target: &'static str) -> Self {
        Self::new(Arc::new(GlobalSink), target)
    }

    /// Same sink, different operation target.
    pub fn with_target(&self, target: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            target,
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

struct GlobalSink;

impl Log for GlobalSink {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CaptureSink;
    use super::*;

    #[test]
    fn records_carry_component_target() {
        let sink = Arc::new(CaptureSink::default());
        let logger = Logger::new(sink.clone(), "analyzer.analyze");
        logger.debug(format_args!("rows={}", 3));
        logger.with_target("materializer.create").warn(format_args!("oops"));

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1, "analyzer.analyze");
        assert_eq!(records[0].2, "rows=3");
        assert_eq!(records[1].0, Level::Warn);
        assert_eq!(records[1].1, "materializer.create");
    }
}
