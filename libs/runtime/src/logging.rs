use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::{FilterFn, Targets};
use tracing_subscriber::fmt;

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";

// -------- level helpers --------

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == subsystem or target starts with "subsystem::"
fn matches_subsystem(target: &str, subsystem: &str) -> bool {
    target == subsystem
        || (target.starts_with(subsystem) && target[subsystem.len()..].starts_with("::"))
}

type CatchAllFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Matches everything that no explicit subsystem section claims, up to `max_level`.
fn catch_all_filter(subsystems: &[String], max_level: Level) -> CatchAllFilter {
    let subsystems = subsystems.to_vec();
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        let t = meta.target();
        !subsystems.iter().any(|s| matches_subsystem(t, s)) && meta.level() <= &max_level
    }))
}

// -------- rotating file writer --------

#[derive(Clone)]
struct RotatingFile(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut f) => f.write(buf),
            // A writer that panicked mid-write poisons the lock; drop the record.
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut f) => f.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// Writes nothing when no file is routed for the record's target.
struct MaybeFile(Option<RotatingFile>);

impl Write for MaybeFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files, falling back to the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotatingFile>,
    by_subsystem: HashMap<String, RotatingFile>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<RotatingFile> {
        self.by_subsystem
            .iter()
            .find(|(name, _)| matches_subsystem(target, name))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_subsystem.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = MaybeFile;

    fn make_writer(&'a self) -> Self::Writer {
        MaybeFile(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaybeFile(self.resolve(meta.target()))
    }
}

/// Relative paths are resolved against `base_dir`; absolute ones are kept.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating_file(
    log_path: &Path,
    max_bytes: usize,
) -> Result<RotatingFile, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::Age(chrono::Duration::days(1))),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotatingFile(Arc::new(Mutex::new(rot))))
}

fn file_for_section(name: &str, section: &Section, base_dir: &Path) -> Option<RotatingFile> {
    if section.file.trim().is_empty() {
        return None;
    }
    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let path = resolve_log_path(&section.file, base_dir);
    match open_rotating_file(&path, max_bytes as usize) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to open log file for '{}': {} ({})",
                name,
                path.display(),
                e
            );
            None
        }
    }
}

// -------- plan --------

/// Everything derived from a `LoggingConfig` before any subscriber is installed.
struct LoggingPlan {
    subsystems: Vec<String>,
    console_targets: Targets,
    file_targets: Targets,
    default_console: Option<Level>,
    default_file: Option<Level>,
    router: FileRouter,
}

fn plan(cfg: &LoggingConfig, base_dir: &Path) -> LoggingPlan {
    let mut subsystems = Vec::new();
    let mut console_targets = Targets::new().with_default(LevelFilter::OFF);
    let mut file_targets = Targets::new().with_default(LevelFilter::OFF);
    let mut router = FileRouter::default();

    for (name, section) in cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION) {
        subsystems.push(name.clone());
        if let Some(level) = parse_tracing_level(&section.console_level) {
            console_targets = console_targets.with_target(name.clone(), LevelFilter::from_level(level));
        }
        if let Some(writer) = file_for_section(name, section, base_dir) {
            if let Some(level) = parse_tracing_level(&section.file_level) {
                file_targets = file_targets.with_target(name.clone(), LevelFilter::from_level(level));
            }
            router.by_subsystem.insert(name.clone(), writer);
        }
    }

    let default_section = cfg.get(DEFAULT_SECTION);
    let default_console = default_section.and_then(|s| parse_tracing_level(&s.console_level));
    router.default = default_section.and_then(|s| file_for_section(DEFAULT_SECTION, s, base_dir));
    let default_file = router
        .default
        .as_ref()
        .and(default_section)
        .and_then(|s| parse_tracing_level(&s.file_level));

    LoggingPlan {
        subsystems,
        console_targets,
        file_targets,
        default_console,
        default_file,
        router,
    }
}

// -------- public init --------

/// Install the global subscriber.
/// - `cfg`: per-subsystem sections, "default" catches every other target
/// - `base_dir`: resolves relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, prelude::*, Layer, Registry};

    // Bridge `log` → `tracing` before the subscriber exists.
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = plan(cfg, base_dir);
    let ansi = atty::is(atty::Stream::Stdout);

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(
        fmt::layer()
            .with_ansi(ansi)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(plan.console_targets)
            .boxed(),
    );

    if let Some(level) = plan.default_console {
        layers.push(
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(catch_all_filter(&plan.subsystems, level))
                .boxed(),
        );
    }

    if !plan.router.is_empty() {
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(plan.router.clone())
                .with_filter(plan.file_targets)
                .boxed(),
        );
        if let Some(level) = plan.default_file {
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(plan.router)
                    .with_filter(catch_all_filter(&plan.subsystems, level))
                    .boxed(),
            );
        }
    }

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("bogus"), Some(Level::INFO));
    }

    #[test]
    fn test_subsystem_prefix_matching() {
        assert!(matches_subsystem("calendar", "calendar"));
        assert!(matches_subsystem("calendar::domain::dispatcher", "calendar"));
        assert!(!matches_subsystem("calendar_server", "calendar"));
        assert!(!matches_subsystem("runtime", "calendar"));
    }

    #[test]
    fn test_plan_separates_subsystems_from_default() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert(
            "calendar".into(),
            Section {
                console_level: "debug".into(),
                file: "logs/calendar-domain.log".into(),
                file_level: "trace".into(),
                max_size_mb: Some(1),
            },
        );

        let plan = plan(&cfg, tmp.path());
        assert_eq!(plan.subsystems, vec!["calendar".to_string()]);
        assert_eq!(plan.default_console, Some(Level::INFO));
        assert_eq!(plan.default_file, Some(Level::DEBUG));
        assert!(plan.router.by_subsystem.contains_key("calendar"));
        assert!(plan.router.default.is_some());
        assert!(tmp.path().join("logs").exists());
    }

    #[test]
    fn test_empty_file_disables_file_sink() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert(
            "default".into(),
            Section {
                console_level: "info".into(),
                file: String::new(),
                file_level: "debug".into(),
                max_size_mb: None,
            },
        );

        let plan = plan(&cfg, tmp.path());
        assert!(plan.router.is_empty());
        assert_eq!(plan.default_file, None);
    }

    #[test]
    fn test_relative_log_path_resolved_against_base_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));
    }
}
