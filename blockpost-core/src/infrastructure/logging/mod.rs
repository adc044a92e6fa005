//! Logging via `log` + `log4rs`.

mod consts;

pub use consts::*;

use crate::foundation::OperatorError;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::io::IsTerminal;
use std::path::Path;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Initialize the operator logger with optional file output.
///
/// `filters` is a comma separated expression: a bare level applies to the operator crates
/// (default `info`), `<crate>=<level>` opts a module in, `root=<level>` opts in everything.
/// Third-party crates are off unless named.
///
/// The logger is global; repeated calls are ignored. Console output goes to stderr.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), OperatorError> {
    let config = build_config(log_dir, filters)?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialized; keeping existing configuration");
    }
    Ok(())
}

fn build_config(log_dir: Option<&str>, filters: &str) -> Result<Config, OperatorError> {
    let app_level = parse_app_level(filters);
    let root_level = parse_root_override(filters).unwrap_or(LevelFilter::Off);
    let module_levels = parse_module_levels(filters);

    let console_pattern = if std::io::stderr().is_terminal() { LOG_LINE_PATTERN_COLORED } else { LOG_LINE_PATTERN };
    let console = ConsoleAppender::builder().target(Target::Stderr).encoder(Box::new(PatternEncoder::new(console_pattern))).build();

    let mut config_builder = Config::builder().appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)));
    let mut root_appenders: Vec<&str> = vec![CONSOLE_APPENDER];

    if let Some(dir) = log_dir.map(str::trim).filter(|s| !s.is_empty()) {
        let dir = Path::new(dir);
        std::fs::create_dir_all(dir).map_err(|err| OperatorError::io(format!("create log dir {}", dir.display()), err))?;

        let log_file = rolling_appender(dir, LOG_FILE_NAME)?;
        config_builder = config_builder.appender(Appender::builder().build(LOG_FILE_APPENDER, Box::new(log_file)));
        root_appenders.push(LOG_FILE_APPENDER);

        let err_file = rolling_appender(dir, ERR_LOG_FILE_NAME)?;
        config_builder = config_builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build(ERR_LOG_FILE_APPENDER, Box::new(err_file)),
        );
        root_appenders.push(ERR_LOG_FILE_APPENDER);
    }

    let appender_names: Vec<String> = root_appenders.iter().map(|name| (*name).to_string()).collect();

    for crate_name in WHITELISTED_CRATES {
        if !module_levels.iter().any(|(m, _)| m == *crate_name) {
            config_builder = config_builder
                .logger(Logger::builder().appenders(appender_names.clone()).additive(false).build(*crate_name, app_level));
        }
    }

    for (module, level) in &module_levels {
        config_builder =
            config_builder.logger(Logger::builder().appenders(appender_names.clone()).additive(false).build(module, *level));
    }

    config_builder
        .build(Root::builder().appenders(root_appenders).build(root_level))
        .map_err(|err| OperatorError::ConfigError(format!("invalid logging configuration: {}", err)))
}

fn rolling_appender(dir: &Path, file_name: &str) -> Result<RollingFileAppender, OperatorError> {
    let archive_pattern = dir.join(format!("{}.{{}}.gz", file_name));
    let archive_pattern = archive_pattern
        .to_str()
        .ok_or_else(|| OperatorError::ConfigError(format!("log dir is not valid utf-8: {}", dir.display())))?;
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(archive_pattern, LOG_FILE_MAX_ROLLS)
        .map_err(|err| OperatorError::ConfigError(format!("invalid log roller for {}: {}", file_name, err)))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
        .build(dir.join(file_name), Box::new(policy))
        .map_err(|err| OperatorError::io(format!("open log file {}", file_name), err))
}

fn parse_app_level(filters: &str) -> LevelFilter {
    filters
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && !part.contains('='))
        .find_map(|part| part.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn parse_root_override(filters: &str) -> Option<LevelFilter> {
    module_level_pairs(filters).find(|(module, _)| *module == "root").map(|(_, level)| level)
}

fn parse_module_levels(filters: &str) -> Vec<(String, LevelFilter)> {
    module_level_pairs(filters).filter(|(module, _)| *module != "root").map(|(module, level)| (module.to_string(), level)).collect()
}

fn module_level_pairs(filters: &str) -> impl Iterator<Item = (&str, LevelFilter)> {
    filters.split(',').filter_map(|part| {
        let (module, level) = part.trim().split_once('=')?;
        let module = module.trim();
        if module.is_empty() {
            return None;
        }
        Some((module, level.trim().parse().ok()?))
    })
}
