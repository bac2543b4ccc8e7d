// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! stderr logging through `fern`.

use colored::{Color, Colorize};
use log::{Level, LevelFilter};

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "GRAFT_LOG";

/// Pick the log level: the flag wins, then `GRAFT_LOG`, then `warn`.
pub fn resolve_level(flag: Option<&str>, env: Option<&str>) -> LevelFilter {
    [flag, env]
        .into_iter()
        .flatten()
        .find_map(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

fn color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Blue,
        Level::Debug => Color::Magenta,
        Level::Trace => Color::Green,
    }
}

pub fn dispatch(level: LevelFilter) -> fern::Dispatch {
    fern::Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            let level = record.level();
            let label = format!("{}:", level.to_string().to_lowercase());
            out.finish(format_args!("{} {}", label.as_str().color(color(level)), message))
        })
        .chain(std::io::stderr())
}

/// Install the global logger. A second call is a no-op.
pub fn init(level: LevelFilter) {
    if dispatch(level).apply().is_err() {
        log::debug!("logger already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_environment() {
        assert_eq!(resolve_level(Some("debug"), Some("trace")), LevelFilter::Debug);
        assert_eq!(resolve_level(None, Some("info")), LevelFilter::Info);
        assert_eq!(resolve_level(None, Some(" TRACE ")), LevelFilter::Trace);
    }

    #[test]
    fn defaults_to_warn() {
        assert_eq!(resolve_level(None, None), LevelFilter::Warn);
        assert_eq!(resolve_level(None, Some("loud")), LevelFilter::Warn);
    }
}
