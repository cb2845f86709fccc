use chrono::Local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn style(self) -> (&'static str, &'static str) {
        match self {
            Level::Info => ("\x1b[32m", "INFO"),
            Level::Warn => ("\x1b[33m", "WARN"),
            Level::Error => ("\x1b[31m", "ERRO"),
            Level::Debug => ("\x1b[34m", "DEBG"),
        }
    }
}

/// 统一日志输出
/// 格式: [Time] [LEVEL] [Target] Message
///
/// WARN / ERRO 走 stderr，避免与控制台输出的 JSON 混在一起
pub fn print(level: Level, target: &str, args: std::fmt::Arguments) {
    let now = Local::now().format("%H:%M:%S");
    let (color, tag) = level.style();

    let line = format!(
        "\x1b[90m[{}] {}[{}]\x1b[0m \x1b[36m[{}]\x1b[0m {}",
        now, color, tag, target, args
    );

    match level {
        Level::Warn | Level::Error => eprintln!("{}", line),
        Level::Info | Level::Debug => println!("{}", line),
    }
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Info, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Info, "System", format_args!($($arg)+))
    );
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Warn, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Warn, "System", format_args!($($arg)+))
    );
}

#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Error, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Error, "System", format_args!($($arg)+))
    );
}

#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Debug, $target, format_args!($($arg)+))
    );
    ($($arg:tt)+) => (
        $crate::log::print($crate::log::Level::Debug, "System", format_args!($($arg)+))
    );
}
