use std::io::Write;

use env_logger::WriteStyle;
use log::LevelFilter;

/// Installs the process-wide logger. `RUST_LOG` overrides the `Info` default.
/// Library code never calls this; binaries and tests opt in.
pub fn try_init() -> Result<(), log::SetLoggerError> {
    env_logger::builder()
        .format(|buf, record| writeln!(buf, "[VEH | {}] {}", record.level(), record.args()))
        .write_style(WriteStyle::Auto)
        .filter(None, LevelFilter::Info)
        .parse_default_env()
        .try_init()
}
