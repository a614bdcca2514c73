use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::LevelFilter;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// `-v` 出现次数对应的默认级别：0 为 Warn，1 为 Info，2 及以上为 Debug。
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// 日志行中的模块名：去掉 crate 前缀，只留 `merge::engine` 这样的路径。
fn short_target(target: &str) -> &str {
    target.strip_prefix("rlbwt_merge::").unwrap_or(target)
}

/// 初始化日志：输出到 stderr，每行带运行时长与模块名。
///
/// 默认级别只作用于本 crate，依赖库保持 Warn；`RUST_LOG` 中指定的模块以其为准。
pub fn init_logger(verbosity: u8) {
    START_TIME.set(Instant::now()).ok();

    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("rlbwt_merge", level_for(verbosity))
        .parse_default_env()
        .format(|buf, record| {
            let secs = START_TIME.get().map(Instant::elapsed).unwrap_or_default().as_secs();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {:<5} {}: {}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                record.level(),
                short_target(record.target()),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
