use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;
use std::path::Path;
use tokio::fs;

const LOG_FILE_NAME: &str = "modpack-sync.log";
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} | {({l}):5.5} | {t} | {m}{n}";
const CONSOLE_PATTERN: &str = "{d(%H:%M:%S)} | {h({l}):5.5} | {m}{n}";
const ROLL_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const ROLLED_FILES_KEPT: u32 = 5;

/// Sets up log4rs for the CLI.
///
/// The rolling file in `log_dir` always records debug output so a failed run
/// can be diagnosed afterwards. The console only shows `console_level` and
/// above, on stdout next to the run report.
pub async fn setup_logging(
    log_dir: &Path,
    console_level: LevelFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(log_dir).await?;

    let roll_pattern = log_dir.join(format!("{}.{{}}", LOG_FILE_NAME));
    let roll_pattern = roll_pattern
        .to_str()
        .ok_or("log directory is not valid UTF-8")?;
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(roll_pattern, ROLLED_FILES_KEPT)?;
    let policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(ROLL_SIZE_BYTES)),
        Box::new(roller),
    );

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(log_dir.join(LOG_FILE_NAME), Box::new(policy))?;
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .target(Target::Stdout)
        .build();

    let root_level = console_level.max(LevelFilter::Debug);
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(console_level)))
                .build("console", Box::new(console)),
        )
        .build(
            Root::builder()
                .appender("file")
                .appender("console")
                .build(root_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging to {}", log_dir.display());

    Ok(())
}
