use anyhow::Result;
use holocron_common::observability::init_logging;
use holocron_config::{DEFAULT_SETTINGS_FILE, HolocronSettings, SettingsLoader};

#[tokio::main]
async fn main() -> Result<()> {
    // 1) Load settings (env wins over holocron.yaml, which is optional)
    let settings: HolocronSettings = SettingsLoader::new()
        .with_optional_file(DEFAULT_SETTINGS_FILE)
        .load()?;

    let log_path = init_logging(settings.log.to_log_config())?;
    tracing::debug!(log_path=%log_path.display(), "holocron.start");

    holocron_app::harvest::run(&settings).await?;
    Ok(())
}
