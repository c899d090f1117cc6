use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use themex::prelude::*;

const DEFAULT_STYLESHEET: &str = "/usr/share/gnome-shell/theme/gnome-shell.css";

fn main() -> anyhow::Result<()> {
    let executor = Rc::new(LocalExecutor::new());
    smol::block_on(executor.run(run(executor.clone())))
}

async fn run(executor: Rc<LocalExecutor<'static>>) -> anyhow::Result<()> {
    let local = Rc::new(SettingsStore::load("extension", extension_schema()).await?);
    let _settings = SettingsStore::watch(&local, &executor, Duration::from_millis(100))?;

    let remote = Rc::new(GSettingsStore::open("system", SYSTEM_LAYOUT)?);
    let _monitor = GSettingsStore::monitor(&remote, &executor)?;

    let engine = Rc::new(ThemeContext::new("user", Some(PathBuf::from(DEFAULT_STYLESHEET))));
    let locator = Rc::new(XdgThemeLocator::from_env()?);
    let config = ThemexConfig::from_env()?;

    let orchestrator = Orchestrator::new(local.clone(), remote, engine, locator, executor.clone(), config)?;
    orchestrator.start()?;
    orchestrator.watch_night_light();

    println!("themex running, settings in {:?}", local.path());
    std::future::pending::<()>().await;
    Ok(())
}
