//! Handler for `keel sort`.

use miette::Result;

use keel_resolver::settings::ResolutionSettings;

pub fn exec(
    settings: &ResolutionSettings,
    strategy: Option<&str>,
    revisions: &[String],
) -> Result<()> {
    let strategy = super::strategy(settings, strategy)?;
    let infos = super::parse_revisions(revisions);
    for info in strategy.sort(&infos) {
        println!("{}", info.revision);
    }
    Ok(())
}
