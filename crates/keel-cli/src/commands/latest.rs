//! Handler for `keel latest`.

use miette::Result;

use keel_resolver::settings::ResolutionSettings;
use keel_util::errors::KeelError;

pub fn exec(
    settings: &ResolutionSettings,
    strategy: Option<&str>,
    before: Option<i64>,
    matching: Option<&str>,
    revisions: &[String],
) -> Result<()> {
    let strategy = super::strategy(settings, strategy)?;
    let mut infos = super::parse_revisions(revisions);
    if let Some(asked) = matching {
        infos.retain(|info| settings.accepts(asked, &info.revision));
        tracing::debug!(asked, candidates = infos.len(), "filtered revisions");
    }
    let Some(latest) = strategy.find_latest(&infos, before) else {
        let mut message = String::from("no revision");
        if let Some(asked) = matching {
            message.push_str(&format!(" matching '{asked}'"));
        }
        if let Some(before) = before {
            message.push_str(&format!(" published before {before}"));
        }
        return Err(KeelError::InvalidArgument { message }.into());
    };
    println!("{}", latest.revision);
    Ok(())
}
