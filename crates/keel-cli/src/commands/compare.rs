//! Handler for `keel compare`.

use std::cmp::Ordering;

use miette::Result;

use keel_resolver::settings::ResolutionSettings;

pub fn exec(
    settings: &ResolutionSettings,
    strategy: Option<&str>,
    first: &str,
    second: &str,
) -> Result<()> {
    let strategy = super::strategy(settings, strategy)?;
    let a = super::parse_revision(first);
    let b = super::parse_revision(second);
    let sign = match strategy.compare(&a, &b) {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{} {sign} {}", a.revision, b.revision);
    Ok(())
}
