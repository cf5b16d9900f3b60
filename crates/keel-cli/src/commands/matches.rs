//! Handler for `keel match`.

use miette::Result;

use keel_resolver::settings::ResolutionSettings;
use keel_util::errors::KeelError;

pub fn exec(
    settings: &ResolutionSettings,
    matcher: &str,
    pattern: &str,
    candidates: &[String],
) -> Result<()> {
    let Some(pattern_matcher) = settings.matcher(matcher) else {
        let known: Vec<&str> = settings.matcher_names().collect();
        return Err(KeelError::InvalidArgument {
            message: format!("unknown matcher '{matcher}' (known: {})", known.join(", ")),
        }
        .into());
    };
    let compiled = pattern_matcher.get_matcher(pattern)?;
    for candidate in candidates {
        let verdict = if compiled.matches(candidate) { "yes" } else { "no" };
        println!("{candidate}: {verdict}");
    }
    Ok(())
}
