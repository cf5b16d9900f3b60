//! Handler for `keel transform`.

use miette::Result;

use keel_core::module_id::ModuleRevisionId;
use keel_resolver::namespace::Direction;
use keel_resolver::settings::ResolutionSettings;
use keel_util::errors::KeelError;

pub fn exec(
    settings: &ResolutionSettings,
    namespace: &str,
    from_system: bool,
    mrid: &str,
) -> Result<()> {
    let Some(ns) = settings.namespace(namespace) else {
        return Err(KeelError::InvalidArgument {
            message: format!("unknown namespace '{namespace}'"),
        }
        .into());
    };
    let mrid = ModuleRevisionId::parse(mrid)?;
    let direction = if from_system {
        Direction::FromSystem
    } else {
        Direction::ToSystem
    };
    println!("{}", ns.transform(direction, &mrid));
    Ok(())
}
