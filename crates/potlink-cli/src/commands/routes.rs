//! Print the controller routing table.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use potlink_effects::ResolvedTarget;
use potlink_platform::ParameterBridge;

use super::common::load_settings;

#[derive(Args)]
pub struct RoutesArgs {
    /// Settings file (default: user config dir, if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

pub fn run(args: RoutesArgs) -> anyhow::Result<()> {
    let settings = load_settings(args.config.as_ref())?;
    let chain = settings.build_chain(Arc::new(ParameterBridge::new()))?;

    println!("{:<6} {:<12} {:<14} {}", "CC", "STAGE", "TARGET", "RANGE");
    for route in chain.routes() {
        let label = chain.stage_label(route.stage()).unwrap_or("?");
        let Some(stage) = chain.stage(route.stage()) else {
            continue;
        };
        let (target, range) = match route.target() {
            ResolvedTarget::Bypass => ("bypass".to_string(), ">= 64 bypasses".to_string()),
            ResolvedTarget::Parameter(index) => match stage.kind().params().get(index) {
                Some(desc) => (
                    desc.name.to_string(),
                    format!("{} .. {} {}", desc.min, desc.max, desc.unit.suffix())
                        .trim_end()
                        .to_string(),
                ),
                None => (format!("#{index}"), String::new()),
            },
        };
        println!("{:<6} {:<12} {:<14} {}", route.controller(), label, target, range);
    }
    Ok(())
}
