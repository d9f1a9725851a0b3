//! `discover`: list the benchmark units the harness would measure.

use crate::HarnessResult;
use crate::config::HarnessConfig;
use crate::measure_cmd::discover_units;

pub fn run(cfg: HarnessConfig, by_language: bool) -> HarnessResult<()> {
    let catalog = discover_units(&cfg);
    if by_language {
        for unit in catalog.units_by_language() {
            println!("{} {} => {}", unit.language, unit.algorithm, unit.path.display());
        }
    } else {
        for algorithm in catalog.algorithms() {
            println!("{} [{}]", algorithm, catalog.languages_for(algorithm).join(", "));
        }
    }
    println!(
        "discover: units={} algorithms={}",
        catalog.len(),
        catalog.algorithms().count()
    );
    Ok(())
}
