use anyhow::{bail, Context};
use std::path::PathBuf;
use tether_core::{
    CoordinateFile, Orchestrator, RestraintJsonFile, SubtypeKind, ValidationConfig,
};

pub fn execute(
    coordinates: PathBuf,
    restraints: PathBuf,
    output: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    no_cache: bool,
    representative_model: usize,
) -> anyhow::Result<()> {
    let config = ValidationConfig {
        representative_model_id: representative_model,
        use_cache: cache_dir.is_some() && !no_cache,
        cache_dir,
        ..Default::default()
    };

    let coordinate_source = CoordinateFile::new(&coordinates);
    let restraint_source = RestraintJsonFile::new(&restraints);
    let outcome = Orchestrator::new(config).run(&coordinate_source, &restraint_source);

    let Some(mut report) = outcome.report else {
        for diagnostic in outcome.diagnostics.entries() {
            log::error!("{}: {}", diagnostic.kind, diagnostic.message);
        }
        bail!("coordinate load failed; no report produced");
    };
    report.generated = Some(chrono::Utc::now().to_rfc3339());

    for (kind, ok) in [
        (SubtypeKind::Distance, report.distance.as_ref().map(|s| s.ok)),
        (SubtypeKind::Dihedral, report.dihedral.as_ref().map(|s| s.ok)),
        (SubtypeKind::Rdc, report.rdc.as_ref().map(|s| s.ok)),
    ] {
        match ok {
            Some(true) => log::info!("{kind}: evaluated"),
            Some(false) => log::warn!("{kind}: not evaluated"),
            None => {}
        }
    }

    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("writing report to {}", path.display()))?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
