//! The per-tooth run: load, align, model, validate, then publish.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use ssm::io::{cap_point_count, save_points};
use ssm::model::ValidationReport;
use ssm::prelude::*;
use tracing::{info, warn};

use crate::config::PipelineConfig;

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Training samples aligned.
    pub training: usize,
    /// Held-out samples validated.
    pub test: usize,
    /// Refine passes run.
    pub iterations: u32,
    /// Whether refinement met `eps`.
    pub converged: bool,
    /// Principal modes used for reconstruction.
    pub components: usize,
    /// Cumulative explained variance of those modes.
    pub explained_variance: f64,
    /// Validation outcome, absent without test samples.
    pub validation: Option<ValidationReport>,
}

/// Runs the whole pipeline for one tooth.
///
/// Outputs are written only after alignment, model building and validation
/// have all succeeded.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    config.validate()?;

    let dataset = ToothDataset::load_dir(&config.data_dir)
        .with_context(|| format!("failed to load {}", config.data_dir.display()))?;
    info!(
        tooth = config.tooth_index,
        samples = dataset.len(),
        "Loaded dataset"
    );

    let reference_group = dataset
        .get(config.reference_tag)
        .with_context(|| format!("reference tag {} is missing", config.reference_tag))?;
    let reference = FarthestPointSampler.downsample(reference_group, config.reference_points);

    let dataset = dataset
        .map_groups(|group| cap_point_count(&FarthestPointSampler, group, config.max_points));
    let (train, test) = dataset.partition(&config.training_tags());
    ensure!(!train.is_empty(), "no training samples in {}", config.data_dir.display());

    let smallest = train.iter().map(Sample::len).min().unwrap_or(0);
    ensure!(
        reference.len() <= smallest,
        "reference has {} points but the smallest training sample has {}",
        reference.len(),
        smallest
    );
    info!(
        train = train.len(),
        test = test.len(),
        reference_points = reference.len(),
        "Partitioned samples"
    );

    let pool = WorkerPool::new(config.workers)?;
    let outcome = build_and_validate(config, &pool, &reference, &train, &test);
    pool.shutdown();
    let (alignment, model, components, validation) = outcome?;

    publish(config, &alignment, validation.as_ref())?;

    Ok(RunSummary {
        training: train.len(),
        test: test.len(),
        iterations: alignment.iterations,
        converged: alignment.converged,
        components,
        explained_variance: model.explained_variance_ratio(components),
        validation,
    })
}

type Built = (
    ssm::align::PopulationAlignment,
    ShapeModel,
    usize,
    Option<ValidationReport>,
);

fn build_and_validate(
    config: &PipelineConfig,
    pool: &WorkerPool,
    reference: &PointGroup,
    train: &[Sample],
    test: &[Sample],
) -> Result<Built> {
    let pair = PairAligner::new(CoherentPointDrift::new(), config.pair_params());
    let aligner = PopulationAligner::new(pair.clone(), config.population_params());
    let alignment = aligner
        .align(pool, reference, train)
        .context("population alignment failed")?;

    let model = ShapeModel::build(&alignment.aligned_groups()).context("PCA failed")?;
    let mut components = config.components;
    if components > model.max_components() {
        warn!(
            requested = components,
            available = model.max_components(),
            "More principal modes requested than the shape dimension"
        );
        components = model.max_components();
    }
    if components > model.components() {
        info!(
            components,
            variance_modes = model.components(),
            "Reconstruction includes zero-variance modes"
        );
    }
    info!(
        components,
        explained_variance = model.explained_variance_ratio(components),
        "Built shape model"
    );

    let validation = if test.is_empty() {
        warn!("No held-out samples, skipping validation");
        None
    } else {
        let validator = ReconstructionValidator::new(pair, components);
        Some(
            validator
                .validate(pool, &model, test)
                .context("validation failed")?,
        )
    };

    Ok((alignment, model, components, validation))
}

fn publish(
    config: &PipelineConfig,
    alignment: &ssm::align::PopulationAlignment,
    validation: Option<&ValidationReport>,
) -> Result<()> {
    let aligned: Vec<Sample> = alignment
        .samples
        .iter()
        .map(|s| Sample::new(s.tag, s.aligned.clone()))
        .collect();
    AlignedShapeStore::new(&config.output_dir).save(&aligned)?;

    let transforms = TransformFile::new(config.tooth_index, &alignment.transforms());
    TransformStore::new(config.transforms_path()).save(&transforms)?;

    if let Some(report) = validation {
        save_reconstructions(&config.output_dir.join("test"), report)?;
    }
    Ok(())
}

fn save_reconstructions(dir: &Path, report: &ValidationReport) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for sample in &report.samples {
        save_points(&sample.reconstructed, dir.join(format!("{}.txt", sample.tag)))?;
        save_points(
            &sample.original,
            dir.join(format!("corre_init_{}.txt", sample.tag)),
        )?;
    }
    info!(
        dir = %dir.display(),
        samples = report.samples.len(),
        "Saved test reconstructions"
    );
    Ok(())
}
