//! Quality-control augmentation of a generated study
//!
//! For every assay graph carrying a [`QualityControl`] plan, the assay is
//! regenerated over its real samples sorted by name, preceded by the pre-run
//! batch, followed by the post-run batch and with one interspersed sample
//! after every `interval` real samples. QC samples come from fresh QC
//! sources and get a sampling process with run order `-1`.

use std::collections::HashSet;

use log::{info, warn};

use crate::model::{Material, Study};

use super::generator::{assay_filename, generate_assay, Sampler, StudyDesign};
use super::plan::{ProductNode, QualityControl};
use super::DesignError;

const QC_RUN_ORDER: &str = "-1";
const QC_SOURCE_NAME: &str = "source_QC";
const QC_SAMPLE_NAME: &str = "sample_QC";

/// Number of interspersed QC samples among `real` samples run every `interval`
pub fn interspersed_count(real: usize, interval: usize) -> usize {
    if real == 0 || interval == 0 {
        0
    } else {
        (real - 1) / interval
    }
}

/// Return a copy of `study` with the QC samples of `design` added to its
/// assays; `study` itself is left untouched
///
/// Each assay graph is augmented once, named after the first cell whose
/// plan holds it. A study whose design has no QC plan comes back unchanged.
pub fn augment_study(study: &Study, design: &StudyDesign) -> Result<Study, DesignError> {
    let mut sampler = Sampler {
        study: study.clone(),
        run_order: 0,
    };
    let mut augmented = HashSet::new();

    for arm in design.arms() {
        for (cell, plan) in arm.arm_map() {
            let Some(plan) = plan else {
                continue;
            };
            for graph in plan.assay_plan() {
                let Some(qc) = &graph.quality_control else {
                    continue;
                };
                if !augmented.insert(graph.id.clone()) {
                    continue;
                }
                let filename = assay_filename(graph);
                let Some(position) = sampler
                    .study
                    .assays
                    .iter()
                    .position(|a| a.filename == filename)
                else {
                    warn!(
                        "Study {} has no assay {} to add quality controls to",
                        study.identifier, filename
                    );
                    continue;
                };

                let real = real_samples(&sampler.study, position);
                let samples = interleave(&mut sampler, qc, &cell.name, real)?;
                let assay = generate_assay(graph, &samples)?;
                info!(
                    "Assay {} now runs {} samples including quality controls",
                    assay.filename,
                    assay.samples.len()
                );
                sampler.study.assays[position] = assay;
            }
        }
    }
    Ok(sampler.study)
}

/// Samples of an assay declared in the study, sorted by name
fn real_samples(study: &Study, assay: usize) -> Vec<Material> {
    let mut real: Vec<Material> = study.assays[assay]
        .samples
        .iter()
        .filter(|s| study.samples.iter().any(|d| d.id == s.id))
        .cloned()
        .collect();
    real.sort_by(|a, b| a.name.cmp(&b.name));
    real
}

fn interleave(
    sampler: &mut Sampler,
    qc: &QualityControl,
    cell: &str,
    real: Vec<Material>,
) -> Result<Vec<Material>, DesignError> {
    let pre = match &qc.pre_run {
        Some(node) => qc_batch(sampler, node, "PRE", cell, node.size())?,
        None => Vec::new(),
    };
    let mut interspersed = Vec::new();
    for (k, (node, interval)) in qc.interspersed().iter().enumerate() {
        let count = interspersed_count(real.len(), *interval);
        let batch = qc_batch(sampler, node, &format!("INT{}", k), cell, count)?;
        interspersed.push((*interval, batch));
    }
    let post = match &qc.post_run {
        Some(node) => qc_batch(sampler, node, "POST", cell, node.size())?,
        None => Vec::new(),
    };

    let mut samples = pre;
    for (position, sample) in real.into_iter().enumerate() {
        for (interval, batch) in &interspersed {
            if position > 0 && position % interval == 0 {
                samples.extend(batch.get(position / interval - 1).cloned());
            }
        }
        samples.push(sample);
    }
    samples.extend(post);
    Ok(samples)
}

fn qc_batch(
    sampler: &mut Sampler,
    node: &ProductNode,
    tag: &str,
    cell: &str,
    count: usize,
) -> Result<Vec<Material>, DesignError> {
    let mut batch = Vec::with_capacity(count);
    for i in 1..=count {
        let source = Material::source(&format!(
            "SRC-QC-{}-{}_{}_{:03}",
            tag, cell, QC_SOURCE_NAME, i
        ));
        let mut sample = Material::sample(&format!(
            "SMP-QC-{}-{}_{}_{:03}",
            tag, cell, QC_SAMPLE_NAME, i
        ));
        sample.characteristics = node.characteristics.clone();
        sampler.add_sampled_with_run_order(&source, &mut sample, QC_RUN_ORDER, cell)?;
        sampler.study.sources.push(source);
        sampler.study.samples.push(sample.clone());
        batch.push(sample);
    }
    Ok(batch)
}
