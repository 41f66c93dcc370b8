//! Band ordering and merged output naming.
//!
//! A sorted scene lists its bands as `B4, B5, B6`. The composite wants them
//! as `B5, B6, B4`. Each position of a batch is checked against the band it
//! is expected to hold; a position that does not carry its marker leaves the
//! corresponding composite slot empty.

use std::path::{Path, PathBuf};

use bandmerge_shared::MERGED_TOKEN;
use serde::Serialize;

use crate::layers::RasterLayer;

/// One composite band and the file chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSlot {
    pub band: String,
    pub path: Option<PathBuf>,
}

/// Inputs and output of a single merge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    /// Slots in composite order.
    pub slots: Vec<PlanSlot>,
    /// Where the composite is written; `None` if no band token was found.
    pub output: Option<PathBuf>,
}

impl MergePlan {
    /// Input paths in composite order, if every slot is filled.
    pub fn inputs(&self) -> Option<Vec<PathBuf>> {
        self.slots.iter().map(|s| s.path.clone()).collect()
    }

    /// Bands whose slot stayed empty.
    pub fn missing_bands(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| s.path.is_none())
            .map(|s| s.band.as_str())
            .collect()
    }

    /// Ready to be handed to the merge engine.
    pub fn is_complete(&self) -> bool {
        self.output.is_some() && self.slots.iter().all(|s| s.path.is_some())
    }
}

/// Place the batch's paths into composite order.
///
/// The layer at position `i` goes to the slot of `bands[i]` within
/// `composite_order`, but only if its file name contains `bands[i]`.
pub fn order_batch(
    batch: &[RasterLayer],
    bands: &[String],
    composite_order: &[String],
) -> Vec<Option<PathBuf>> {
    let mut ordered = vec![None; composite_order.len()];

    for (layer, band) in batch.iter().zip(bands) {
        let Some(slot) = composite_order.iter().position(|b| b == band) else {
            continue;
        };
        if bandmerge_discovery::is_desired_raster_band(&layer.path, band) {
            ordered[slot] = Some(layer.path.clone());
        }
    }

    ordered
}

/// Derive the merged file path from the first file of a batch.
///
/// The two characters after the first `_B` in the file name (e.g. `B4`) are
/// the band token; every occurrence of it in the file name becomes `MERGED`.
pub fn merged_output_path(first: &Path) -> Option<PathBuf> {
    let name = first.file_name()?.to_str()?;
    let start = name.find("_B")? + 1;
    let token = name.get(start..start + 2)?;
    Some(first.with_file_name(name.replace(token, MERGED_TOKEN)))
}

/// Build the merge plan for one batch.
pub fn plan_merge(batch: &[RasterLayer], bands: &[String], composite_order: &[String]) -> MergePlan {
    let ordered = order_batch(batch, bands, composite_order);
    let slots = composite_order
        .iter()
        .zip(ordered)
        .map(|(band, path)| PlanSlot {
            band: band.clone(),
            path,
        })
        .collect();
    let output = batch.first().and_then(|layer| merged_output_path(&layer.path));

    MergePlan { slots, output }
}
