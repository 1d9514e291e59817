use super::types::{Mask, RegionProposal};
use crate::error::{PipelineError, Result};

/// Pick the region to animate: the proposal with the largest area
///
/// Ties go to the proposal encountered first, so the choice is stable
/// for a given proposal order.
pub fn select_mask(proposals: &[RegionProposal]) -> Result<Mask> {
    let _span = tracing::debug_span!("select_mask").entered();

    let mut best: Option<&RegionProposal> = None;
    for proposal in proposals {
        match best {
            Some(current) if proposal.area <= current.area => {}
            _ => best = Some(proposal),
        }
    }

    let chosen = best.ok_or(PipelineError::NoRegionFound)?;

    tracing::debug!(
        "Selected region with area {} out of {} proposals",
        chosen.area,
        proposals.len()
    );

    Ok(Mask::from_luma(&chosen.segmentation))
}
