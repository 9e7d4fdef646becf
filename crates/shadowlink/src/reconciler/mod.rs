//! Shadow delta reconciliation.
//!
//! The reconciler is the only writer of reported state. For every delta it
//! issues at most one actuator call and, if that succeeds, reports exactly the
//! keys it applied. Failures are logged and left for the next delta.

mod dispatcher;
mod machine;
#[cfg(test)]
mod testing;

use tracing::info;
use tracing::warn;

pub use dispatcher::Dispatcher;
pub use machine::accepted_patch;
pub use machine::actuation_for;
pub use machine::Outcome;
pub use machine::ReconcileState;
pub use machine::Reconciler;

use crate::catalog::Catalog;
use crate::catalog::ShadowKey;
use crate::shadow::ReportedPatch;
use crate::shadow::ShadowStore;
use crate::shadow::StatePatch;

/// Report every switchable appliance as off.
///
/// Relays come up open after a power cycle, so at startup the reported state
/// is brought in line with the hardware. Returns how many appliances were
/// reset.
pub async fn reset_lights(catalog: &Catalog, shadow: &dyn ShadowStore) -> usize {
    let off = ReportedPatch::mirror(StatePatch {
        power: Some(false),
        ..Default::default()
    });

    let mut reset = 0;
    for appliance in catalog.all() {
        if !appliance.category.allows(ShadowKey::Power) {
            continue;
        }
        match shadow.update_reported(&appliance.id, &off).await {
            Ok(()) => reset += 1,
            Err(e) => warn!("Failed to reset reported state of {}: {}", appliance.id, e),
        }
    }

    info!("Reset reported state of {} appliances", reset);
    reset
}
