//! Application service: follow agent events on the bus.

use anyhow::Result;
use pcloud_common::BusEvent;

use crate::application::ports::EventSource;

/// Pass every pacemaker-cloud event to `on_event` until the source ends.
///
/// Events from other vendors are skipped. Returns the number of events
/// delivered.
pub async fn follow(
    source: &mut impl EventSource,
    mut on_event: impl FnMut(&BusEvent),
) -> Result<u64> {
    let mut delivered = 0;
    while let Some(event) = source.next_event().await? {
        if !event.from_our_vendor() {
            tracing::debug!(vendor = %event.vendor, agent = %event.agent, "ignoring foreign event");
            continue;
        }
        on_event(&event);
        delivered += 1;
    }
    Ok(delivered)
}
