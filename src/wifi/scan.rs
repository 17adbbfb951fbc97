//! Splitting scan results into notification-sized chunks.

use super::types::NetworkInfo;
use crate::protocol::StatusMessage;

/// Networks carried per `scan_results` notification.
pub const NETWORKS_PER_CHUNK: usize = 5;

/// Number of chunks needed for `found` networks.
pub fn total_packets(found: usize) -> usize {
    found.div_ceil(NETWORKS_PER_CHUNK)
}

/// Group results into `scan_results` messages, 1-based and in scan order.
///
/// An empty scan produces no chunks; `scan_complete` alone reports it.
pub fn chunk_results(networks: &[NetworkInfo]) -> Vec<StatusMessage> {
    let networks_found = networks.len();
    let total = total_packets(networks_found);
    networks
        .chunks(NETWORKS_PER_CHUNK)
        .enumerate()
        .map(|(i, chunk)| StatusMessage::ScanResultsChunk {
            packet: i + 1,
            total_packets: total,
            networks_found,
            networks: chunk.to_vec(),
        })
        .collect()
}
