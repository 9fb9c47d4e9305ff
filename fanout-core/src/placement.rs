use crate::cluster::NodePool;
use crate::fingerprint::Fingerprint;

pub const DEFAULT_REPLICATION_FACTOR: usize = 3;

pub fn primary_index(fingerprint: &Fingerprint, pool_len: usize) -> Option<usize> {
    if pool_len == 0 {
        return None;
    }
    Some((fingerprint.prefix_u64() % pool_len as u64) as usize)
}

/// Ring walk from the primary index, `min(k, |pool|)` distinct node ids.
pub fn select_candidates(fingerprint: &Fingerprint, pool: &NodePool, k: usize) -> Vec<String> {
    let nodes = pool.nodes();
    let Some(start) = primary_index(fingerprint, nodes.len()) else {
        return Vec::new();
    };

    let count = k.min(nodes.len());
    let mut candidates = Vec::with_capacity(count);
    for offset in 0..count {
        candidates.push(nodes[(start + offset) % nodes.len()].node_id.clone());
    }

    candidates
}
