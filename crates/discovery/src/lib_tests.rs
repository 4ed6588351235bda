// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tokio::time::Instant;

use super::{ServiceInfo, ServiceSnapshot};

fn expiring_at(good_until: Instant) -> ServiceInfo {
    let mut info = ServiceInfo::new("svc1", "10.0.0.1:1");
    info.origin_id = "peer".to_owned();
    info.good_until = good_until;
    info
}

#[test]
fn snapshot_reports_remaining_lifetime() {
    let now = Instant::now();
    let snapshot = ServiceSnapshot::from_info(&expiring_at(now + Duration::from_millis(1500)), now);
    assert_eq!(snapshot.name, "svc1");
    assert_eq!(snapshot.address, "10.0.0.1:1");
    assert_eq!(snapshot.origin_id, "peer");
    assert_eq!(snapshot.expires_in_ms, 1500);
}

#[test]
fn expired_snapshot_reports_zero() {
    let now = Instant::now() + Duration::from_secs(10);
    let snapshot = ServiceSnapshot::from_info(&expiring_at(now - Duration::from_secs(1)), now);
    assert_eq!(snapshot.expires_in_ms, 0);
}

#[test]
fn distant_deadline_saturates() -> anyhow::Result<()> {
    let now = Instant::now();
    let beyond_u64_millis = Duration::from_secs(u64::MAX / 1000 + 1);
    let good_until = now
        .checked_add(beyond_u64_millis)
        .ok_or_else(|| anyhow::anyhow!("platform clock cannot represent the deadline"))?;
    let snapshot = ServiceSnapshot::from_info(&expiring_at(good_until), now);
    assert_eq!(snapshot.expires_in_ms, u64::MAX);
    Ok(())
}
