// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;

#[test]
fn defaults_are_valid() {
    let opts = AgentOptions::default();
    assert_eq!(opts.subject_prefix, DEFAULT_SUBJECT_PREFIX);
    assert_eq!(opts.update_interval, DEFAULT_UPDATE_INTERVAL);
    assert_eq!(opts.validate(), Ok(()));
}

#[test]
fn expiry_grace_adds_ten_percent() {
    let opts = AgentOptions::new().update_interval(Duration::from_millis(2000));
    assert_eq!(opts.expiry_grace(), Duration::from_millis(2200));
    assert_eq!(AgentOptions::default().expiry_grace(), Duration::from_millis(1100));
}

#[yare::parameterized(
    empty = { "" },
    leading_dot = { ".svc" },
    trailing_dot = { "svc." },
    double_dot = { "a..b" },
    star = { "a.*.b" },
    tail = { "a.>" },
)]
fn rejects_bad_prefix(prefix: &str) {
    let opts = AgentOptions::new().subject_prefix(prefix);
    assert_eq!(opts.validate(), Err(ErrorCode::InvalidOption));
}

#[test]
fn rejects_zero_interval() {
    let opts = AgentOptions::new().update_interval(Duration::ZERO);
    assert_eq!(opts.validate(), Err(ErrorCode::InvalidOption));
}

#[test]
fn accepts_custom_prefix() {
    let opts = AgentOptions::new().subject_prefix("acme.mesh");
    assert_eq!(opts.validate(), Ok(()));
}
