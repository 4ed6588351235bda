// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::*;

fn parse(args: &[&str]) -> anyhow::Result<Config> {
    let mut argv = vec!["discovery-agent"];
    argv.extend_from_slice(args);
    Ok(Config::try_parse_from(argv)?)
}

#[test]
fn defaults_validate() -> anyhow::Result<()> {
    let config = parse(&[])?;
    config.validate()?;
    assert_eq!(config.prefix, DEFAULT_SUBJECT_PREFIX);
    assert_eq!(config.agent_options(), AgentOptions::default());
    assert!(config.services()?.is_empty());
    Ok(())
}

#[test]
fn register_and_watch_are_repeatable() -> anyhow::Result<()> {
    let config = parse(&[
        "--register",
        "api=10.0.0.1:9000",
        "--register",
        "db=10.0.0.2:5432,cache=10.0.0.3:6379",
        "--watch",
        "api",
        "--watch",
        "db",
    ])?;
    config.validate()?;
    let services = config.services()?;
    let pairs: Vec<_> = services.iter().map(|s| (s.name.as_str(), s.address.as_str())).collect();
    assert_eq!(
        pairs,
        vec![("api", "10.0.0.1:9000"), ("db", "10.0.0.2:5432"), ("cache", "10.0.0.3:6379")]
    );
    assert_eq!(config.watch, vec!["api", "db"]);
    Ok(())
}

#[yare::parameterized(
    no_separator = { "api" },
    empty_name = { "=10.0.0.1:9000" },
    empty_address = { "api=" },
)]
fn rejects_bad_service_spec(spec: &str) {
    assert!(parse_service(spec).is_err());
}

#[test]
fn address_may_contain_equals() -> anyhow::Result<()> {
    let info = parse_service("api=http://host/?a=b")?;
    assert_eq!(info.address, "http://host/?a=b");
    Ok(())
}

#[test]
fn rejects_zero_interval() -> anyhow::Result<()> {
    let config = parse(&["--update-interval-ms", "0"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn rejects_wildcard_prefix() -> anyhow::Result<()> {
    let config = parse(&["--prefix", "acme.>"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn rejects_unknown_log_format() -> anyhow::Result<()> {
    let config = parse(&["--log-format", "xml"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn custom_interval_flows_into_options() -> anyhow::Result<()> {
    let config = parse(&["--prefix", "acme.mesh", "--update-interval-ms", "250"])?;
    let opts = config.agent_options();
    assert_eq!(opts.subject_prefix, "acme.mesh");
    assert_eq!(opts.update_interval, std::time::Duration::from_millis(250));
    Ok(())
}
