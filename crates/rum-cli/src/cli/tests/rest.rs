//! Tests for status, gc, abort.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_status() {
    match parse(&["rum", "status"]) {
        CliCommand::Status => {}
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_gc() {
    match parse(&["rum", "gc"]) {
        CliCommand::Gc => {}
        _ => panic!("expected Gc"),
    }
}

#[test]
fn cli_parse_abort() {
    match parse(&["rum", "abort", "3f2a9c"]) {
        CliCommand::Abort { session_id } => assert_eq!(session_id, "3f2a9c"),
        _ => panic!("expected Abort"),
    }
}

#[test]
fn cli_parse_abort_requires_id() {
    assert!(Cli::try_parse_from(["rum", "abort"]).is_err());
}
