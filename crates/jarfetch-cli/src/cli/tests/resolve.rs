//! Tests for `resolve` argument parsing and pins.

use super::parse;
use crate::cli::commands::parse_pin;
use crate::cli::{Cli, CliCommand, ResolveArgs};
use clap::Parser;
use jarfetch_core::ChecksumAlgo;

fn resolve_args(args: &[&str]) -> ResolveArgs {
    match parse(args) {
        CliCommand::Resolve(args) => args,
        _ => panic!("expected Resolve"),
    }
}

#[test]
fn cli_parse_resolve_defaults() {
    let args = resolve_args(&["jarfetch", "resolve", "com.example:lib:1.0"]);
    assert_eq!(args.coordinates, vec!["com.example:lib:1.0"]);
    assert!(args.repositories.is_empty());
    assert!(args.scope.is_empty());
    assert!(args.jobs.is_none());
    assert!(!args.optional);
    assert!(!args.mandatory);
    assert!(!args.no_transitive);
    assert!(!args.json);
}

#[test]
fn cli_parse_resolve_options() {
    let args = resolve_args(&[
        "jarfetch",
        "resolve",
        "g:a:1",
        "g:b:2",
        "--repo",
        "https://one.example/",
        "--repo",
        "https://two.example/",
        "-j",
        "8",
        "--scope",
        "compile,runtime,test",
        "--optional",
        "--mandatory",
        "--json",
    ]);
    assert_eq!(args.coordinates.len(), 2);
    assert_eq!(args.repositories, vec!["https://one.example/", "https://two.example/"]);
    assert_eq!(args.jobs, Some(8));
    assert_eq!(args.scope, vec!["compile", "runtime", "test"]);
    assert!(args.optional && args.mandatory && args.json);
}

#[test]
fn cli_resolve_requires_a_coordinate() {
    assert!(Cli::try_parse_from(["jarfetch", "resolve"]).is_err());
}

#[test]
fn pin_length_selects_algorithm() {
    let (c, sum) = parse_pin("g:a:1=F572D396FAE9206628714FB2CE00F72E94F2258F").unwrap();
    assert_eq!(c.to_string(), "g:a:1");
    assert_eq!(sum.algo, ChecksumAlgo::Sha1);
    assert_eq!(sum.hex, "f572d396fae9206628714fb2ce00f72e94f2258f");

    let sha256 = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";
    let (_, sum) = parse_pin(&format!("g:a:1:linux@so={}", sha256)).unwrap();
    assert_eq!(sum.algo, ChecksumAlgo::Sha256);
}

#[test]
fn pin_accepts_md5_and_base64() {
    let (_, sum) = parse_pin("g:a:1=b1946ac92492d2347c6235b4d2611184").unwrap();
    assert_eq!(sum.algo, ChecksumAlgo::Md5);

    let (c, sum) = parse_pin("g:a:1@pom=sha1:9XLTlvrpIGYocU+yzgD3LpTyJY8=").unwrap();
    assert_eq!(c.to_string(), "g:a:1@pom");
    assert_eq!(sum.algo, ChecksumAlgo::Sha1);
    assert_eq!(sum.hex, "f572d396fae9206628714fb2ce00f72e94f2258f");

    let (_, sum) = parse_pin("g:a:1=MD5:sZRqySSS0jR8YjW00mERhA==").unwrap();
    assert_eq!(sum.hex, "b1946ac92492d2347c6235b4d2611184");

    assert!(parse_pin("g:a:1=crc32:abcd").is_err());
    assert!(parse_pin("g:a:1=sha256:sZRqySSS0jR8YjW00mERhA==").is_err());
}

#[test]
fn pin_rejects_bad_digests() {
    assert!(parse_pin("g:a:1").is_err());
    assert!(parse_pin("g:a:1=abc").is_err());
    assert!(parse_pin(&format!("g:a:1={}", "z".repeat(40))).is_err());
}
