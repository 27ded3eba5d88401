use super::*;

mod resolve;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_checksum() {
    match parse(&["jarfetch", "checksum", "/tmp/lib.jar"]) {
        CliCommand::Checksum { path, sha256 } => {
            assert_eq!(path, "/tmp/lib.jar");
            assert!(!sha256);
        }
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_checksum_sha256() {
    match parse(&["jarfetch", "checksum", "lib.jar", "--sha256"]) {
        CliCommand::Checksum { sha256, .. } => assert!(sha256),
        _ => panic!("expected Checksum with --sha256"),
    }
}

#[test]
fn cli_parse_path() {
    match parse(&["jarfetch", "path", "g:a:1", "--cache-dir", "/tmp/repo"]) {
        CliCommand::Path {
            coordinate,
            cache_dir,
        } => {
            assert_eq!(coordinate, "g:a:1");
            assert_eq!(cache_dir, Some(PathBuf::from("/tmp/repo")));
        }
        _ => panic!("expected Path"),
    }
}

#[test]
fn cli_global_config_flag() {
    let cli = Cli::try_parse_from(["jarfetch", "path", "g:a:1", "--config", "/etc/jf.toml"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/etc/jf.toml")));
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["jarfetch", "add", "https://example.com/file.iso"]).is_err());
}
