//! Library integration tests.

use pyscope::PyscopeError;

#[test]
fn error_types_are_public() {
    let err = PyscopeError::EnvironmentNotFound {
        selector: "test".into(),
    };
    assert!(err.to_string().contains("test"));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> pyscope::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use clap::Parser;
    use pyscope::cli::{Cli, Commands};

    let cli = Cli::parse_from(["pyscope", "check", "--json"]);
    if let Commands::Check(args) = cli.command {
        assert!(args.json);
    } else {
        panic!("Expected Check command");
    }
}

#[test]
fn version_comparison_is_public() {
    use pyscope::index::compare_versions;
    use pyscope::inventory::PackageStatus;

    assert_eq!(compare_versions("2.28.0", "2.31.0"), PackageStatus::Outdated);
    assert_eq!(compare_versions("24.1.0", "24.1.0"), PackageStatus::Updated);
    assert_eq!(compare_versions("1.0", "not a version"), PackageStatus::Unknown);
}
