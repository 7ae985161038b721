//! Unit tests for the JEOS service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pcloud_cli::application::services::jeos_service;
use pcloud_cli::domain::{JeosError, JeosPaths, NameError};

use crate::helpers::Fixture;
use crate::mocks::{MockPlatform, RecordingReporter};

fn seed_tdl(fx: &Fixture, name: &str, arch: &str) -> JeosPaths {
    let paths = JeosPaths::new(&fx.cfg.jeos_dir(), &fx.cfg.images_dir, name, arch);
    fx.write(&paths.tdl, "<template/>");
    paths
}

#[tokio::test]
async fn create_installs_converts_and_records() {
    let fx = Fixture::new();
    let paths = seed_tdl(&fx, "F14", "x86_64");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let jeos = jeos_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", "x86_64",
    )
    .await
    .expect("create");

    assert_eq!(jeos.id(), "F14-x86_64");
    assert_eq!(jeos.tdl_path, paths.tdl);
    assert_eq!(jeos.xml_path, paths.xml);

    let calls = platform.calls();
    assert!(calls[0].starts_with("oz-install"));
    assert!(calls[1].starts_with("convert"));

    let domain = fx.read(&paths.xml);
    assert!(domain.contains(&paths.qcow2.display().to_string()));
    assert!(domain.contains(r#"type="qcow2""#));

    let listed = jeos_service::list(&fx.store).unwrap();
    assert_eq!(listed, vec![jeos]);
}

#[tokio::test]
async fn create_refuses_duplicate() {
    let fx = Fixture::new();
    seed_tdl(&fx, "F14", "x86_64");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();
    jeos_service::create(&fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", "x86_64")
        .await
        .unwrap();

    let err = jeos_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", "x86_64",
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<JeosError>(),
        Some(JeosError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn same_name_other_arch_is_distinct() {
    let fx = Fixture::new();
    seed_tdl(&fx, "F14", "x86_64");
    seed_tdl(&fx, "F14", "i386");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();
    for arch in ["x86_64", "i386"] {
        jeos_service::create(&fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", arch)
            .await
            .unwrap();
    }
    assert_eq!(jeos_service::list(&fx.store).unwrap().len(), 2);
}

#[tokio::test]
async fn create_without_template_does_not_run_oz() {
    let fx = Fixture::new();
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let err = jeos_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F15", "x86_64",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<JeosError>(),
        Some(JeosError::MissingTdl { .. })
    ));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn failed_install_records_nothing() {
    let fx = Fixture::new();
    seed_tdl(&fx, "F14", "x86_64");
    let platform = MockPlatform {
        install_code: 1,
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    let err = jeos_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", "x86_64",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<JeosError>(),
        Some(JeosError::InstallFailed { .. })
    ));
    assert!(jeos_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn failed_conversion_records_nothing() {
    let fx = Fixture::new();
    seed_tdl(&fx, "F14", "x86_64");
    let platform = MockPlatform {
        convert_code: 1,
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    let err = jeos_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", "x86_64",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<JeosError>(),
        Some(JeosError::ConvertFailed { .. })
    ));
    assert!(jeos_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn delete_forgets_only_the_matching_arch() {
    let fx = Fixture::new();
    seed_tdl(&fx, "F14", "x86_64");
    seed_tdl(&fx, "F14", "i386");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();
    for arch in ["x86_64", "i386"] {
        jeos_service::create(&fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", arch)
            .await
            .unwrap();
    }

    let removed = jeos_service::delete(&fx.store, "F14", "i386").unwrap();
    assert_eq!(removed.arch, "i386");

    let left = jeos_service::list(&fx.store).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].arch, "x86_64");
}

#[test]
fn delete_missing_is_not_found() {
    let fx = Fixture::new();
    let err = jeos_service::delete(&fx.store, "F14", "x86_64").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<JeosError>(),
        Some(JeosError::NotFound { .. })
    ));
}

#[test]
fn domain_xml_falls_back_to_conventional_path() {
    let fx = Fixture::new();
    let path = jeos_service::domain_xml_for(&fx.cfg, &fx.store, "F14-x86_64").unwrap();
    assert_eq!(path, fx.cfg.jeos_dir().join("F14-x86_64-jeos.xml"));
}

#[tokio::test]
async fn create_rejects_path_like_arch() {
    let fx = Fixture::new();
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let err = jeos_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "F14", "../x86_64",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<NameError>(),
        Some(NameError::Invalid { kind: "arch", .. })
    ));
    assert!(platform.calls().is_empty());
}
