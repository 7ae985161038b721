//! Unit tests for the deployable service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pcloud_cli::application::services::{assembly_service, deployable_service};
use pcloud_cli::domain::{
    Assembly, AssemblyState, CpeError, DeployableError, Infrastructure, MonitorMode, NameError,
    StoreError, xml,
};
use pcloud_common::Method;

use crate::helpers::Fixture;
use crate::mocks::{MockEngine, MockPlatform, NoPlatform, RecordingReporter};

fn built(fx: &Fixture, name: &str) {
    let mut a = Assembly::new(name);
    a.uuid = Some(format!("{name}-uuid"));
    a.image = Some(format!("/images/{name}.qcow2"));
    assembly_service::save(&fx.store, &a).unwrap();
}

async fn libvirt_shop(fx: &Fixture) {
    let reporter = RecordingReporter::default();
    deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &NoPlatform,
        &reporter,
        "shop",
        Infrastructure::Libvirt,
        "root",
        MonitorMode::Active,
    )
    .await
    .unwrap();
}

async fn shop_with(fx: &Fixture, members: &[&str]) {
    libvirt_shop(fx).await;
    let reporter = RecordingReporter::default();
    for m in members {
        built(fx, m);
        deployable_service::assembly_add(&fx.store, &NoPlatform, &reporter, "shop", m)
            .await
            .unwrap();
    }
}

// ── create / delete ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_libvirt_records_without_backend_setup() {
    let fx = Fixture::new();
    libvirt_shop(&fx).await;

    let d = deployable_service::get(&fx.store, "shop").unwrap();
    assert_eq!(d.infrastructure, Infrastructure::Libvirt);
    assert_eq!(d.username, "root");
    assert_eq!(d.monitor, MonitorMode::Active);
    assert!(d.assemblies.is_empty());
}

#[tokio::test]
async fn create_duplicate_is_rejected() {
    let fx = Fixture::new();
    libvirt_shop(&fx).await;
    let reporter = RecordingReporter::default();

    let err = deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &NoPlatform,
        &reporter,
        "shop",
        Infrastructure::Libvirt,
        "root",
        MonitorMode::Passive,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployableError>(),
        Some(DeployableError::AlreadyExists(n)) if n == "shop"
    ));
}

#[tokio::test]
async fn create_openstack_sets_up_project_first() {
    let fx = Fixture::new();
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &platform,
        &reporter,
        "shop",
        Infrastructure::Openstack,
        "alice",
        MonitorMode::Passive,
    )
    .await
    .unwrap();

    assert_eq!(
        platform.calls(),
        vec![format!(
            "project-create shop alice {}",
            fx.cfg.dbdir.join("shop").display()
        )]
    );
    assert_eq!(
        deployable_service::get(&fx.store, "shop").unwrap().infrastructure,
        Infrastructure::Openstack
    );
}

#[tokio::test]
async fn failed_project_setup_records_nothing() {
    let fx = Fixture::new();
    let platform = MockPlatform {
        project_create_fails: true,
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    let result = deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &platform,
        &reporter,
        "shop",
        Infrastructure::Openstack,
        "alice",
        MonitorMode::Active,
    )
    .await;

    assert!(result.is_err());
    assert!(deployable_service::list(&fx.store).unwrap().is_empty());
    assert!(!fx.cfg.dbdir.join("shop").exists());
}

#[tokio::test]
async fn create_openstack_prepares_credentials_dir() {
    let fx = Fixture::new();
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &platform,
        &reporter,
        "shop",
        Infrastructure::Openstack,
        "alice",
        MonitorMode::Active,
    )
    .await
    .unwrap();

    assert!(fx.cfg.dbdir.join("shop").join("novacreds").is_dir());
}

#[tokio::test]
async fn create_rejects_unsafe_names_before_any_setup() {
    let fx = Fixture::new();
    let reporter = RecordingReporter::default();

    for (name, user) in [("../shop", "alice"), ("shop", "alice; reboot"), ("", "alice")] {
        let err = deployable_service::create(
            &fx.cfg,
            &fx.store,
            &fx.fs,
            &NoPlatform,
            &reporter,
            name,
            Infrastructure::Openstack,
            user,
            MonitorMode::Active,
        )
        .await
        .unwrap_err();
        assert!(err.downcast_ref::<NameError>().is_some(), "{name:?}/{user:?}");
    }
    assert!(deployable_service::list(&fx.store).unwrap().is_empty());
    assert!(!fx.cfg.dbdir.join("..").join("shop").exists());
}

#[tokio::test]
async fn delete_openstack_removes_credentials_and_project() {
    let fx = Fixture::new();
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();
    deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &platform,
        &reporter,
        "shop",
        Infrastructure::Openstack,
        "alice",
        MonitorMode::Active,
    )
    .await
    .unwrap();
    let project_dir = fx.cfg.dbdir.join("shop");
    fx.write(&project_dir.join("novacreds").join("novarc"), "export X=1\n");

    deployable_service::delete(&fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "shop")
        .await
        .unwrap();

    assert!(!project_dir.exists());
    assert_eq!(platform.calls().last().unwrap(), "project-delete shop");
    assert!(deployable_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn project_delete_failure_is_only_a_warning() {
    let fx = Fixture::new();
    let platform = MockPlatform {
        project_delete_fails: true,
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();
    deployable_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &platform,
        &reporter,
        "shop",
        Infrastructure::Openstack,
        "alice",
        MonitorMode::Active,
    )
    .await
    .unwrap();

    deployable_service::delete(&fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "shop")
        .await
        .unwrap();

    assert_eq!(reporter.warnings().len(), 1);
    assert!(deployable_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn delete_missing_is_not_found() {
    let fx = Fixture::new();
    let reporter = RecordingReporter::default();
    let err = deployable_service::delete(&fx.cfg, &fx.store, &fx.fs, &NoPlatform, &reporter, "shop")
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<StoreError>().is_some());
    assert_eq!(err.to_string(), "deployable \"shop\" does not exist");
}

// ── membership ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_links_both_sides_in_order() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1", "db1"]).await;

    assert_eq!(
        deployable_service::assembly_list(&fx.store, "shop").unwrap(),
        vec!["web1", "db1"]
    );
    let web = assembly_service::get(&fx.store, "web1").unwrap();
    assert_eq!(web.deployment.as_deref(), Some("shop"));
    assert_eq!(web.username.as_deref(), Some("root"));
    assert_eq!(web.infrastructure, Infrastructure::Libvirt);
}

#[tokio::test]
async fn add_twice_is_rejected() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1"]).await;
    let reporter = RecordingReporter::default();

    let err = deployable_service::assembly_add(&fx.store, &NoPlatform, &reporter, "shop", "web1")
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployableError>(),
        Some(DeployableError::AssemblyAlreadyMember { .. })
    ));
    assert_eq!(
        deployable_service::assembly_list(&fx.store, "shop").unwrap(),
        vec!["web1"]
    );
}

#[tokio::test]
async fn add_unknown_assembly_is_rejected() {
    let fx = Fixture::new();
    libvirt_shop(&fx).await;
    let reporter = RecordingReporter::default();

    let err = deployable_service::assembly_add(&fx.store, &NoPlatform, &reporter, "shop", "ghost")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "The assembly \"ghost\" does not exist in the system"
    );
}

#[tokio::test]
async fn remove_clears_back_reference() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1", "db1"]).await;

    let d = deployable_service::assembly_remove(&fx.store, "shop", "web1").unwrap();

    assert_eq!(d.assemblies, vec!["db1"]);
    assert!(assembly_service::get(&fx.store, "web1")
        .unwrap()
        .deployment
        .is_none());
}

#[tokio::test]
async fn remove_non_member_still_clears_stale_reference() {
    let fx = Fixture::new();
    libvirt_shop(&fx).await;
    let mut stale = Assembly::new("web1");
    stale.deployment = Some("shop".to_string());
    assembly_service::save(&fx.store, &stale).unwrap();

    let err = deployable_service::assembly_remove(&fx.store, "shop", "web1").unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployableError>(),
        Some(DeployableError::AssemblyNotMember { .. })
    ));
    assert!(assembly_service::get(&fx.store, "web1")
        .unwrap()
        .deployment
        .is_none());
}

// ── generated config ──────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_config_writes_run_file() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1", "db1"]).await;

    let path = deployable_service::generate_config(&fx.cfg, &fx.store, &fx.fs, "shop").unwrap();

    assert_eq!(path, fx.cfg.run_dir.join("shop.xml"));
    let doc = xml::parse(&fx.read(&path)).unwrap();
    assert_eq!(doc.name, "deployable");
    assert_eq!(xml::attr(&doc, "uuid"), Some("shop"));
    assert_eq!(xml::attr(&doc, "monitor"), Some("active"));
    let names: Vec<_> = xml::children_named(doc.get_child("assemblies").unwrap(), "assembly")
        .filter_map(|a| xml::attr(a, "name"))
        .collect();
    assert_eq!(names, vec!["web1", "db1"]);
}

#[tokio::test]
async fn generate_config_with_dangling_member_fails() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1"]).await;
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();
    assembly_service::delete(&fx.cfg, &fx.store, &platform, &reporter, "web1")
        .await
        .unwrap();

    let err = deployable_service::generate_config(&fx.cfg, &fx.store, &fx.fs, "shop").unwrap_err();
    assert!(err.to_string().contains("web1"));
}

// ── policy engine calls ───────────────────────────────────────────────────────

#[tokio::test]
async fn start_generates_config_then_invokes_engine() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1"]).await;
    let engine = MockEngine::returning(0);
    let reporter = RecordingReporter::default();

    deployable_service::start(&fx.cfg, &fx.store, &fx.fs, &engine, &reporter, "shop")
        .await
        .unwrap();

    assert!(fx.cfg.run_dir.join("shop.xml").exists());
    assert_eq!(
        engine.calls(),
        vec![(Method::DeployableStart, "shop".to_string(), "shop".to_string())]
    );
    assert_eq!(reporter.successes(), vec!["deployable shop started"]);
}

#[tokio::test]
async fn non_zero_rc_is_reported_as_failure() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1"]).await;
    let engine = MockEngine::returning(1);
    let reporter = RecordingReporter::default();

    let err = deployable_service::stop(&fx.store, &engine, &reporter, "shop")
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployableError>(),
        Some(DeployableError::CpeFailed { op: "stop", rc: 1, .. })
    ));
    assert_eq!(err.to_string(), "Failed to stop deployable \"shop\" (rc 1)");
}

#[tokio::test]
async fn missing_engine_surfaces_cpe_error() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1"]).await;
    let engine = MockEngine::missing();
    let reporter = RecordingReporter::default();

    let err = deployable_service::reload(&fx.store, &engine, &reporter, "shop")
        .await
        .unwrap_err();

    let cpe = err.downcast_ref::<CpeError>().expect("CpeError");
    assert_eq!(cpe.exit_code(), 3);
}

#[tokio::test]
async fn reload_unknown_deployable_never_calls_engine() {
    let fx = Fixture::new();
    let engine = MockEngine::returning(0);
    let reporter = RecordingReporter::default();

    let result = deployable_service::reload(&fx.store, &engine, &reporter, "shop").await;

    assert!(result.is_err());
    assert!(engine.calls().is_empty());
}

// ── status ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn libvirt_status_keeps_undefined() {
    let fx = Fixture::new();
    shop_with(&fx, &["web1", "db1"]).await;
    let platform = MockPlatform::default().with_state("web1", AssemblyState::Running);

    let rows = deployable_service::status(&fx.store, &platform, "shop")
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            ("web1".to_string(), AssemblyState::Running),
            ("db1".to_string(), AssemblyState::Undefined),
        ]
    );
}
