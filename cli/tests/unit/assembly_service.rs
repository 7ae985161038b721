//! Unit tests for the assembly service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pcloud_cli::application::services::assembly_service;
use pcloud_cli::domain::assembly::{GUEST_IFCFG, GUEST_PERSISTENT_NET_RULES};
use pcloud_cli::domain::{
    Assembly, AssemblyError, AssemblyState, Escalation, Infrastructure, NameError, StoreError,
    xml,
};

use crate::helpers::Fixture;
use crate::mocks::{MockPlatform, NoPlatform, RecordingReporter};

fn seed_record(fx: &Fixture, name: &str) -> Assembly {
    fx.seed_assembly_domain(name);
    let mut record = Assembly::new(name);
    record.uuid = Some("0123456789abcdef0123456789abcdef".to_string());
    record.image = Some(
        fx.cfg
            .images_dir
            .join(format!("{name}.qcow2"))
            .display()
            .to_string(),
    );
    assembly_service::save(&fx.store, &record).unwrap();
    record
}

fn openstack_member(fx: &Fixture, name: &str) -> Assembly {
    let mut record = seed_record(fx, name);
    record.infrastructure = Infrastructure::Openstack;
    record.deployment = Some("shop".to_string());
    record.username = Some("alice".to_string());
    assembly_service::save(&fx.store, &record).unwrap();
    record
}

// ── create ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_clones_jeos_and_resets_network_identity() {
    let fx = Fixture::new();
    fx.seed_jeos_domain("F14-x86_64");
    fx.write(&assembly_service::tdl_path(&fx.cfg, "web"), "<template/>");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let record = assembly_service::create(
        &fx.cfg,
        &fx.store,
        &fx.fs,
        &platform,
        &reporter,
        "web",
        "F14-x86_64",
    )
    .await
    .expect("create");

    let disk = fx.cfg.images_dir.join("web.qcow2");
    assert!(disk.exists(), "disk image copied");
    assert_eq!(record.image.as_deref(), Some(disk.to_str().unwrap()));
    let uuid = record.uuid.clone().expect("uuid assigned");
    assert_eq!(uuid.len(), 32);

    let domain_text = fx.read(&assembly_service::domain_xml_path(&fx.cfg, "web"));
    let domain = xml::parse(&domain_text).unwrap();
    assert_eq!(xml::text(domain.get_child("name").unwrap()).as_deref(), Some("web"));
    assert_eq!(xml::text(domain.get_child("uuid").unwrap()).as_deref(), Some(uuid.as_str()));
    let mac = xml::descend(&domain, &["devices", "interface", "mac"])
        .and_then(|m| xml::attr(m, "address"))
        .unwrap()
        .to_string();
    assert!(mac.starts_with("52:54:00:"));
    assert_ne!(mac, "52:54:00:00:00:01");

    let uploads = platform.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, GUEST_IFCFG);
    assert!(uploads[0].2.contains(&format!("HWADDR=\"{mac}\"")));
    assert!(uploads[0].2.contains("BOOTPROTO=dhcp"));

    let calls = platform.calls();
    assert!(calls.iter().any(|c| c.ends_with(GUEST_PERSISTENT_NET_RULES)));
    assert!(calls.last().unwrap().starts_with("oz-customize"));

    let stored = assembly_service::get(&fx.store, "web").unwrap();
    assert_eq!(stored.uuid, record.uuid);
    assert_eq!(stored.infrastructure, Infrastructure::Libvirt);
}

#[tokio::test]
async fn create_without_template_fails_before_touching_platform() {
    let fx = Fixture::new();
    fx.seed_jeos_domain("F14-x86_64");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let err = assembly_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "web", "F14-x86_64",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AssemblyError>(),
        Some(AssemblyError::MissingTdl { .. })
    ));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn create_without_jeos_asks_for_it() {
    let fx = Fixture::new();
    fx.write(&assembly_service::tdl_path(&fx.cfg, "web"), "<template/>");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let err = assembly_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "web", "F14-x86_64",
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Please create the \"F14-x86_64\" jeos first");
}

#[tokio::test]
async fn failed_clone_leaves_no_entry() {
    let fx = Fixture::new();
    fx.write(
        &fx.cfg.jeos_dir().join("F14-x86_64-jeos.xml"),
        "<domain><name>F14</name></domain>",
    );
    fx.write(&assembly_service::tdl_path(&fx.cfg, "web"), "<template/>");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let result = assembly_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "web", "F14-x86_64",
    )
    .await;

    assert!(result.is_err());
    assert!(assembly_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn customize_failure_is_only_a_warning() {
    let fx = Fixture::new();
    fx.seed_jeos_domain("F14-x86_64");
    fx.write(&assembly_service::tdl_path(&fx.cfg, "web"), "<template/>");
    let platform = MockPlatform {
        customize_code: 2,
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    assembly_service::create(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "web", "F14-x86_64",
    )
    .await
    .expect("create still succeeds");

    assert_eq!(reporter.warnings().len(), 1);
    assert!(assembly_service::get(&fx.store, "web").is_ok());
}

// ── clone ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clone_gives_destination_a_fresh_identity() {
    let fx = Fixture::new();
    let source = seed_record(&fx, "web");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let copy = assembly_service::clone(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "web", "web2",
    )
    .await
    .expect("clone");

    assert_ne!(copy.uuid, source.uuid);
    assert!(fx.cfg.images_dir.join("web2.qcow2").exists());
    let names: Vec<String> = assembly_service::list(&fx.store)
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["web", "web2"]);
}

#[tokio::test]
async fn clone_of_unbuilt_source_is_not_found() {
    let fx = Fixture::new();
    assembly_service::save(&fx.store, &Assembly::new("web")).unwrap();
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let err = assembly_service::clone(
        &fx.cfg, &fx.store, &fx.fs, &platform, &reporter, "web", "web2",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AssemblyError>(),
        Some(AssemblyError::NotFound(n)) if n == "web"
    ));
}

#[tokio::test]
async fn clone_to_unsafe_name_touches_nothing() {
    let fx = Fixture::new();
    seed_record(&fx, "web");
    let reporter = RecordingReporter::default();

    let err = assembly_service::clone(
        &fx.cfg, &fx.store, &fx.fs, &NoPlatform, &reporter, "web", "../../etc/web",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<NameError>(),
        Some(NameError::Invalid { kind: "assembly", .. })
    ));
    assert_eq!(assembly_service::list(&fx.store).unwrap().len(), 1);
}

#[tokio::test]
async fn create_with_unsafe_name_is_rejected_before_tdl_lookup() {
    let fx = Fixture::new();
    let reporter = RecordingReporter::default();

    let err = assembly_service::create(
        &fx.cfg, &fx.store, &fx.fs, &NoPlatform, &reporter, "web 1", "F14-x86_64",
    )
    .await
    .unwrap_err();

    assert!(err.downcast_ref::<NameError>().is_some());
    assert!(err.to_string().contains("Invalid assembly name 'web 1'"));
}

// ── delete ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_stops_then_forgets() {
    let fx = Fixture::new();
    seed_record(&fx, "web");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    assembly_service::delete(&fx.cfg, &fx.store, &platform, &reporter, "web")
        .await
        .unwrap();

    assert_eq!(platform.calls(), vec!["destroy web"]);
    assert!(assembly_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn delete_missing_is_not_found() {
    let fx = Fixture::new();
    let reporter = RecordingReporter::default();

    let err = assembly_service::delete(&fx.cfg, &fx.store, &NoPlatform, &reporter, "web")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "assembly \"web\" does not exist");
    assert!(err.downcast_ref::<StoreError>().is_some());
}

#[tokio::test]
async fn delete_openstack_removes_glance_image() {
    let fx = Fixture::new();
    openstack_member(&fx, "web");
    let platform = MockPlatform {
        glance_index: "ID   Name   Disk Format\n---- ------ -----------\n7    web    raw\n"
            .to_string(),
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    assembly_service::delete(&fx.cfg, &fx.store, &platform, &reporter, "web")
        .await
        .unwrap();

    assert_eq!(platform.calls(), vec!["glance-delete 7"]);
    assert!(reporter.successes().contains(&"deleted glance image web (7)".to_string()));
    assert!(assembly_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn delete_openstack_glance_failure_only_warns() {
    let fx = Fixture::new();
    openstack_member(&fx, "web");
    let platform = MockPlatform {
        glance_index: "ID   Name   Disk Format\n7    web    raw\n".to_string(),
        glance_delete_fails: true,
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    assembly_service::delete(&fx.cfg, &fx.store, &platform, &reporter, "web")
        .await
        .unwrap();

    assert!(
        reporter
            .warnings()
            .iter()
            .any(|w| w.starts_with("failed to remove image from glance") && w.contains("in use"))
    );
    assert!(assembly_service::list(&fx.store).unwrap().is_empty());
}

#[tokio::test]
async fn delete_openstack_without_glance_image_warns() {
    let fx = Fixture::new();
    openstack_member(&fx, "web");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    assembly_service::delete(&fx.cfg, &fx.store, &platform, &reporter, "web")
        .await
        .unwrap();

    assert!(platform.calls().is_empty());
    assert!(
        reporter
            .warnings()
            .contains(&"no glance image registered for web".to_string())
    );
}

// ── register ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_openstack_adds_image_to_glance() {
    let fx = Fixture::new();
    let source = seed_record(&fx, "web");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    let record = assembly_service::register(
        &fx.store,
        &platform,
        &reporter,
        "web",
        Infrastructure::Openstack,
        "shop",
        "alice",
    )
    .await
    .unwrap();

    assert_eq!(record.deployment.as_deref(), Some("shop"));
    assert_eq!(
        platform.calls(),
        vec![format!(
            "glance-add web {} alice",
            source.image.as_deref().unwrap()
        )]
    );
}

#[tokio::test]
async fn register_skips_image_already_in_glance() {
    let fx = Fixture::new();
    seed_record(&fx, "web");
    let platform = MockPlatform {
        glance_index: "ID   Name   Disk Format\n---- ------ -----------\n7    web    raw\n"
            .to_string(),
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    assembly_service::register(
        &fx.store,
        &platform,
        &reporter,
        "web",
        Infrastructure::Openstack,
        "shop",
        "alice",
    )
    .await
    .unwrap();

    assert!(platform.calls().is_empty());
    assert_eq!(reporter.warnings(), vec!["image already in glance: web > 7"]);
}

#[tokio::test]
async fn register_libvirt_never_talks_to_glance() {
    let fx = Fixture::new();
    seed_record(&fx, "web");
    let reporter = RecordingReporter::default();

    let record = assembly_service::register(
        &fx.store,
        &NoPlatform,
        &reporter,
        "web",
        Infrastructure::Libvirt,
        "shop",
        "root",
    )
    .await
    .unwrap();

    assert_eq!(record.username.as_deref(), Some("root"));
    let stored = assembly_service::get(&fx.store, "web").unwrap();
    assert_eq!(stored.deployment.as_deref(), Some("shop"));
}

// ── start / stop ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn start_libvirt_creates_domain_from_definition() {
    let fx = Fixture::new();
    let record = seed_record(&fx, "web");
    let platform = MockPlatform::default();

    assembly_service::start(&fx.cfg, &platform, &record).await.unwrap();

    assert_eq!(
        platform.calls(),
        vec![format!(
            "create {}",
            assembly_service::domain_xml_path(&fx.cfg, "web").display()
        )]
    );
}

#[tokio::test]
async fn start_openstack_runs_instance_as_deployable_user() {
    let fx = Fixture::new();
    let record = openstack_member(&fx, "web");
    let platform = MockPlatform::default();

    assembly_service::start(&fx.cfg, &platform, &record).await.unwrap();

    assert_eq!(platform.calls(), vec!["run-instance web as alice"]);
}

#[tokio::test]
async fn start_openstack_outside_deployable_fails() {
    let fx = Fixture::new();
    let mut record = seed_record(&fx, "web");
    record.infrastructure = Infrastructure::Openstack;

    let err = assembly_service::start(&fx.cfg, &NoPlatform, &record)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not part of a deployable"));
}

#[tokio::test]
async fn stop_openstack_terminates_matching_instance() {
    let fx = Fixture::new();
    let record = openstack_member(&fx, "web");
    let platform = MockPlatform {
        describe_images: "IMAGE\tami-00000003\tweb.img.manifest.xml (web)\talice\tavailable\n"
            .to_string(),
        describe_instances: "RESERVATION\tr-1\tshop\nINSTANCE\ti-00000009\tami-00000003\t10.0.0.2\trunning\n"
            .to_string(),
        ..MockPlatform::default()
    };
    let reporter = RecordingReporter::default();

    assembly_service::stop(&fx.cfg, &platform, &reporter, &record)
        .await
        .unwrap();

    assert_eq!(platform.calls(), vec!["terminate i-00000009"]);
}

#[tokio::test]
async fn stop_openstack_without_ami_warns() {
    let fx = Fixture::new();
    let record = openstack_member(&fx, "web");
    let platform = MockPlatform::default();
    let reporter = RecordingReporter::default();

    assembly_service::stop(&fx.cfg, &platform, &reporter, &record)
        .await
        .unwrap();

    assert!(platform.calls().is_empty());
    assert_eq!(reporter.warnings(), vec!["no AMI registered for web"]);
}

// ── status ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_maps_undefined_to_stopped() {
    let record = Assembly::new("web");
    let platform = MockPlatform::default();

    assert_eq!(
        assembly_service::state(&platform, &record).await,
        AssemblyState::Undefined
    );
    assert_eq!(
        assembly_service::status(&platform, &record).await,
        AssemblyState::Stopped
    );
}

#[tokio::test]
async fn status_reports_running_domain() {
    let record = Assembly::new("web");
    let platform = MockPlatform::default().with_state("web", AssemblyState::Running);
    assert_eq!(
        assembly_service::status(&platform, &record).await,
        AssemblyState::Running
    );
}

#[tokio::test]
async fn failed_state_query_is_error() {
    let record = Assembly::new("web");
    let platform = MockPlatform {
        state_fails: true,
        ..MockPlatform::default()
    };
    assert_eq!(
        assembly_service::status(&platform, &record).await,
        AssemblyState::Error
    );
}

#[tokio::test]
async fn openstack_state_is_unknown() {
    let mut record = Assembly::new("web");
    record.infrastructure = Infrastructure::Openstack;
    assert_eq!(
        assembly_service::status(&NoPlatform, &record).await,
        AssemblyState::Unknown
    );
}

// ── escalation ────────────────────────────────────────────────────────────────

#[test]
fn escalation_update_keeps_unspecified_threshold() {
    let fx = Fixture::new();
    seed_record(&fx, "web");

    assembly_service::set_escalation(
        &fx.store,
        "web",
        Escalation {
            failures: Some(3),
            period: Some(600),
        },
    )
    .unwrap();
    let record = assembly_service::set_escalation(
        &fx.store,
        "web",
        Escalation {
            failures: Some(5),
            period: None,
        },
    )
    .unwrap();

    assert_eq!(record.escalation.failures, Some(5));
    assert_eq!(record.escalation.period, Some(600));
    let stored = assembly_service::get(&fx.store, "web").unwrap();
    assert_eq!(stored.escalation, record.escalation);
}
