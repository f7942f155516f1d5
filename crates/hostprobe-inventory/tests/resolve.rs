use std::io::Write;
use std::path::PathBuf;

use hostprobe_exec::ContainerRuntime;
use hostprobe_inventory::*;

fn inventory_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const FLEET: &str = r"
all:
  vars:
    ansible_user: deploy
  hosts:
    web1:
      ansible_connection: local
  children:
    web:
      hosts:
        web2:
          ansible_host: 10.0.0.2
          ansible_port: 2222
          ansible_ssh_private_key_file: /home/deploy/.ssh/id_ed25519
    db:
      hosts:
        db1:
          ansible_connection: community.docker.docker
          ansible_host: molecule-db1
        web1:
";

#[test]
fn test_single_local_target() {
    let file = inventory_file("all:\n  hosts:\n    web1:\n      ansible_connection: local\n");

    let targets = resolve(&InventorySource::Path(file.path().to_path_buf())).unwrap();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].id, "web1");
    assert_eq!(targets[0].transport, Transport::Local);
}

#[test]
fn test_one_target_per_declared_host() {
    let targets = resolve(&InventorySource::Inline(FLEET.to_string())).unwrap();

    let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["web1", "web2", "db1"]);
    assert!(targets[0].in_group("db"));
}

#[test]
fn test_connection_parameters() {
    let targets = resolve(&InventorySource::Inline(FLEET.to_string())).unwrap();

    assert_eq!(
        targets[1].transport,
        Transport::Ssh(SshParams {
            address: "10.0.0.2".into(),
            port: 2222,
            user: "deploy".into(),
            private_key_file: Some(PathBuf::from("/home/deploy/.ssh/id_ed25519")),
            password: None,
        })
    );
    assert_eq!(
        targets[2].transport,
        Transport::Container {
            runtime: ContainerRuntime::Docker,
            container: "molecule-db1".into(),
            user: Some("deploy".into()),
        }
    );
}

#[test]
fn test_ssh_defaults() {
    let targets =
        resolve(&InventorySource::Inline("all:\n  hosts:\n    app1:\n".to_string())).unwrap();

    let Transport::Ssh(ssh) = &targets[0].transport else {
        panic!("expected ssh transport");
    };
    assert_eq!(ssh.address, "app1");
    assert_eq!(ssh.port, 22);
    assert_eq!(ssh.user, "root");
}

#[test]
fn test_pattern_selects_group() {
    let resolver = TargetResolver::new(
        ResolverConfig::new(InventorySource::Inline(FLEET.to_string())).with_pattern("web"),
    );
    let ids: Vec<String> = resolver.resolve().unwrap().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, ["web2"]);
}

#[test]
fn test_pattern_without_match() {
    let resolver = TargetResolver::new(
        ResolverConfig::new(InventorySource::Inline(FLEET.to_string())).with_pattern("cache"),
    );
    assert_eq!(
        resolver.resolve().unwrap_err(),
        InventoryError::NoMatchingHosts("cache".into())
    );
}

#[test]
fn test_missing_inventory_file() {
    let err = resolve(&InventorySource::Path(PathBuf::from(
        "/nonexistent/molecule/inventory.yml",
    )))
    .unwrap_err();
    assert!(matches!(err, InventoryError::NotFound { .. }));
}

#[test]
fn test_malformed_inventory() {
    let file = inventory_file("all:\n  hosts: [web1, web2]\n");
    let err = resolve(&InventorySource::Path(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, InventoryError::Malformed(_)));

    let err = resolve(&InventorySource::Inline("all: {hosts: {web1: ".into())).unwrap_err();
    assert!(matches!(err, InventoryError::Malformed(_)));
}

#[test]
fn test_empty_inventory() {
    let file = inventory_file("");
    let err = resolve(&InventorySource::Path(file.path().to_path_buf())).unwrap_err();
    assert_eq!(err, InventoryError::Empty);
}

#[test]
fn test_unknown_transport() {
    let inventory = "all:\n  hosts:\n    win1:\n      ansible_connection: winrm\n";
    let err = resolve(&InventorySource::Inline(inventory.into())).unwrap_err();
    assert_eq!(
        err,
        InventoryError::UnsupportedTransport {
            host: "win1".into(),
            transport: "winrm".into(),
        }
    );
}

#[test]
fn test_disabled_transport() {
    let resolver = TargetResolver::new(
        ResolverConfig::new(InventorySource::Inline(FLEET.to_string()))
            .with_transports([TransportKind::Local, TransportKind::Ssh]),
    );
    assert_eq!(
        resolver.resolve().unwrap_err(),
        InventoryError::UnsupportedTransport {
            host: "db1".into(),
            transport: "community.docker.docker".into(),
        }
    );
}

#[test]
fn test_child_group_connection_beats_all_vars() {
    let inventory = r"
all:
  vars:
    ansible_connection: ssh
  children:
    local_group:
      vars:
        ansible_connection: local
      hosts:
        web1:
    webservers:
      hosts:
        web1:
";
    let targets = resolve(&InventorySource::Inline(inventory.to_string())).unwrap();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].transport, Transport::Local);
}

#[test]
fn test_passwords_stay_out_of_serialized_targets() {
    let inventory = r"
all:
  vars:
    ansible_become_pass: sudo-secret
  hosts:
    web2:
      ansible_host: 10.0.0.2
      ansible_password: hunter2
";
    let targets = resolve(&InventorySource::Inline(inventory.to_string())).unwrap();

    let Transport::Ssh(ssh) = &targets[0].transport else {
        panic!("expected ssh transport");
    };
    assert_eq!(ssh.password.as_deref(), Some("hunter2"));
    assert!(!targets[0].vars.contains_key("ansible_password"));

    let json = serde_json::to_string(&targets).unwrap();
    assert!(!json.contains("hunter2"));
    assert!(!json.contains("sudo-secret"));
    assert!(json.contains("10.0.0.2"));
}
