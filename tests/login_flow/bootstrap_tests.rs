//! Trust-store bootstrap behavior.

use std::fs;
use std::sync::Arc;

use hpcauth::ca::CaClient;
use hpcauth::config::{CINECA_CA_FINGERPRINT, CINECA_CA_URL};

use crate::fixtures::{FakeStep, list_tree};

const BOOTSTRAP: &str = r#"
here="$(dirname "$0")"
if [ "$1 $2" = "ca bootstrap" ]; then
  echo "$@" >> "$here/bootstrap.log"
  mkdir -p "$here/trust/certs"
  echo "root-cert" > "$here/trust/certs/root_ca.crt"
fi
"#;

#[tokio::test]
async fn bootstrap_passes_ca_url_and_fingerprint() {
    let step = FakeStep::new(BOOTSTRAP);
    let ca = CaClient::new(Arc::new(step.settings()));

    ca.bootstrap().await.unwrap();

    let log = step.side_file("bootstrap.log").unwrap();
    assert!(log.contains(&format!("--ca-url={CINECA_CA_URL}")));
    assert!(log.contains(&format!("--fingerprint={CINECA_CA_FINGERPRINT}")));
}

#[tokio::test]
async fn bootstrap_clears_stale_trust_material_first() {
    let step = FakeStep::new(BOOTSTRAP);
    fs::create_dir_all(step.trust_dir()).unwrap();
    fs::write(step.trust_dir().join("stale.pem"), "old").unwrap();

    let ca = CaClient::new(Arc::new(step.settings()));
    ca.bootstrap().await.unwrap();

    assert!(!step.trust_dir().join("stale.pem").exists());
    assert!(step.trust_dir().join("certs/root_ca.crt").exists());
}

#[tokio::test]
async fn bootstrap_twice_leaves_identical_state() {
    let step = FakeStep::new(BOOTSTRAP);
    let ca = CaClient::new(Arc::new(step.settings()));

    ca.bootstrap().await.unwrap();
    let first = list_tree(&step.trust_dir());
    ca.bootstrap().await.unwrap();
    let second = list_tree(&step.trust_dir());

    assert_eq!(first, second);
    assert_eq!(step.side_file("bootstrap.log").unwrap().lines().count(), 2);
}

#[tokio::test]
async fn failing_bootstrap_surfaces_process_error() {
    let step = FakeStep::new(r#"echo "unreachable CA" >&2; exit 1"#);
    let ca = CaClient::new(Arc::new(step.settings()));

    let err = ca.bootstrap().await.unwrap_err();
    assert!(err.to_string().contains("unreachable CA"));
}
