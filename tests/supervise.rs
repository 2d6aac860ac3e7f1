//! Supervisor hand-off semantics: argument injection, env export, exit-code
//! transparency, and the shim release signal.

use secrecy::SecretString;
use std::time::Duration;
use tokio::sync::watch;
use warmgate::process::{ProcessError, Supervisor};

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn supervisor(cmd: Vec<String>, exports: Vec<(String, SecretString)>) -> (Supervisor, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    let sup = Supervisor::new(
        cmd,
        exports,
        "127.0.0.1".parse().unwrap(),
        9043,
        Duration::from_millis(10),
        tx,
    );
    (sup, rx)
}

#[tokio::test]
async fn child_exit_code_is_propagated() {
    let (sup, _rx) = supervisor(sh("exit 7"), Vec::new());
    let status = sup.run().await.unwrap();
    assert_eq!(status.code(), Some(7));
}

#[tokio::test]
async fn exports_reach_the_child_environment() {
    let exports = vec![("GATEWAY_TOKEN".to_string(), secret("sesame-open"))];
    let (sup, _rx) = supervisor(sh(r#"test "$GATEWAY_TOKEN" = sesame-open"#), exports);
    let status = sup.run().await.unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn bind_arguments_are_appended() {
    // With `sh -c SCRIPT ARG...`, the appended args land in $0..$3.
    let script = r#"[ "$0" = "--host" ] && [ "$1" = "127.0.0.1" ] && [ "$2" = "--port" ] && [ "$3" = "9043" ]"#;
    let (sup, _rx) = supervisor(sh(script), Vec::new());
    let status = sup.run().await.unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn release_signal_fires_during_the_child_lifetime() {
    let (sup, rx) = supervisor(sh("sleep 1"), Vec::new());
    let status = sup.run().await.unwrap();
    assert!(status.success());
    // Warm-up delay (10ms) elapsed well before the child exited.
    assert!(*rx.borrow());
}

#[tokio::test]
async fn missing_target_binary_is_a_spawn_error() {
    let (sup, _rx) = supervisor(
        vec!["warmgate-test-no-such-binary".to_string()],
        Vec::new(),
    );
    let err = sup.run().await.unwrap_err();
    match err {
        ProcessError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other:?}"),
    }
}
