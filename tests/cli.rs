use std::{
    net::TcpListener,
    process::{Command, Output},
};

fn devproxy(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_devproxy"))
        .args(args)
        .output()
        .expect("failed to run devproxy")
}

#[test]
fn wrong_argument_count_prints_usage() {
    for args in [&[][..], &["127.0.0.1:0"][..], &["127.0.0.1:0", "127.0.0.1:1", "extra"][..]] {
        let output = devproxy(args);
        assert!(!output.status.success(), "{args:?} should fail");
        assert_eq!(output.status.code(), Some(2));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Usage"), "{stderr}");
    }
}

#[test]
fn invalid_upstream_is_fatal() {
    let output = devproxy(&["127.0.0.1:0", "http://127.0.0.1:9001"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn busy_listen_address_is_fatal() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let output = devproxy(&[&addr, "127.0.0.1:9001"]);

    assert_eq!(output.status.code(), Some(1));
    let logged = String::from_utf8_lossy(&output.stdout);
    assert!(logged.contains(&addr), "{logged}");
}
