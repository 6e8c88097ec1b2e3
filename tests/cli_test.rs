use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/orders.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "order,customer,status,total,refund,payment,refund_amount",
        ))
        // Cancelled card order, refund approved
        .stdout(predicate::str::contains(
            "1,alice,cancelled,42.5,approved,refunded,42.5",
        ))
        // Cash order paid on delivery
        .stdout(predicate::str::contains("2,bob,delivered,13.9,,completed,0"))
        // Refund denied, payment untouched
        .stdout(predicate::str::contains(
            "3,carol,cancelled,19.5,denied,completed,0",
        ));

    Ok(())
}

#[test]
fn test_cli_activity_log() {
    let mut cmd = Command::new(cargo_bin!("orderflow"));
    cmd.arg("tests/fixtures/orders.csv").arg("--activity");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(r#""kind":"refund-approved""#))
        .stderr(predicate::str::contains(r#""previous_status":"out-for-delivery""#));
}
