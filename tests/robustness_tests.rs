use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_csv_handling() {
    let dir = tempfile::tempdir().unwrap();
    let operations = dir.path().join("operations.csv");
    let customers = dir.path().join("customers.csv");

    let mut wtr = csv::Writer::from_path(&customers).unwrap();
    wtr.write_record(["customer", "token", "active"]).unwrap();
    wtr.write_record(["cus_1", "tok_visa", "true"]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut wtr = csv::Writer::from_path(&operations).unwrap();
    wtr.write_record(["type", "invoice", "customer", "amount", "reason"])
        .unwrap();
    // Valid charge
    wtr.write_record(["charge", "1", "cus_1", "1000", ""]).unwrap();
    // Unknown operation type
    wtr.write_record(["settle", "1", "cus_1", "1000", ""]).unwrap();
    // Unknown refund reason
    wtr.write_record(["refund", "1", "", "100", "boredom"]).unwrap();
    // Valid refund
    wtr.write_record(["refund", "1", "", "250", "duplicate"]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("chargeable"));
    cmd.arg(&operations).arg("--customers").arg(&customers);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading operation"))
        .stdout(predicate::str::contains("1,Partially refunded,ch_1,1000,250,"));
}

#[test]
fn test_invalid_data_types() {
    let dir = tempfile::tempdir().unwrap();
    let operations = dir.path().join("operations.csv");

    let mut wtr = csv::Writer::from_path(&operations).unwrap();
    wtr.write_record(["type", "invoice", "customer", "amount", "reason"])
        .unwrap();
    // Fractional cents
    wtr.write_record(["charge", "1", "", "10.5", ""]).unwrap();
    // Non-integer invoice id
    wtr.write_record(["charge", "abc", "", "100", ""]).unwrap();
    // Negative amount
    wtr.write_record(["charge", "2", "", "-100", ""]).unwrap();
    // Well formed, but without a customer
    wtr.write_record(["charge", "3", "", "10", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("chargeable"));
    cmd.arg(&operations);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading operation"))
        .stdout(predicate::str::contains(
            "3,Validation Failed,,,0,Invoice does not belong to active customer",
        ))
        .stdout(predicate::str::is_match("(?m)^1,").unwrap().not());
}
