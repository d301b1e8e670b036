use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeMap;

#[test]
fn command_genes() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("msyn")?;
    let output = cmd.arg("genes").arg("tests/msyn/query.gtf").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert_eq!(stdout.lines().count(), 13);
    assert_eq!(stdout.lines().next().unwrap(), "scf_1\tqg1\t1000\t1900\t+");
    assert_eq!(stdout.lines().last().unwrap(), "scf_bad\tqg11\t5000\t5900\t+");

    Ok(())
}

#[test]
fn command_genes_exclude() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("msyn")?;
    cmd.arg("genes")
        .arg("tests/msyn/query.gtf")
        .arg("-E")
        .arg("tests/msyn/exclude.list")
        .assert()
        .success()
        .stdout(predicate::str::contains("scf_bad").not())
        .stdout(predicate::str::contains("scf_3\tqg13"));

    Ok(())
}

#[test]
fn command_genes_gff_delimiter() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("msyn")?;
    let output = cmd
        .arg("genes")
        .arg("tests/msyn/ref.gff")
        .arg("-D")
        .arg(".")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // gene and mRNA collapse onto one id
    assert_eq!(stdout.lines().count(), 8);
    assert!(stdout.contains("chrC\trg7\t5000\t5800\t-"));

    let mut cmd = Command::cargo_bin("msyn")?;
    let output = cmd.arg("genes").arg("tests/msyn/ref.gff").output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 16);
    assert!(stdout.contains("chrA\trg1.m1\t10000\t10800\t+"));

    Ok(())
}

#[test]
fn command_genes_from_exons() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("msyn")?;
    let output = cmd
        .arg("genes")
        .arg("tests/msyn/exons.gtf")
        .arg("--no-genes")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    assert!(output.status.success());
    assert_eq!(
        stdout,
        "chrX\tex1\t100\t700\t+\nchrX\tex2\t1000\t1800\t-\nchrY\tex3\t50\t80\t+\n"
    );
    assert!(stderr.contains("Estimated 3 genes from 5 exons"));

    // Without -g there is nothing gene-like in the file
    let mut cmd = Command::cargo_bin("msyn")?;
    cmd.arg("genes")
        .arg("tests/msyn/exons.gtf")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn command_genes_randomize() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("msyn")?;
    let output = cmd
        .arg("genes")
        .arg("tests/msyn/query.gtf")
        .arg("--randomize")
        .arg("--seed")
        .arg("42")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(output.status.success());

    // Same slots per scaffold, ids moved around
    let mut slots: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut ids = vec![];
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        slots
            .entry(fields[0].to_string())
            .or_default()
            .push(format!("{}-{}", fields[2], fields[3]));
        ids.push(fields[1].to_string());
    }
    assert_eq!(slots["scf_1"].len(), 5);
    assert_eq!(slots["scf_2"].len(), 3);
    assert_eq!(slots["scf_3"], vec!["1000-1900", "3000-3900"]);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 13);

    Ok(())
}

#[test]
fn command_genes_missing_id() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let gtf = temp.path().join("bad.gtf");
    std::fs::write(&gtf, "scf_1\tsrc\tgene\t100\t900\t.\t+\t.\tNote=no_id\n")?;

    let mut cmd = Command::cargo_bin("msyn")?;
    cmd.arg("genes")
        .arg(&gtf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no gene id"));

    Ok(())
}
