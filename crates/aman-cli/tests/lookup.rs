#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use predicates::prelude::*;
use serde_json::Value;

mod common;
use common::{Fixture, aman_cmd};

#[test]
fn single_match_shows_page() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("Open")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dos.library/Open\n\n"))
        .stdout(predicate::str::contains(
            "NAME\n    Open -- Open a file for input or output\n",
        ))
        .stdout(predicate::str::contains("SYNOPSIS\n    file = Open( name, accessMode )"));

    assert!(fx.cache.join("dos.json").exists());
    assert!(fx.cache.join("_index_title_ic.json").exists());
    assert!(fx.cache.join("_index_topic_title_ic.json").exists());
}

#[test]
fn multiple_matches_list_titles() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("close")
        .assert()
        .success()
        .stdout("dos.library/Close\nfile.library/Close\n");
}

#[test]
fn all_flag_shows_every_page() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["--all", "Close"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Close -- Close an open file"))
        .stdout(predicate::str::contains("Close -- close a file handle"));
}

#[test]
fn full_title_match_wins() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("file.library/close")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("file.library/Close\n"));
}

#[test]
fn no_match_exits_with_failure() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("AllocMem")
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("no entry found for 'AllocMem'"));
}

#[test]
fn missing_man_path_is_an_error() {
    let fx = Fixture::new();

    aman_cmd(fx.path())
        .arg("Open")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No path for autodocs given"));
}

#[test]
fn man_path_flag_and_gzip_cache() {
    let fx = Fixture::new();

    aman_cmd(fx.path())
        .args(["-M", fx.docs.to_str().unwrap()])
        .args(["-c", fx.cache.to_str().unwrap()])
        .args(["-z", "--list", "Open"])
        .assert()
        .success()
        .stdout("dos.library/Open\n");

    assert!(fx.cache.join("dos.json.gz").exists());
    assert!(fx.cache.join("_index_title_ic.json.gz").exists());
    assert!(!fx.cache.join("dos.json").exists());
}

#[test]
fn see_also_mode() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["--mode", "see-also", "open"])
        .assert()
        .success()
        .stdout("dos.library/Close\nfile.library/Close\n");
}

#[test]
fn synopsis_mode_scans_pages() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["-m", "synopsis", "ACCESSMODE"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dos.library/Open\n"));
}

#[test]
fn raw_format_keeps_tabs() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["-F", "raw", "dos.library/Close"])
        .assert()
        .success()
        .stdout("dos.library/Close\n   NAME\n\tClose -- Close an open file\n   SEE ALSO\n\tOpen()\n");
}

#[test]
fn json_format() {
    let fx = Fixture::new();

    let output = fx.cmd().args(["-F", "json", "Open"]).output().unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "dos.library/Open");
    assert_eq!(json["sections"]["SEE ALSO"][0], "Close()");
}

#[test]
fn json_format_lists_every_page() {
    let fx = Fixture::new();

    let output = fx.cmd().args(["-F", "json", "--all", "close"]).output().unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["title"], "dos.library/Close");
    assert_eq!(json[1]["title"], "file.library/Close");
}

#[test]
fn output_file() {
    let fx = Fixture::new();
    let target = fx.path().join("page.txt");

    fx.cmd()
        .args(["-o", target.to_str().unwrap(), "Open"])
        .assert()
        .success()
        .stdout("");

    let written = fs::read_to_string(&target).unwrap();
    assert!(written.starts_with("dos.library/Open\n"));
}

#[test]
fn broken_autodoc_reports_file() {
    let fx = Fixture::new();
    fs::write(fx.docs.join("broken.doc"), "not an autodoc\n").unwrap();

    fx.cmd()
        .arg("Open")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.doc"))
        .stderr(predicate::str::contains("missing TABLE OF CONTENTS header"));
}

#[test]
fn dump_config_without_keyword() {
    let fx = Fixture::new();
    let target = fx.path().join("dumped.toml");

    fx.cmd()
        .args(["-z", "--pager", "less -R", "--dump-config", target.to_str().unwrap()])
        .assert()
        .success();

    let dumped = fs::read_to_string(&target).unwrap();
    assert!(dumped.contains("compress = true"));
    assert!(dumped.contains("pager = \"less -R\""));
    assert!(dumped.contains("autodocs"));
}

#[test]
fn config_file_supplies_man_paths() {
    let fx = Fixture::new();
    let config = fx.path().join("aman.toml");
    fs::write(
        &config,
        format!(
            "man_paths = [{:?}]\ncache_dir = {:?}\n",
            fx.docs.to_str().unwrap(),
            fx.cache.to_str().unwrap()
        ),
    )
    .unwrap();

    aman_cmd(fx.path())
        .args(["--config", config.to_str().unwrap(), "--list", "Open"])
        .assert()
        .success()
        .stdout("dos.library/Open\n");
}

#[test]
fn force_rebuilds_caches() {
    let fx = Fixture::new();
    fx.cmd().arg("Open").assert().success();
    fs::write(
        fx.cache.join("_index_title_ic.json"),
        r#"{"schema_version": 1, "index": {}}"#,
    )
    .unwrap();

    fx.cmd().arg("Open").assert().code(1);
    fx.cmd().args(["--force", "Open"]).assert().success();
}

#[test]
fn removed_autodoc_drops_its_pages() {
    let fx = Fixture::new();
    fx.cmd().arg("close").assert().success();
    fs::remove_file(fx.docs.join("file.doc")).unwrap();

    fx.cmd()
        .arg("close")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dos.library/Close\n\n"));
    fx.cmd()
        .arg("file.library/Close")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no entry found for 'file.library/Close'"));
}

#[test]
fn man_path_flag_takes_a_path_list() {
    let fx = Fixture::new();
    let empty = fx.path().join("empty");
    fs::create_dir(&empty).unwrap();
    let joined = std::env::join_paths([&empty, &fx.docs]).unwrap();

    aman_cmd(fx.path())
        .arg("-M")
        .arg(&joined)
        .args(["-c", fx.cache.to_str().unwrap(), "--list", "Open"])
        .assert()
        .success()
        .stdout("dos.library/Open\n");
}
