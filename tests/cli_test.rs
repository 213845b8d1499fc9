use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const SENDER: &str = "20230001,Alice";
const RECEIVER: &str = "20230002,Bob";
const TEST_TEXT: &str = "To be, or not to be, that is the question:
Whether 'tis nobler in the mind to suffer
The slings and arrows of outrageous fortune,
Or to take arms against a sea of troubles
And by opposing end them.\n";

struct Paths {
    input: PathBuf,
    packed: PathBuf,
    table: PathBuf,
    expanded: PathBuf
}

fn setup(temp_dir: &tempfile::TempDir,dat: &[u8]) -> Result<Paths,Box<dyn std::error::Error>> {
    let paths = Paths {
        input: temp_dir.path().join("input.txt"),
        packed: temp_dir.path().join("input.huf"),
        table: temp_dir.path().join("input.tbl"),
        expanded: temp_dir.path().join("expanded.txt")
    };
    std::fs::write(&paths.input,dat)?;
    Ok(paths)
}

fn compress_cmd(paths: &Paths,extra: &[&str]) -> Result<Command,Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("compress")
        .arg("-i").arg(&paths.input)
        .arg("-o").arg(&paths.packed)
        .arg("-t").arg(&paths.table)
        .arg("--sender").arg(SENDER)
        .arg("--receiver").arg(RECEIVER)
        .args(extra);
    Ok(cmd)
}

fn expand_cmd(paths: &Paths,extra: &[&str]) -> Result<Command,Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("expand")
        .arg("-i").arg(&paths.packed)
        .arg("-o").arg(&paths.expanded)
        .arg("-t").arg(&paths.table)
        .args(extra);
    Ok(cmd)
}

fn round_trip(dat: &[u8],compress_extra: &[&str],expand_extra: &[&str]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,dat)?;
    compress_cmd(&paths,compress_extra)?
        .assert()
        .success()
        .stderr(predicate::str::contains("checksum 0x"));
    expand_cmd(&paths,expand_extra)?
        .assert()
        .success()
        .stderr(predicate::str::contains(RECEIVER));
    match std::fs::read(&paths.expanded) {
        Ok(v) => assert_eq!(v,dat.to_vec()),
        Err(_) => panic!("unable to read expanded output")
    }
    Ok(())
}

#[test]
fn invertibility() -> STDRESULT {
    round_trip(TEST_TEXT.as_bytes(),&[],&["--receiver",RECEIVER])?;
    round_trip(&[],&[],&[])?;
    let all: Vec<u8> = (0..=255).rev().collect();
    round_trip(&all,&[],&[])
}

#[test]
fn invertibility_obfuscated() -> STDRESULT {
    round_trip(TEST_TEXT.as_bytes(),&["--obfuscate"],&["--obfuscate"])?;
    round_trip(TEST_TEXT.as_bytes(),&["--obfuscate","200"],&["--obfuscate","0xc8"])
}

#[test]
fn table_format() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,b"AAAB")?;
    compress_cmd(&paths,&["--no-checksum"])?.assert().success();
    let table = std::fs::read_to_string(&paths.table)?;
    let header_len = format!("Sender: {}\nReceiver: {}\n",SENDER,RECEIVER).len() + 4;
    let mut lines = table.lines();
    assert_eq!(lines.next(),Some(header_len.to_string().as_str()));
    assert!(lines.all(|l| l.starts_with("0x")));
    Ok(())
}

#[test]
fn keep_header() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,b"payload")?;
    compress_cmd(&paths,&[])?.assert().success();
    expand_cmd(&paths,&["--keep-header"])?.assert().success();
    let expected = format!("Sender: {}\nReceiver: {}\npayload",SENDER,RECEIVER);
    assert_eq!(std::fs::read(&paths.expanded)?,expected.into_bytes());
    Ok(())
}

#[test]
fn wrong_receiver() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,TEST_TEXT.as_bytes())?;
    compress_cmd(&paths,&[])?.assert().success();
    expand_cmd(&paths,&["--receiver","20239999,Mallory"])?
        .assert()
        .failure()
        .stderr(predicate::str::contains("ReceiverMismatch"));
    assert!(!paths.expanded.exists());
    Ok(())
}

#[test]
fn bad_sender() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,TEST_TEXT.as_bytes())?;
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("compress")
        .arg("-i").arg(&paths.input)
        .arg("-o").arg(&paths.packed)
        .arg("-t").arg(&paths.table)
        .arg("--sender").arg("Alice")
        .arg("--receiver").arg(RECEIVER)
        .assert()
        .failure()
        .stderr(predicate::str::contains("BadMetadata"));
    assert!(!paths.packed.exists());
    Ok(())
}

#[test]
fn corrupted_stream() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,TEST_TEXT.as_bytes())?;
    compress_cmd(&paths,&[])?.assert().success();
    let mut packed = std::fs::read(&paths.packed)?;
    packed[10] ^= 0x01;
    std::fs::write(&paths.packed,packed)?;
    expand_cmd(&paths,&[])?
        .assert()
        .failure()
        .stderr(predicate::str::contains("IntegrityMismatch"));
    Ok(())
}

#[test]
fn malformed_table() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let paths = setup(&temp_dir,TEST_TEXT.as_bytes())?;
    compress_cmd(&paths,&[])?.assert().success();
    std::fs::write(&paths.table,"-12\n0x41 1 0x00\n")?;
    expand_cmd(&paths,&[])?
        .assert()
        .failure()
        .stderr(predicate::str::contains("MalformedTable"));
    Ok(())
}
