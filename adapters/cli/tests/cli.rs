use std::{
    env, fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn scratch_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let dir = env::temp_dir().join(format!("sokoban-cli-{label}-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn sokoban(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("sokoban.toml");
    fs::write(
        &config,
        format!(
            "storage_dir = {:?}\nlog_filter = \"warn\"\n",
            dir.join("saves")
        ),
    )
    .expect("write config");

    Command::new(env!("CARGO_BIN_EXE_sokoban"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run the sokoban binary")
}

#[test]
fn levels_lists_builtin_sets() {
    let dir = scratch_dir("levels");
    let output = sokoban(&dir, &["levels"]);
    assert!(output.status.success(), "levels should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Novice"), "{stdout}");
    assert!(stdout.contains("Classic"), "{stdout}");
    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn encode_then_decode_restores_the_level_file() {
    let dir = scratch_dir("transfer");
    let level = r#"{"width":4,"height":2,"start":{"x":0,"y":0},"boxes":[{"x":1,"y":1}],"targets":[{"x":3,"y":1}],"walls":[{"x":2,"y":0}]}"#;
    let source = dir.join("level.json");
    fs::write(&source, level).expect("write level");

    let encoded = sokoban(&dir, &["encode", source.to_str().expect("utf-8 path")]);
    assert!(encoded.status.success(), "encode should succeed");
    let code = String::from_utf8_lossy(&encoded.stdout).trim().to_owned();
    assert!(code.starts_with("sokoban:v1:4x2:"), "{code}");

    let target = dir.join("decoded.json");
    let decoded = sokoban(
        &dir,
        &["decode", &code, "-o", target.to_str().expect("utf-8 path")],
    );
    assert!(decoded.status.success(), "decode should succeed");

    let original: serde_json::Value = serde_json::from_str(level).expect("json");
    let restored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).expect("decoded file")).expect("json");
    assert_eq!(original, restored);
    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn decode_rejects_foreign_codes() {
    let dir = scratch_dir("reject");
    let output = sokoban(&dir, &["decode", "chess:v1:3x3:e30"]);
    assert!(!output.status.success(), "foreign prefixes must fail");
    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn terminal_play_saves_and_resumes() {
    use std::io::Write;
    use std::process::Stdio;

    let dir = scratch_dir("play");
    let config = dir.join("sokoban.toml");
    fs::write(
        &config,
        format!("storage_dir = {:?}\nplayer = \"ada\"\n", dir.join("saves")),
    )
    .expect("write config");

    let mut child = Command::new(env!("CARGO_BIN_EXE_sokoban"))
        .arg("--config")
        .arg(&config)
        .args(["play", "--set", "novice"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn sokoban");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"q\n")
        .expect("write input");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let id = stdout
        .lines()
        .find_map(|line| line.strip_prefix("Saved as "))
        .and_then(|rest| rest.split('.').next())
        .expect("save id")
        .to_owned();

    let saves = sokoban(&dir, &["saves"]);
    assert!(String::from_utf8_lossy(&saves.stdout).contains(&id));
    fs::remove_dir_all(&dir).expect("cleanup");
}
