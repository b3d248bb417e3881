use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::error::Error;
use tempfile::tempdir;

fn wrapper_cmd() -> Command {
    let mut cmd =
        Command::cargo_bin("ffmpeg-wrapper").expect("Failed to find ffmpeg-wrapper binary");
    cmd.env_remove("FFMPEG_WRAPPER_CONFIG");
    cmd
}

#[test]
fn dry_run_concat_with_background() {
    wrapper_cmd()
        .args([
            "--dry-run",
            "concat",
            "-o",
            "complete_book.wav",
            "--volume",
            "2",
            "--background",
            "background.wav",
            "--background-volume",
            "0.3",
            "1.wav",
            "2.wav",
            "3.wav",
            "4.wav",
        ])
        .assert()
        .success()
        .stdout(
            "ffmpeg -hide_banner -loglevel error -i 1.wav -i 2.wav -i 3.wav -i 4.wav \
             -filter_complex concat=n=4:v=0:a=1,volume=2.0[book];amovie=background.wav:loop=0,\
             asetpts=N/SR/TB,volume=0.3[background];[book][background]amix=duration=shortest:normalize=1 \
             -ac 2 -ar 48000 -y complete_book.wav\n",
        );
}

#[test]
fn dry_run_concat_with_short_loudnorm() {
    wrapper_cmd()
        .args([
            "concat",
            "--dry-run",
            "-o",
            "out.wav",
            "--loudnorm",
            "--short",
            "--integrated",
            "-20",
            "--true-peak",
            "-4",
            "--lra",
            "11",
            "1.wav",
        ])
        .assert()
        .success()
        .stdout(contains(
            "concat=n=1:v=0:a=1,volume=1.0,adelay=30s,loudnorm=I=-20.0:TP=-4.0:LRA=11.0,atrim=start=30[book] -map [book]",
        ));
}

#[test]
fn dry_run_probe_commands() {
    wrapper_cmd()
        .args(["--dry-run", "duration", "/tmp/audio.wav"])
        .assert()
        .success()
        .stdout("ffprobe -hide_banner -loglevel error -i /tmp/audio.wav -show_entries format=duration -v quiet -of csv=p=0\n");

    wrapper_cmd()
        .args(["--dry-run", "volume", "book.wav"])
        .assert()
        .success()
        .stdout(contains("-af volumedetect").and(contains("-f null -")));
}

#[test]
fn dry_run_normalize_and_silence() {
    wrapper_cmd()
        .args([
            "--dry-run",
            "normalize",
            "a.wav",
            "b.wav",
            "--integrated=-18",
            "--true-peak=-3",
            "--lra",
            "18",
            "--sample-rate",
            "44100",
        ])
        .assert()
        .success()
        .stdout("ffmpeg -hide_banner -loglevel error -i a.wav -af loudnorm=I=-18.0:TP=-3.0:LRA=18.0 -ar 44100 b.wav\n");

    wrapper_cmd()
        .args(["--dry-run", "silence", "0.85", "/tmp/pause.wav"])
        .assert()
        .success()
        .stdout(contains("-t 0.850 -ar 48000 -ac 1 -y /tmp/pause.wav"));
}

#[test]
fn concat_requires_parts() {
    wrapper_cmd()
        .args(["--dry-run", "concat", "-o", "out.wav"])
        .assert()
        .failure()
        .stderr(contains("required"));
}

#[test]
fn explicit_config_must_exist() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("typo.toml");

    wrapper_cmd()
        .arg("--config")
        .arg(&missing)
        .args(["--dry-run", "duration", "a.wav"])
        .assert()
        .failure()
        .stderr(contains("LoadConfig").and(contains("typo.toml")));

    wrapper_cmd()
        .env("FFMPEG_WRAPPER_CONFIG", &missing)
        .args(["--dry-run", "duration", "a.wav"])
        .assert()
        .failure()
        .stderr(contains("LoadConfig"));

    Ok(())
}

#[test]
fn explicit_config_is_accepted_when_present() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("wrapper.toml");
    std::fs::write(&config, "ffprobe_path = \"/opt/ffprobe\"\n")?;

    wrapper_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--dry-run", "duration", "a.wav"])
        .assert()
        .success()
        .stdout(contains("-show_entries format=duration"));

    Ok(())
}
