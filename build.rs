//! Build script for poolctl.
//!
//! Bakes the git revision into the binary as `POOLCTL_GIT_REV` so `--version`
//! can report it. A value already set in the environment wins; builds outside
//! a git checkout simply go without.

fn main() {
    println!("cargo:rerun-if-env-changed=POOLCTL_GIT_REV");

    if std::env::var_os("POOLCTL_GIT_REV").is_some() {
        // Passed through by cargo for option_env!
        return;
    }

    if let Some(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
    {
        let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !rev.is_empty() {
            println!("cargo:rustc-env=POOLCTL_GIT_REV={rev}");
        }
        println!("cargo:rerun-if-changed=.git/HEAD");
    }
}
