use std::path::Path;
use std::process::Command;

/// Short commit hash of the checkout this crate sits in, if git can tell.
fn git_short_sha(repo: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8(out.stdout).ok()?;
    let sha = sha.trim();
    (!sha.is_empty()).then(|| sha.to_owned())
}

fn main() {
    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_else(|| ".".into());
    let repo = Path::new(&manifest_dir).join("..");

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/heads");
    println!(
        "cargo:rustc-env=CARDSTMT_BUILD_SHA={}",
        git_short_sha(&repo).as_deref().unwrap_or("unknown")
    );
}
