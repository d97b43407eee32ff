use std::process::Command;

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let described = String::from_utf8(output.stdout).ok()?;
    Some(described.trim().to_string())
}

fn main() {
    let build_hash = git_describe().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=MOODMATE_BUILD_HASH={}", build_hash);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
