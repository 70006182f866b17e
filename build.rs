use std::env;
use std::process::Command;

// The host's metadata endpoint reports the compiler version the binary was
// built with, so capture it at build time.
fn main() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=FAAS_RUNTIME_RUSTC_VERSION={version}");
    println!("cargo:rerun-if-changed=build.rs");
}
