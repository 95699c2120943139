use std::env;
use std::process::Command;

fn main() {
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
    println!("cargo:rustc-env=BUILD_TARGET={}", target);

    // Git info if available
    let hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());

    match hash {
        Some(hash) => {
            println!("cargo:rustc-env=GIT_HASH={}", hash);
            let clean = Command::new("git")
                .args(["status", "--porcelain"])
                .output()
                .map(|out| out.stdout.is_empty());
            match clean {
                Ok(clean) => println!("cargo:rustc-env=GIT_CLEAN={}", clean),
                Err(_) => println!("cargo:rustc-env=GIT_CLEAN=unknown"),
            }
        }
        None => {
            println!("cargo:rustc-env=GIT_HASH=unknown");
            println!("cargo:rustc-env=GIT_CLEAN=unknown");
        }
    }

    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("cargo:rustc-env=BUILD_DATE={}", now);
}
