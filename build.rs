//! Build script for streamalloc.
//!
//! Reports enabled features and checks toolchain requirements.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_NIGHTLY");

    let parking_lot_enabled = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();
    let nightly_enabled = env::var("CARGO_FEATURE_NIGHTLY").is_ok();

    if parking_lot_enabled {
        emit_info("Using parking_lot for mutexes");
    }

    if log_enabled {
        emit_info("log integration enabled (target \"streamalloc\")");
    }

    if nightly_enabled {
        emit_info("Nightly features enabled (std::alloc::Allocator for HostAllocatorAdaptor)");
        check_nightly_compiler();
    }
}

fn emit_info(msg: &str) {
    println!("cargo:warning=[streamalloc] {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[streamalloc] warning: {}", msg);
}

fn check_nightly_compiler() {
    if let Ok(rustc) = env::var("RUSTC") {
        if let Ok(output) = std::process::Command::new(&rustc).arg("--version").output() {
            let version = String::from_utf8_lossy(&output.stdout);
            if !version.contains("nightly") {
                emit_warning("'nightly' feature enabled but compiler doesn't appear to be nightly");
            }
        }
    }
}
