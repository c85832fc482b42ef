//! Copies `memory.x` into the output directory so the linker can find it and
//! embeds the build time as the initial clock value.

use std::{env, fs::File, io::Write, path::PathBuf};

fn main() {
    // Put memory layout in the output directory and ensure it's on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    File::create(out.join("memory.x"))
        .and_then(|mut f| f.write_all(include_bytes!("memory.x")))
        .expect("write memory.x");
    println!("cargo:rustc-link-search={}", out.display());

    // The watch has no RTC backup, start from the build time until a phone
    // writes the Current Time characteristic
    File::create(out.join("utc.rs"))
        .and_then(|mut f| {
            write!(
                f,
                "const UTC_EPOCH: i64 = {};",
                chrono::Utc::now().timestamp()
            )
        })
        .expect("write utc.rs");

    println!("cargo:rerun-if-changed=memory.x");
}
