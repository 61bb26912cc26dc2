use std::env;
use std::path::PathBuf;

// ffmpeg-sys-next does its own discovery; on Windows it usually needs a hint.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!("cargo:warning=set FFMPEG_DIR to an FFmpeg install (e.g. from vcpkg) to build vidpeek on Windows");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.exists() {
        println!(
            "cargo:warning=found FFmpeg under {}; export FFMPEG_DIR to that path if linking fails",
            candidate.display(),
        );
    }
}
