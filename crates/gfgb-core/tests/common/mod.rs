use once_cell::sync::OnceCell;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

static INIT: OnceCell<PathBuf> = OnceCell::new();

const SST_ARCHIVE_URL: &str = "https://github.com/SingleStepTests/sm83/archive/refs/heads/main.zip";

/// Directory holding the SST `*.json` files.
///
/// `GFGB_SST_DIR` wins when set. Otherwise `test_json/` next to this crate is
/// used, and filled from the upstream archive when `GFGB_SST_DOWNLOAD=1`.
pub fn sst_dir() -> &'static Path {
    INIT.get_or_init(|| {
        if let Some(dir) = env::var_os("GFGB_SST_DIR") {
            return PathBuf::from(dir);
        }
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_json");
        if env::var("GFGB_SST_DOWNLOAD").is_ok_and(|v| v == "1") && collect_json(&dir).is_empty() {
            download_sst_corpus(&dir);
        }
        dir
    })
}

fn download_sst_corpus(dir: &Path) {
    // The vectors are not checked in; fetch the upstream bundle on demand.
    fs::create_dir_all(dir).expect("failed to create test_json directory");
    let resp = reqwest::blocking::get(SST_ARCHIVE_URL).expect("failed to download SST vectors");
    let status = resp.status();
    if !status.is_success() {
        panic!("failed to download SST vectors: {status}");
    }
    let bytes = resp.bytes().expect("failed to read archive bytes");
    let reader = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader).expect("failed to open zip archive");
    archive.extract(dir).expect("failed to extract SST vectors");
}

/// Every `*.json` file under `dir`, recursively, sorted by path.
pub fn collect_json(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}
