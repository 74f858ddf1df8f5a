//! Inspect or clear persisted ink (native).
//!
//! Usage: `marginalia-inspect [--dir DIR] [--clear] [PAGE_PATH...]`
//!
//! Without page paths, every stored page is listed.

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
fn main() {
    use marginalia_core::storage::{FileStorage, InkStore, STORAGE_KEY_PREFIX, Storage, create_default_storage};
    use marginalia_core::ViewId;
    use std::path::PathBuf;
    use std::sync::Arc;

    env_logger::init();

    let mut dir: Option<PathBuf> = None;
    let mut clear = false;
    let mut pages = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dir" => dir = args.next().map(PathBuf::from),
            "--clear" => clear = true,
            "-h" | "--help" => {
                println!("usage: marginalia-inspect [--dir DIR] [--clear] [PAGE_PATH...]");
                return;
            }
            _ => pages.push(arg),
        }
    }

    let storage = match dir {
        Some(dir) => FileStorage::new(dir).map(Arc::new),
        None => create_default_storage(),
    };
    let storage = match storage {
        Ok(storage) => storage,
        Err(e) => {
            log::error!("Cannot open ink storage: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("Reading ink from {}", storage.base_path().display());

    if pages.is_empty() {
        match pollster::block_on(storage.list()) {
            Ok(keys) => pages = keys
                .iter()
                .filter_map(|k| k.strip_prefix(STORAGE_KEY_PREFIX))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                log::error!("Cannot list stored pages: {}", e);
                std::process::exit(1);
            }
        }
        pages.sort();
    }

    for page in &pages {
        let store = InkStore::new(Arc::clone(&storage), page);
        let views = pollster::block_on(store.load(&ViewId::default()));
        println!("{page}");
        for summary in marginalia_web::summarize(&views) {
            println!("  {summary}");
        }
        if clear {
            pollster::block_on(store.wipe());
            println!("  cleared");
        }
    }
}

#[cfg(not(all(feature = "native", not(target_arch = "wasm32"))))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
