//! `shiyun fingerprint`: show where a background for some text is cached.

use shiyun::cache::{fingerprint, ImageStore};
use shiyun::config::Config;

pub fn cmd_fingerprint(config: &Config, text: &str) {
    let store = ImageStore::new(config.paths.ink_cache_dir(), config.ink.url_prefix.clone());
    let entry = store.entry(&fingerprint(text));
    println!("fingerprint: {}", entry.fingerprint);
    println!("path:        {}", entry.location.display());
    println!("url:         {}", entry.url);
}
