pub mod config;
pub mod log;
pub mod util;

pub mod collections {
    pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
    pub type HashSet<T> = rustc_hash::FxHashSet<T>;
}
