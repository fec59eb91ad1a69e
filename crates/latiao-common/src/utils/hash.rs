//! Hash map aliases backed by `ahash`.

/// A `hashbrown` map using the `ahash` hasher.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// A `hashbrown` set using the `ahash` hasher.
pub type FxHashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;
