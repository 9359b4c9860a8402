use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

pub const ICON_CACHE_CAPACITY: usize = 100;

/// Decoded RGBA icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl IconData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(Some(pixels.len()), rgba_len(width, height));
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn placeholder(width: u32, height: u32, r: u8, g: u8, b: u8) -> Self {
        let count = (width as usize).saturating_mul(height as usize);
        Self::new(width, height, [r, g, b, 255].repeat(count))
    }
}

/// Byte length of a `width` x `height` RGBA buffer, `None` if it overflows `usize`.
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

/// Platform hook that loads the icon for a package id.
pub trait IconResolver: Send + Sync {
    fn resolve(&self, id: &str) -> Option<IconData>;
}

impl<F> IconResolver for F
where
    F: Fn(&str) -> Option<IconData> + Send + Sync,
{
    fn resolve(&self, id: &str) -> Option<IconData> {
        self(id)
    }
}

/// Resolver used when the host provides no icons.
pub struct NoIcons;

impl IconResolver for NoIcons {
    fn resolve(&self, _id: &str) -> Option<IconData> {
        None
    }
}

/// Bounded id → icon map. Reaching capacity clears everything before the next insert.
pub struct IconCache {
    resolver: Arc<dyn IconResolver>,
    entries: Mutex<HashMap<String, Arc<IconData>>>,
    capacity: usize,
}

impl IconCache {
    pub fn new(resolver: Arc<dyn IconResolver>) -> Self {
        Self::with_capacity(resolver, ICON_CACHE_CAPACITY)
    }

    pub fn with_capacity(resolver: Arc<dyn IconResolver>, capacity: usize) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Cached icon, or resolves and caches it. Unresolvable ids are not cached.
    pub fn get(&self, id: &str) -> Option<Arc<IconData>> {
        if let Some(hit) = self.entries.lock().get(id) {
            return Some(Arc::clone(hit));
        }

        // Resolution happens outside the lock; a concurrent miss on the same id
        // resolves twice and the later insert wins.
        let icon = Arc::new(self.resolver.resolve(id)?);

        let mut entries = self.entries.lock();
        if !entries.contains_key(id) && entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "icon cache full, clearing");
            entries.clear();
        }
        entries.insert(id.to_string(), Arc::clone(&icon));
        Some(icon)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
